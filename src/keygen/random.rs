use super::{KeyMinter, MAX_KEY_LEN, MIN_KEY_LEN};
use rand::Rng;
use rand::rngs::OsRng;

const ALPHABET: &[char] = &[
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I',
    'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b',
    'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u',
    'v', 'w', 'x', 'y', 'z',
];

/// Draws each character from the 62-symbol alphanumeric alphabet via
/// `nanoid`, given a fixed length and alphabet; `nanoid` samples from the
/// OS CSPRNG internally, satisfying the spec's randomness requirement.
/// The length itself is chosen separately with `OsRng`, since `nanoid`
/// takes a fixed length rather than a distribution.
pub struct RandomAlphanumericMinter;

impl RandomAlphanumericMinter {
    fn sample(length: usize) -> String {
        nanoid::nanoid!(length, ALPHABET)
    }
}

impl KeyMinter for RandomAlphanumericMinter {
    fn mint(&self) -> String {
        let len = OsRng.random_range(MIN_KEY_LEN..=MAX_KEY_LEN);
        Self::sample(len)
    }

    fn mint_of_length(&self, length: usize) -> String {
        Self::sample(length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_produces_well_formed_key_in_range() {
        let minter = RandomAlphanumericMinter;
        for _ in 0..200 {
            let key = minter.mint();
            assert!(key.len() >= MIN_KEY_LEN && key.len() <= MAX_KEY_LEN);
            assert!(minter.is_well_formed(&key));
        }
    }

    #[test]
    fn mint_of_length_honours_escalation_length() {
        let minter = RandomAlphanumericMinter;
        let key = minter.mint_of_length(10);
        assert_eq!(key.len(), 10);
        assert!(minter.is_well_formed(&key));
    }

    #[test]
    fn is_well_formed_rejects_non_alphanumeric_and_overlong() {
        let minter = RandomAlphanumericMinter;
        assert!(!minter.is_well_formed("abc-def"));
        assert!(!minter.is_well_formed(&"a".repeat(21)));
    }
}
