//! Short-key minting: a trait over the minting algorithm, plus the one
//! production engine. Collision-retry against `MappingStore` lives in
//! [`crate::shortener`], not here — a minter only produces candidates.

mod random;

pub use random::RandomAlphanumericMinter;

pub const MIN_KEY_LEN: usize = 6;
pub const MAX_KEY_LEN: usize = 8;
pub const ESCALATED_KEY_LEN: usize = 10;
/// `isWellFormed` upper bound — generous enough to admit the escalated length.
pub const WELL_FORMED_MAX_LEN: usize = 20;

pub trait KeyMinter: Send + Sync {
    /// A key of length drawn uniformly from `[MIN_KEY_LEN, MAX_KEY_LEN]`.
    fn mint(&self) -> String;

    /// A key of exactly the given length — used for the escalation path.
    fn mint_of_length(&self, length: usize) -> String;

    fn is_well_formed(&self, key: &str) -> bool {
        let len = key.chars().count();
        len > 0 && len <= WELL_FORMED_MAX_LEN && key.chars().all(|c| c.is_ascii_alphanumeric())
    }
}
