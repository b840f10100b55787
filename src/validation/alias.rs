//! Custom alias format validation: 3–50 chars drawn from `[A-Za-z0-9_-]`.
//! Uniqueness against existing short keys/aliases is a `MappingStore`
//! concern, not this module's.

use crate::errors::ApiError;

pub const MIN_ALIAS_LEN: usize = 3;
pub const MAX_ALIAS_LEN: usize = 50;

pub fn validate_alias(alias: &str) -> Result<(), ApiError> {
    let len = alias.chars().count();

    if len < MIN_ALIAS_LEN {
        return Err(ApiError::ValidationFailure(format!(
            "Alias must be at least {MIN_ALIAS_LEN} characters"
        )));
    }
    if len > MAX_ALIAS_LEN {
        return Err(ApiError::ValidationFailure(format!(
            "Alias must be at most {MAX_ALIAS_LEN} characters"
        )));
    }
    if !alias.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(ApiError::ValidationFailure(
            "Alias may only contain letters, numbers, underscores, and hyphens".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_lengths() {
        assert!(validate_alias("ab").is_err());
        assert!(validate_alias("abc").is_ok());
        assert!(validate_alias(&"a".repeat(50)).is_ok());
        assert!(validate_alias(&"a".repeat(51)).is_err());
    }

    #[test]
    fn rejects_disallowed_characters() {
        assert!(validate_alias("my link").is_err());
        assert!(validate_alias("my@link").is_err());
        assert!(validate_alias("my.link").is_err());
    }

    #[test]
    fn accepts_hyphen_and_underscore() {
        assert!(validate_alias("my-cool_link").is_ok());
    }
}
