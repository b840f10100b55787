//! Acceptance checks for candidate original URLs and custom aliases.

pub mod alias;
pub mod url;

pub use alias::validate_alias;
pub use url::validate_url;
