//! Access-password hashing and verification.

pub mod password;

pub use password::PasswordGuard;
