//! Error types for key parsing and validation.

use thiserror::Error;

/// Errors that can occur when parsing or validating keys.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The key string is empty.
    #[error("{kind} cannot be empty")]
    Empty { kind: &'static str },

    /// The key contains whitespace or control characters.
    #[error("{kind} contains invalid character {found:?}")]
    InvalidCharacter { kind: &'static str, found: char },

    /// The prefixed ID has the wrong prefix.
    #[error("invalid ID prefix: expected '{expected}', got '{actual}'")]
    InvalidPrefix {
        expected: &'static str,
        actual: String,
    },

    /// The prefixed ID is missing the underscore separator.
    #[error("ID missing underscore separator")]
    MissingSeparator,

    /// The ULID portion of a prefixed ID is invalid.
    #[error("invalid ULID: {0}")]
    InvalidUlid(String),
}

impl KeyError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, KeyError::Empty { .. })
    }
}
