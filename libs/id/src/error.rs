//! Error types for ID parsing and validation.

use thiserror::Error;

/// Errors that can occur when parsing or validating IDs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The ID string is empty.
    #[error("ID cannot be empty")]
    Empty,

    /// The ID string has the wrong length.
    #[error("invalid ID length: expected {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// The ID string contains a non-hex character.
    #[error("invalid hex in ID: {0}")]
    InvalidHex(String),
}
