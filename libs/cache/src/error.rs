//! Cache error types.

use thiserror::Error;

/// Errors from cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// `create` on an ID that already has an entry (ready or writing).
    #[error("entry {0} already exists")]
    AlreadyExists(String),

    /// `get` on an ID with no committed entry.
    #[error("entry {0} not found")]
    NotFound(String),

    /// `remove` on an entry that still has readers.
    #[error("entry {0} is still referenced")]
    Busy(String),

    #[error("cache I/O: {0}")]
    Io(#[from] std::io::Error),
}
