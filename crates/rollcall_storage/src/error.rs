//! Storage error types.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A read extended beyond the end of the store.
    #[error("read beyond end of storage: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// Requested offset.
        offset: u64,
        /// Requested length.
        len: usize,
        /// Current store size.
        size: u64,
    },

    /// Truncation target lies beyond the current size.
    #[error("cannot truncate to {requested} bytes, store holds {size}")]
    TruncatePastEnd {
        /// Requested size.
        requested: u64,
        /// Current store size.
        size: u64,
    },

    /// The backend refused the operation (offline volume, injected fault).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Returns true when repeating the same operation later may succeed.
    ///
    /// Range errors are programming errors and never retryable.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Io(_) | StorageError::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(StorageError::Unavailable("disk offline".into()).is_transient());
        assert!(StorageError::Io(io::Error::new(io::ErrorKind::Other, "eio")).is_transient());
        assert!(!StorageError::ReadPastEnd {
            offset: 10,
            len: 1,
            size: 5
        }
        .is_transient());
    }
}
