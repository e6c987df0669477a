//! Error types for Rollcall core.

use rollcall_protocol::ProtocolError;
use rollcall_storage::StorageError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the sync engine and authority stores.
///
/// A stale write is not an error: it is reported in the push outcome counts.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The request itself is unacceptable (empty or oversized batch, bad
    /// limit). Retrying it unchanged fails again.
    #[error("validation failed: {message}")]
    Validation {
        /// What was wrong.
        message: String,
    },

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The authority store cannot take writes right now.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Why.
        message: String,
    },

    /// The pull watermark could not be parsed.
    #[error("malformed watermark {value:?}: {reason}")]
    MalformedWatermark {
        /// The rejected text.
        value: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The journal is structurally damaged.
    #[error("journal corruption: {message}")]
    JournalCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// A journal frame failed its checksum.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Stored checksum.
        expected: u32,
        /// Computed checksum.
        actual: u32,
    },

    /// CBOR encoding or decoding failed.
    #[error("codec error: {message}")]
    Codec {
        /// Codec message.
        message: String,
    },
}

impl CoreError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a journal corruption error.
    pub fn journal_corruption(message: impl Into<String>) -> Self {
        Self::JournalCorruption {
            message: message.into(),
        }
    }

    /// Creates a codec error.
    pub fn codec(message: impl ToString) -> Self {
        Self::Codec {
            message: message.to_string(),
        }
    }

    /// Returns true when resending the identical request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Storage(e) => e.is_transient(),
            CoreError::Unavailable { .. } => true,
            _ => false,
        }
    }

    /// Returns true for errors that mean the durable state is damaged.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            CoreError::JournalCorruption { .. } | CoreError::ChecksumMismatch { .. }
        )
    }
}

impl From<ProtocolError> for CoreError {
    fn from(error: ProtocolError) -> Self {
        match error {
            ProtocolError::MalformedWatermark { value, reason } => {
                CoreError::MalformedWatermark { value, reason }
            }
            ProtocolError::Codec(message) => CoreError::Codec { message },
            other => CoreError::validation(other.to_string()),
        }
    }
}
