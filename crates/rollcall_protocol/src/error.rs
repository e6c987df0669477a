//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while parsing or encoding protocol values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A caller-supplied watermark could not be parsed.
    #[error("malformed watermark {value:?}: {reason}")]
    MalformedWatermark {
        /// The rejected text.
        value: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A timestamp was not valid RFC 3339.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The rejected text.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// An entity kind name was not recognised.
    #[error("unknown entity kind: {0}")]
    UnknownKind(String),

    /// CBOR encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(String),
}

impl ProtocolError {
    /// Creates a malformed watermark error.
    pub fn malformed_watermark(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedWatermark {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Creates a codec error.
    pub fn codec(message: impl ToString) -> Self {
        Self::Codec(message.to_string())
    }
}
