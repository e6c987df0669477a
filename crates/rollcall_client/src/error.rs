//! Error types for the sync client.

use rollcall_protocol::{ErrorCode, ErrorResponse, ProtocolError};
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The server answered with an error reply.
    #[error("server rejected request ({code:?}): {message}")]
    Server {
        /// Server classification.
        code: ErrorCode,
        /// Server message.
        message: String,
        /// Whether the server says resending may succeed.
        retryable: bool,
    },

    /// Protocol error (unexpected reply or inconsistent page).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A local change was rejected before it reached the queue.
    #[error("invalid local change: {0}")]
    InvalidChange(String),

    /// Codec error.
    #[error("codec error: {0}")]
    Codec(#[from] ProtocolError),

    /// I/O error while saving or loading the replica.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Sync was cancelled.
    #[error("sync cancelled")]
    Cancelled,

    /// Invalid state transition.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// Not connected.
    #[error("not connected to server")]
    NotConnected,
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Server { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

impl From<ErrorResponse> for SyncError {
    fn from(response: ErrorResponse) -> Self {
        SyncError::Server {
            code: response.code,
            message: response.message,
            retryable: response.retryable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection lost").is_retryable());
        assert!(!SyncError::transport_fatal("invalid certificate").is_retryable());
        assert!(!SyncError::Cancelled.is_retryable());
        assert!(!SyncError::NotConnected.is_retryable());
    }

    #[test]
    fn server_reply_keeps_retry_hint() {
        let err = SyncError::from(ErrorResponse {
            code: ErrorCode::Storage,
            message: "disk offline".into(),
            retryable: true,
        });
        assert!(err.is_retryable());
        assert!(err.to_string().contains("disk offline"));

        let err = SyncError::from(ErrorResponse {
            code: ErrorCode::MalformedWatermark,
            message: "bad".into(),
            retryable: false,
        });
        assert!(!err.is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::NotConnected;
        assert_eq!(err.to_string(), "not connected to server");
    }
}
