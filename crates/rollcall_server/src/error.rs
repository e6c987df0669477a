//! Error types for the sync server.

use rollcall_core::CoreError;
use rollcall_protocol::{ErrorCode, ErrorResponse, ProtocolError};
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the sync server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request format or size.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The pull watermark could not be parsed.
    #[error("malformed watermark: {0}")]
    MalformedWatermark(String),

    /// The request could not be decoded.
    #[error("undecodable request: {0}")]
    Decode(#[from] ProtocolError),

    /// A message type the server does not answer.
    #[error("unexpected message: {0}")]
    UnexpectedMessage(&'static str),

    /// The authority store failed.
    #[error("store error: {0}")]
    Store(CoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for ServerError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Validation { message } => ServerError::InvalidRequest(message),
            err @ CoreError::MalformedWatermark { .. } => {
                ServerError::MalformedWatermark(err.to_string())
            }
            other => ServerError::Store(other),
        }
    }
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidRequest(_)
                | ServerError::MalformedWatermark(_)
                | ServerError::Decode(_)
                | ServerError::UnexpectedMessage(_)
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(self, ServerError::Store(_) | ServerError::Internal(_))
    }

    /// Returns true when the client may resend the identical request.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServerError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Wire classification of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ServerError::InvalidRequest(_)
            | ServerError::Decode(_)
            | ServerError::UnexpectedMessage(_) => ErrorCode::Validation,
            ServerError::MalformedWatermark(_) => ErrorCode::MalformedWatermark,
            ServerError::Store(e) if e.is_retryable() => ErrorCode::Storage,
            ServerError::Store(_) | ServerError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Builds the error reply sent to the client.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code(),
            message: self.to_string(),
            retryable: self.is_retryable(),
        }
    }
}
