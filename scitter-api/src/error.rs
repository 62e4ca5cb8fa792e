use crate::decode::DecodeError;
use scitter_http::{HttpError, TransportErrorKind};
use thiserror::Error;

/// Failures reported by [`crate::Scitter`]. Nothing here is retried by the client.
#[derive(Debug, Error)]
pub enum ScitterError {
    /// Network-level failure, or an HTTP status the operation has no meaning for.
    #[error("transport error: {0}")]
    Transport(#[from] HttpError),

    /// The service rejected the credentials for a data call (401/403).
    /// Credentials unusable on the wire are refused locally as a 401.
    #[error("authentication rejected ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("invalid query parameter: {0}")]
    InvalidParam(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ScitterError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ScitterError::Transport(_))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ScitterError::Auth { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, ScitterError::Decode(_))
    }

    /// Classification of a network failure, if that is what this is.
    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            ScitterError::Transport(e) => e.kind(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScitterError>;
