//! Protocol errors and their wire codes.

use resumable_stream_core::StorageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status reported to a client whose stream failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Reconnect for a client the store knows nothing about.
    SessionNotFound,
    /// Reconnect after the session went stale. Retry without reconnect.
    SessionExpired,
    /// Storage or transport failure on the server.
    Internal,
    /// The opening request could not be understood.
    BadRequest,
}

/// Stream handler error.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Session expired for {0}, retry without reconnect")]
    SessionExpired(String),
    #[error("Session store failed: {0}")]
    Storage(#[from] StorageError),
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ProtocolError {
    /// Wire code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::SessionNotFound(_) => ErrorCode::SessionNotFound,
            Self::SessionExpired(_) => ErrorCode::SessionExpired,
            Self::Storage(_) | Self::Transport(_) => ErrorCode::Internal,
        }
    }
}
