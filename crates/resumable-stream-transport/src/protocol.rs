//! Wire protocol for client-server communication.

use resumable_stream_session::{
    ErrorCode, ProtocolError, StatefulMessage, StatefulRequest, StatelessMessage,
    StatelessRequest,
};
use serde::{Deserialize, Serialize};

/// Message from client to server. Only the first frame of a stream is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open or resume a checksummed stream.
    Stateful(StatefulRequest),
    /// Open a doubling stream.
    Stateless(StatelessRequest),
}

/// Message from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// One streamed value.
    Value {
        value: u32,
        /// Present only on the final message of a stateful stream.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checksum: Option<u32>,
    },
    /// The stream failed. The server closes the socket afterwards.
    Error { code: ErrorCode, message: String },
}

impl ServerMessage {
    /// Create an error message.
    #[must_use]
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}

impl From<StatefulMessage> for ServerMessage {
    fn from(msg: StatefulMessage) -> Self {
        Self::Value {
            value: msg.value,
            checksum: msg.checksum,
        }
    }
}

impl From<StatelessMessage> for ServerMessage {
    fn from(msg: StatelessMessage) -> Self {
        Self::Value {
            value: msg.value,
            checksum: None,
        }
    }
}

impl From<&ProtocolError> for ServerMessage {
    fn from(err: &ProtocolError) -> Self {
        Self::error(err.code(), err.to_string())
    }
}
