//! Requests and streamed messages for both protocols.

use serde::{Deserialize, Serialize};

/// Opening request of a stateful stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatefulRequest {
    /// Client-chosen identifier, stable across reconnects.
    pub client_id: String,
    /// Number of values wanted. Ignored on reconnect.
    pub total_messages: u32,
    /// Whether to resume an existing session.
    #[serde(default)]
    pub is_reconnect: bool,
}

/// One value of a stateful stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatefulMessage {
    pub value: u32,
    /// Checksum of the whole stream. Only present on the final message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<u32>,
}

impl StatefulMessage {
    /// Whether this message ends the stream.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        self.checksum.is_some()
    }
}

/// Opening request of a stateless stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatelessRequest {
    /// Last value the client received, or zero for a fresh stream.
    #[serde(default)]
    pub last_message_value: u32,
}

/// One value of a stateless stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatelessMessage {
    pub value: u32,
}
