//! Transport layer for resumable streams.
//!
//! Provides:
//! - Wire protocol (tagged JSON frames)
//! - WebSocket transport (feature: websocket)
//! - Reconnecting client (feature: client)

pub mod protocol;

#[cfg(feature = "websocket")]
pub mod websocket;

#[cfg(feature = "client")]
pub mod client;

pub use protocol::{ClientMessage, ServerMessage};
