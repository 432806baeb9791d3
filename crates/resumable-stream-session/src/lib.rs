//! Session storage and stream protocol handlers.
//!
//! Provides:
//! - `StatefulHandler` - Resumable, checksummed value streams
//! - `StatelessHandler` - Doubling streams with no persisted state
//! - Storage implementations (memory)

pub mod error;
pub mod messages;
pub mod stateful;
pub mod stateless;
pub mod storage;

#[cfg(test)]
mod testing;

pub use error::{ErrorCode, ProtocolError};
pub use messages::{StatefulMessage, StatefulRequest, StatelessMessage, StatelessRequest};
pub use stateful::{HandlerConfig, StatefulHandler, StatefulOutcome};
pub use stateless::StatelessHandler;
