//! Core traits for session storage and stream delivery.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Persisted progress of one client's stateful stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Seed that fully determines the value sequence.
    pub seed: i64,
    /// Number of values already delivered to the client.
    pub progress: u32,
    /// Number of values the client asked for when the session was created.
    pub total_messages: u32,
    /// Unix epoch seconds of the most recent persist.
    ///
    /// Kept as a plain integer since it is only compared against a threshold.
    pub last_activity_epoch: i64,
}

impl Session {
    /// Create a session that has delivered nothing yet.
    #[must_use]
    pub const fn new(seed: i64, total_messages: u32, now_epoch: i64) -> Self {
        Self {
            seed,
            progress: 0,
            total_messages,
            last_activity_epoch: now_epoch,
        }
    }

    /// Whether every requested value has been delivered.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.progress >= self.total_messages
    }

    /// Values still owed to the client.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.total_messages.saturating_sub(self.progress)
    }
}

/// Storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage error: {0}")]
    Internal(String),
}

/// Trait for session storage backends.
///
/// Each operation is atomic on its own. A reader never observes a
/// half-written `Session`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Get the session for a client, if any.
    async fn read(&self, client_id: &str) -> Result<Option<Session>, StorageError>;

    /// Insert or replace the session for a client.
    async fn upsert(&self, client_id: &str, session: Session) -> Result<(), StorageError>;

    /// Remove the session for a client. Removing an absent session succeeds.
    async fn delete(&self, client_id: &str) -> Result<(), StorageError>;
}

/// A failure reported by a [`StreamSink`].
pub trait SendFailure: std::error::Error + Send + Sync + 'static {
    /// Whether the peer went away or canceled the stream.
    ///
    /// Such failures end a stream cleanly instead of failing it.
    fn is_disconnect(&self) -> bool;
}

/// Outbound half of a streamed response.
#[async_trait]
pub trait StreamSink<M>: Send
where
    M: Send + 'static,
{
    /// Error produced when a message cannot be delivered.
    type Error: SendFailure;

    /// Deliver one message to the peer.
    async fn send(&mut self, msg: M) -> Result<(), Self::Error>;
}
