//! Reconnecting client for both stream protocols.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use resumable_stream_session::{ErrorCode, StatefulRequest, StatelessRequest};
use thiserror::Error;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::protocol::{ClientMessage, ServerMessage};

/// Client error.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Session expired, retry without reconnecting")]
    Expired,
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Server error ({code:?}): {message}")]
    Server { code: ErrorCode, message: String },
    #[error("Gave up after {0} reconnects")]
    ReconnectExhausted(u32),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("Invalid message: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    fn from_server(code: ErrorCode, message: String) -> Self {
        match code {
            ErrorCode::SessionExpired => Self::Expired,
            ErrorCode::SessionNotFound => Self::NotFound(message),
            ErrorCode::Internal | ErrorCode::BadRequest => Self::Server { code, message },
        }
    }

    const fn is_connection_loss(&self) -> bool {
        matches!(self, Self::WebSocket(_))
    }
}

/// Result of a completed stateful stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatefulReport {
    /// Checksum sent by the server on the final message.
    pub checksum: u32,
    /// Wrapping sum of every value this client received.
    pub local_sum: u32,
    /// Number of values received across all connections.
    pub received: u32,
    /// Number of times the client reconnected.
    pub reconnects: u32,
}

impl StatefulReport {
    /// Whether the server's checksum agrees with what was received.
    #[must_use]
    pub const fn matches(&self) -> bool {
        self.checksum == self.local_sum
    }
}

/// Progress carried across reconnects.
#[derive(Debug, Default)]
struct Tally {
    sum: u64,
    received: u32,
    last: u32,
    drop_after: Option<u32>,
}

impl Tally {
    fn record(&mut self, value: u32) {
        self.sum += u64::from(value);
        self.received += 1;
        self.last = value;
    }

    /// Whether to simulate a connection drop now. Fires once.
    fn should_drop(&mut self) -> bool {
        if self.drop_after.is_some_and(|n| self.received >= n) {
            self.drop_after = None;
            return true;
        }
        false
    }

    #[allow(clippy::cast_possible_truncation)]
    const fn wrapping_sum(&self) -> u32 {
        self.sum as u32
    }
}

/// Stream client that reconnects after transient connection loss.
#[derive(Debug, Clone)]
pub struct StreamClient {
    url: String,
    reconnect_delay: Duration,
    max_reconnects: u32,
    drop_after: Option<u32>,
}

impl StreamClient {
    /// Create a client for a `ws://host:port/stream` URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay: Duration::from_secs(3),
            max_reconnects: 5,
            drop_after: None,
        }
    }

    /// Delay before each reconnect attempt.
    #[must_use]
    pub const fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Maximum number of reconnects before giving up.
    #[must_use]
    pub const fn max_reconnects(mut self, max: u32) -> Self {
        self.max_reconnects = max;
        self
    }

    /// Close the connection once after receiving `n` values.
    ///
    /// Simulates a network drop for testing resume behavior.
    #[must_use]
    pub const fn drop_after(mut self, n: u32) -> Self {
        self.drop_after = Some(n);
        self
    }

    /// Receive a full stateful stream, resuming on connection loss.
    ///
    /// # Errors
    /// Returns [`ClientError::Expired`] if a resume came too late,
    /// [`ClientError::NotFound`] if the server lost the session, or
    /// [`ClientError::ReconnectExhausted`] if the connection kept failing.
    pub async fn run_stateful(
        &self,
        client_id: &str,
        total_messages: u32,
    ) -> Result<StatefulReport, ClientError> {
        // The server completes an empty stream without sending a frame, which
        // would look like a dropped connection.
        if total_messages == 0 {
            return Ok(StatefulReport {
                checksum: 0,
                local_sum: 0,
                received: 0,
                reconnects: 0,
            });
        }

        let mut tally = Tally {
            drop_after: self.drop_after,
            ..Tally::default()
        };
        let mut reconnects = 0;

        loop {
            let request = ClientMessage::Stateful(StatefulRequest {
                client_id: client_id.to_owned(),
                total_messages,
                is_reconnect: reconnects > 0,
            });

            match self.stateful_attempt(&request, &mut tally).await {
                Ok(Some(checksum)) => {
                    return Ok(StatefulReport {
                        checksum,
                        local_sum: tally.wrapping_sum(),
                        received: tally.received,
                        reconnects,
                    });
                }
                Ok(None) => {}
                Err(e) if e.is_connection_loss() => {
                    tracing::warn!(client_id, error = %e, "connection lost");
                }
                Err(e) => return Err(e),
            }

            reconnects = self.next_attempt(reconnects).await?;
        }
    }

    /// Receive `count` values of a stateless stream and return their sum,
    /// resuming from the last value on connection loss.
    ///
    /// # Errors
    /// Returns error if the server rejects the stream or the connection kept
    /// failing.
    pub async fn run_stateless(&self, count: u32) -> Result<u64, ClientError> {
        if count == 0 {
            return Ok(0);
        }

        let mut tally = Tally {
            drop_after: self.drop_after,
            ..Tally::default()
        };
        let mut reconnects = 0;

        loop {
            match self.stateless_attempt(count, &mut tally).await {
                Ok(()) if tally.received >= count => return Ok(tally.sum),
                Ok(()) => {}
                Err(e) if e.is_connection_loss() => {
                    tracing::warn!(error = %e, "connection lost");
                }
                Err(e) => return Err(e),
            }

            reconnects = self.next_attempt(reconnects).await?;
        }
    }

    async fn next_attempt(&self, reconnects: u32) -> Result<u32, ClientError> {
        if reconnects >= self.max_reconnects {
            return Err(ClientError::ReconnectExhausted(reconnects));
        }
        tracing::info!(
            delay_ms = u64::try_from(self.reconnect_delay.as_millis()).unwrap_or(u64::MAX),
            attempt = reconnects + 1,
            "reconnecting"
        );
        tokio::time::sleep(self.reconnect_delay).await;
        Ok(reconnects + 1)
    }

    /// One connection of a stateful stream.
    ///
    /// Returns the final checksum, or `None` if the connection ended early.
    async fn stateful_attempt(
        &self,
        request: &ClientMessage,
        tally: &mut Tally,
    ) -> Result<Option<u32>, ClientError> {
        let (ws, _response) = connect_async(self.url.as_str()).await?;
        let (mut sink, mut stream) = ws.split();
        sink.send(Message::Text(serde_json::to_string(request)?.into()))
            .await?;

        while let Some(frame) = stream.next().await {
            let text = match frame? {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            match serde_json::from_str::<ServerMessage>(text.as_str())? {
                ServerMessage::Value { value, checksum } => {
                    tally.record(value);
                    if checksum.is_some() {
                        let _ = sink.close().await;
                        return Ok(checksum);
                    }
                    if tally.should_drop() {
                        tracing::info!(received = tally.received, "dropping connection");
                        let _ = sink.close().await;
                        return Ok(None);
                    }
                }
                ServerMessage::Error { code, message } => {
                    return Err(ClientError::from_server(code, message));
                }
            }
        }
        Ok(None)
    }

    /// One connection of a stateless stream.
    async fn stateless_attempt(&self, count: u32, tally: &mut Tally) -> Result<(), ClientError> {
        let (ws, _response) = connect_async(self.url.as_str()).await?;
        let (mut sink, mut stream) = ws.split();
        let request = ClientMessage::Stateless(StatelessRequest {
            last_message_value: tally.last,
        });
        sink.send(Message::Text(serde_json::to_string(&request)?.into()))
            .await?;

        while let Some(frame) = stream.next().await {
            let text = match frame? {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            match serde_json::from_str::<ServerMessage>(text.as_str())? {
                ServerMessage::Value { value, .. } => {
                    tally.record(value);
                    if tally.received >= count || tally.should_drop() {
                        let _ = sink.close().await;
                        return Ok(());
                    }
                }
                ServerMessage::Error { code, message } => {
                    return Err(ClientError::from_server(code, message));
                }
            }
        }
        Ok(())
    }
}
