//! Resumable stateful stream handler.

use std::{sync::Arc, time::Duration};

use resumable_stream_core::{
    SeedSource, SendFailure, Session, SessionStore, StreamSink, ValueStream, is_expired,
    now_epoch,
};

use crate::{
    error::ProtocolError,
    messages::{StatefulMessage, StatefulRequest},
};

/// Expiration threshold used when none is configured.
pub const DEFAULT_EXPIRATION_SECS: i64 = 30;

/// Settings shared by every stream a handler serves.
#[derive(Debug, Clone, Copy)]
pub struct HandlerConfig {
    /// Pause between two emitted values.
    pub send_interval: Duration,
    /// Idle seconds after which a session can no longer be resumed.
    pub expiration_secs: i64,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            send_interval: Duration::from_secs(1),
            expiration_secs: DEFAULT_EXPIRATION_SECS,
        }
    }
}

/// How a stateful stream ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatefulOutcome {
    /// Every value was sent and the session was removed.
    Completed { checksum: u32 },
    /// The peer went away. The session is kept for a later resume.
    Disconnected { progress: u32 },
}

/// Handler for the stateful protocol.
///
/// Every stream re-reads its session from the store and writes it back after
/// each value, so nothing is cached between streams.
pub struct StatefulHandler<S, R>
where
    S: SessionStore,
    R: SeedSource,
{
    store: Arc<S>,
    seeds: Arc<R>,
    config: HandlerConfig,
}

impl<S, R> StatefulHandler<S, R>
where
    S: SessionStore,
    R: SeedSource,
{
    /// Create a new stateful handler.
    #[must_use]
    pub const fn new(store: Arc<S>, seeds: Arc<R>, config: HandlerConfig) -> Self {
        Self {
            store,
            seeds,
            config,
        }
    }

    /// The store this handler persists progress to.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Serve one stateful stream to completion or disconnect.
    ///
    /// # Errors
    /// Returns error if a reconnect cannot be matched to a live session, if
    /// the store fails, or if the sink fails for a reason other than the peer
    /// going away.
    pub async fn serve<K>(
        &self,
        request: StatefulRequest,
        sink: &mut K,
    ) -> Result<StatefulOutcome, ProtocolError>
    where
        K: StreamSink<StatefulMessage>,
    {
        let client_id = request.client_id.as_str();
        let mut session = if request.is_reconnect {
            self.resume(client_id).await?
        } else {
            self.create(client_id, request.total_messages).await?
        };

        let (mut values, mut checksum) = ValueStream::replay(session.seed, session.progress);
        tracing::debug!(
            client_id,
            progress = session.progress,
            total = session.total_messages,
            "session positioned"
        );

        while !session.is_complete() {
            let value = values.next_value();
            checksum.add(value);

            session.progress += 1;
            session.last_activity_epoch = now_epoch();
            self.store.upsert(client_id, session).await?;

            let msg = StatefulMessage {
                value,
                checksum: session.is_complete().then_some(checksum.value()),
            };
            tracing::debug!(client_id, ?msg, progress = session.progress, "sending");

            if let Err(e) = sink.send(msg).await {
                if e.is_disconnect() {
                    tracing::info!(
                        client_id,
                        progress = session.progress,
                        "client disconnected, keeping session"
                    );
                    return Ok(StatefulOutcome::Disconnected {
                        progress: session.progress,
                    });
                }
                return Err(ProtocolError::Transport(e.to_string()));
            }

            if !session.is_complete() {
                tokio::time::sleep(self.config.send_interval).await;
            }
        }

        if let Err(e) = self.store.delete(client_id).await {
            tracing::warn!(client_id, error = %e, "failed to remove completed session");
        }
        tracing::info!(client_id, checksum = checksum.value(), "stream completed");

        Ok(StatefulOutcome::Completed {
            checksum: checksum.value(),
        })
    }

    async fn create(&self, client_id: &str, total_messages: u32) -> Result<Session, ProtocolError> {
        let session = Session::new(self.seeds.next_seed(), total_messages, now_epoch());
        self.store.upsert(client_id, session).await?;
        tracing::info!(client_id, total_messages, "session created");
        Ok(session)
    }

    async fn resume(&self, client_id: &str) -> Result<Session, ProtocolError> {
        let session = self
            .store
            .read(client_id)
            .await?
            .ok_or_else(|| ProtocolError::SessionNotFound(client_id.to_owned()))?;

        if is_expired(&session, now_epoch(), self.config.expiration_secs) {
            tracing::info!(
                client_id,
                last_activity = session.last_activity_epoch,
                "rejecting stale reconnect"
            );
            return Err(ProtocolError::SessionExpired(client_id.to_owned()));
        }

        tracing::info!(client_id, progress = session.progress, "session resumed");
        Ok(session)
    }
}
