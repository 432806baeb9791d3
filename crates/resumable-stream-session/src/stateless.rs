//! Stateless doubling stream handler.

use std::{sync::Arc, time::Duration};

use resumable_stream_core::{SeedSource, SendFailure, StreamSink};

use crate::messages::{StatelessMessage, StatelessRequest};

/// Handler for the stateless protocol.
///
/// Each value is double the previous one, so a client resumes by sending the
/// last value it saw. Values wrap to zero after 32 doublings, which makes
/// streams longer than that indistinguishable from one another.
pub struct StatelessHandler<R: SeedSource> {
    seeds: Arc<R>,
    send_interval: Duration,
}

impl<R: SeedSource> StatelessHandler<R> {
    /// Create a new stateless handler.
    #[must_use]
    pub const fn new(seeds: Arc<R>, send_interval: Duration) -> Self {
        Self {
            seeds,
            send_interval,
        }
    }

    /// Stream values until the peer goes away.
    ///
    /// Returns how many values were delivered.
    pub async fn serve<K>(&self, request: StatelessRequest, sink: &mut K) -> u64
    where
        K: StreamSink<StatelessMessage>,
    {
        let mut value = request.last_message_value.wrapping_mul(2);
        if value == 0 {
            value = u32::from(self.seeds.next_byte());
        }

        let mut sent = 0;
        loop {
            match sink.send(StatelessMessage { value }).await {
                Ok(()) => {
                    sent += 1;
                    tracing::debug!(value, "sent");
                }
                Err(e) if e.is_disconnect() => {
                    tracing::info!(sent, "stateless client disconnected");
                    return sent;
                }
                Err(e) => tracing::warn!(error = %e, "cannot send"),
            }
            value = value.wrapping_mul(2);
            tokio::time::sleep(self.send_interval).await;
        }
    }
}
