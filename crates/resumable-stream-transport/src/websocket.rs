//! WebSocket transport for resumable streams.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use resumable_stream_core::{SeedSource, SendFailure, SessionStore, StreamSink};
use resumable_stream_session::{
    ErrorCode, HandlerConfig, StatefulHandler, StatefulMessage, StatelessHandler,
    StatelessMessage,
};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::protocol::{ClientMessage, ServerMessage};

/// Both protocol handlers, sharing one seed source.
pub struct StreamService<S, R>
where
    S: SessionStore,
    R: SeedSource,
{
    stateful: StatefulHandler<S, R>,
    stateless: StatelessHandler<R>,
}

impl<S, R> StreamService<S, R>
where
    S: SessionStore,
    R: SeedSource,
{
    /// Create handlers over a session store and seed source.
    #[must_use]
    pub fn new(store: Arc<S>, seeds: Arc<R>, config: HandlerConfig) -> Self {
        Self {
            stateless: StatelessHandler::new(Arc::clone(&seeds), config.send_interval),
            stateful: StatefulHandler::new(store, seeds, config),
        }
    }
}

/// WebSocket handler state.
pub struct WsState<S, R>
where
    S: SessionStore,
    R: SeedSource,
{
    /// Shared protocol handlers.
    pub service: Arc<StreamService<S, R>>,
}

impl<S, R> WsState<S, R>
where
    S: SessionStore,
    R: SeedSource,
{
    /// Create new WebSocket state.
    #[must_use]
    pub const fn new(service: Arc<StreamService<S, R>>) -> Self {
        Self { service }
    }
}

impl<S, R> Clone for WsState<S, R>
where
    S: SessionStore,
    R: SeedSource,
{
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

/// WebSocket send error.
#[derive(Debug, Error)]
pub enum WsSendError {
    #[error("WebSocket closed: {0}")]
    Closed(#[from] axum::Error),
    #[error("Failed to serialize message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SendFailure for WsSendError {
    fn is_disconnect(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

/// Outbound half of a WebSocket, speaking [`ServerMessage`] frames.
pub struct WsSink {
    sender: SplitSink<WebSocket, Message>,
}

impl WsSink {
    /// Wrap the outbound half of a socket.
    #[must_use]
    pub const fn new(sender: SplitSink<WebSocket, Message>) -> Self {
        Self { sender }
    }

    /// Send one frame.
    ///
    /// # Errors
    /// Returns error if the message cannot be encoded or the socket is gone.
    pub async fn send_message(&mut self, msg: &ServerMessage) -> Result<(), WsSendError> {
        let json = serde_json::to_string(msg)?;
        self.sender.send(Message::Text(json.into())).await?;
        Ok(())
    }

    /// Close the socket, ignoring a peer that is already gone.
    pub async fn close(mut self) {
        if let Err(e) = self.sender.close().await {
            tracing::debug!("WebSocket already closed: {e}");
        }
    }
}

#[async_trait]
impl StreamSink<StatefulMessage> for WsSink {
    type Error = WsSendError;

    async fn send(&mut self, msg: StatefulMessage) -> Result<(), Self::Error> {
        self.send_message(&msg.into()).await
    }
}

#[async_trait]
impl StreamSink<StatelessMessage> for WsSink {
    type Error = WsSendError;

    async fn send(&mut self, msg: StatelessMessage) -> Result<(), Self::Error> {
        self.send_message(&msg.into()).await
    }
}

/// WebSocket upgrade handler.
///
/// Use this as an Axum route handler.
pub async fn ws_handler<S, R>(
    ws: WebSocketUpgrade,
    State(state): State<WsState<S, R>>,
) -> impl IntoResponse
where
    S: SessionStore + 'static,
    R: SeedSource + 'static,
{
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket<S, R>(socket: WebSocket, state: WsState<S, R>)
where
    S: SessionStore + 'static,
    R: SeedSource + 'static,
{
    let stream_id = Uuid::new_v4();
    let (sender, mut receiver) = socket.split();
    let mut sink = WsSink::new(sender);

    let request = match read_request(&mut receiver).await {
        Some(Ok(request)) => request,
        Some(Err(e)) => {
            tracing::warn!(%stream_id, "Invalid client message: {e}");
            let msg = ServerMessage::error(ErrorCode::BadRequest, format!("Invalid message: {e}"));
            if let Err(e) = sink.send_message(&msg).await {
                tracing::debug!(%stream_id, "Failed to report bad request: {e}");
            }
            sink.close().await;
            return;
        }
        None => return,
    };
    tracing::debug!(%stream_id, ?request, "stream opened");

    // Dropping the handler future on peer close cancels it at its next
    // suspension point; the last persisted progress stays in the store.
    match request {
        ClientMessage::Stateful(request) => {
            let client_id = request.client_id.clone();
            tokio::select! {
                result = state.service.stateful.serve(request, &mut sink) => match result {
                    Ok(outcome) => tracing::debug!(%stream_id, %client_id, ?outcome, "stream ended"),
                    Err(e) => {
                        tracing::warn!(%stream_id, %client_id, code = ?e.code(), "stream failed: {e}");
                        if let Err(e) = sink.send_message(&ServerMessage::from(&e)).await {
                            tracing::debug!(%stream_id, "Failed to report error: {e}");
                        }
                    }
                },
                () = peer_closed(&mut receiver) => {
                    tracing::info!(%stream_id, %client_id, "client closed stateful stream");
                }
            }
        }
        ClientMessage::Stateless(request) => {
            tokio::select! {
                sent = state.service.stateless.serve(request, &mut sink) => {
                    tracing::debug!(%stream_id, sent, "stateless stream ended");
                }
                () = peer_closed(&mut receiver) => {
                    tracing::info!(%stream_id, "client closed stateless stream");
                }
            }
        }
    }

    sink.close().await;
}

async fn read_request(
    receiver: &mut SplitStream<WebSocket>,
) -> Option<Result<ClientMessage, serde_json::Error>> {
    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                Ok(s) => s.into(),
                Err(_) => continue,
            },
            Ok(Message::Close(_)) => return None,
            Ok(_) => continue,
            Err(e) => {
                tracing::error!("WebSocket error: {e}");
                return None;
            }
        };
        return Some(serde_json::from_str(text.as_str()));
    }
    None
}

/// Resolves once the client closes the socket or the connection breaks.
async fn peer_closed(receiver: &mut SplitStream<WebSocket>) {
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) => return,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("WebSocket error: {e}");
                return;
            }
        }
    }
}

/// Create the stream router.
///
/// Serves the WebSocket endpoint at `/stream` and a liveness probe at
/// `/health`.
///
/// # Example
/// ```ignore
/// let service = Arc::new(StreamService::new(store, seeds, HandlerConfig::default()));
/// axum::serve(listener, create_router(service)).await?;
/// ```
#[must_use]
pub fn create_router<S, R>(service: Arc<StreamService<S, R>>) -> Router
where
    S: SessionStore + 'static,
    R: SeedSource + 'static,
{
    Router::new()
        .route("/stream", get(ws_handler::<S, R>))
        .route("/health", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(WsState::new(service))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_closed_socket_is_disconnect() {
        let closed = WsSendError::from(axum::Error::new(std::io::Error::from(
            std::io::ErrorKind::ConnectionReset,
        )));
        assert!(closed.is_disconnect());

        let encode = WsSendError::from(serde_json::from_str::<u32>("nope").unwrap_err());
        assert!(!encode.is_disconnect());
    }
}
