//! Resumable stream server.
//!
//! Run with: cargo run -p resumable-stream-server -- 10240
//!
//! Then connect a WebSocket client to ws://localhost:10240/stream.

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use resumable_stream_core::RngSeedSource;
use resumable_stream_session::storage::MemoryStore;
use resumable_stream_transport::websocket::{StreamService, create_router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level().into()),
        )
        .init();

    let seed = config.seed();
    let service = Arc::new(StreamService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(RngSeedSource::from_seed(seed)),
        config.handler_config(),
    ));
    let app = create_router(service);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(
        interval_ms = config.interval_ms,
        expiration_secs = config.expiration_secs,
        seed,
        "Server listening on ws://{addr}/stream"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server is shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
