//! Process-wide server configuration.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use clap::Parser;
use resumable_stream_core::now_epoch;
use resumable_stream_session::HandlerConfig;

/// Resumable stream server.
///
/// Streams pseudo-random values over WebSocket and lets clients resume a
/// stream after a dropped connection.
#[derive(Debug, Clone, Parser)]
#[command(name = "resumable-stream-server", version, about)]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(env = "RESUMABLE_STREAM_PORT")]
    pub port: u16,

    /// Address to bind.
    #[arg(long, env = "RESUMABLE_STREAM_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Milliseconds between two emitted values.
    #[arg(long = "interval", value_name = "MS", default_value_t = 1_000)]
    pub interval_ms: u64,

    /// Idle seconds after which a session can no longer be resumed.
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub expiration_secs: i64,

    /// Print debug lines.
    #[arg(long)]
    pub debug: bool,

    /// Seed for session seeds and stateless starting values.
    ///
    /// Defaults to the current Unix time.
    #[arg(long, env = "RESUMABLE_STREAM_SEED")]
    pub seed: Option<u64>,
}

impl ServerConfig {
    /// Socket address to bind.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Settings for the protocol handlers.
    #[must_use]
    pub const fn handler_config(&self) -> HandlerConfig {
        HandlerConfig {
            send_interval: Duration::from_millis(self.interval_ms),
            expiration_secs: self.expiration_secs,
        }
    }

    /// Effective randomness seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
            .unwrap_or_else(|| u64::try_from(now_epoch()).unwrap_or_default())
    }

    /// Default tracing filter directive.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::try_parse_from(["server", "10240"]).unwrap();
        assert_eq!(config.addr(), "127.0.0.1:10240".parse::<SocketAddr>().unwrap());
        assert_eq!(config.handler_config().send_interval, Duration::from_secs(1));
        assert_eq!(config.handler_config().expiration_secs, 30);
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn test_seed_defaults_to_current_time() {
        let before = u64::try_from(now_epoch()).unwrap();
        let config = ServerConfig::try_parse_from(["server", "10240"]).unwrap();
        let seed = config.seed();
        let after = u64::try_from(now_epoch()).unwrap();
        assert!((before..=after).contains(&seed), "{seed}");
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::try_parse_from([
            "server",
            "--interval",
            "5",
            "--expiration-secs",
            "1",
            "--debug",
            "--seed",
            "2",
            "--host",
            "0.0.0.0",
            "9000",
        ])
        .unwrap();
        assert_eq!(config.addr(), "0.0.0.0:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.handler_config().send_interval, Duration::from_millis(5));
        assert_eq!(config.handler_config().expiration_secs, 1);
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.seed(), 2);
    }

    #[test]
    fn test_port_must_be_numeric() {
        assert!(ServerConfig::try_parse_from(["server", "not-a-port"]).is_err());
    }
}
