//! Core abstractions for resumable value streams.
//!
//! This crate provides the fundamental building blocks:
//! - `ValueStream` - Deterministic, seed-reproducible `u32` sequence
//! - `Session` - Persisted progress of one client's stream
//! - `SessionStore` and `StreamSink` traits
//! - Expiration policy and injectable seed sources

pub mod expiry;
pub mod seed;
pub mod traits;
pub mod value_stream;

pub use expiry::{is_expired, now_epoch};
pub use seed::{RngSeedSource, SeedSource};
pub use traits::{SendFailure, Session, SessionStore, StorageError, StreamSink};
pub use value_stream::{Checksum, ValueStream};
