//! Test doubles shared by the handler tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use resumable_stream_core::{SendFailure, Session, SessionStore, StorageError, StreamSink};
use thiserror::Error;

use crate::storage::MemoryStore;

#[derive(Debug, Error)]
pub enum TestSendError {
    #[error("peer gone")]
    Gone,
    #[error("frame rejected")]
    Rejected,
}

impl SendFailure for TestSendError {
    fn is_disconnect(&self) -> bool {
        matches!(self, Self::Gone)
    }
}

/// Records sent messages and fails once `accept` of them have been delivered.
pub struct RecordingSink<M> {
    pub sent: Vec<M>,
    accept: Option<usize>,
    failure: fn() -> TestSendError,
    pub failures: usize,
}

impl<M> RecordingSink<M> {
    pub fn unbounded() -> Self {
        Self {
            sent: Vec::new(),
            accept: None,
            failure: || TestSendError::Gone,
            failures: 0,
        }
    }

    pub fn disconnect_after(accept: usize) -> Self {
        Self {
            accept: Some(accept),
            ..Self::unbounded()
        }
    }

    pub fn reject_after(accept: usize) -> Self {
        Self {
            accept: Some(accept),
            failure: || TestSendError::Rejected,
            ..Self::unbounded()
        }
    }
}

#[async_trait]
impl<M: Send + 'static> StreamSink<M> for RecordingSink<M> {
    type Error = TestSendError;

    async fn send(&mut self, msg: M) -> Result<(), Self::Error> {
        if self.accept.is_some_and(|n| self.sent.len() >= n) {
            self.failures += 1;
            return Err((self.failure)());
        }
        self.sent.push(msg);
        Ok(())
    }
}

/// Store whose writes always fail.
pub struct BrokenStore;

#[async_trait]
impl SessionStore for BrokenStore {
    async fn read(&self, _client_id: &str) -> Result<Option<Session>, StorageError> {
        Err(StorageError::Internal("disk on fire".into()))
    }

    async fn upsert(&self, _client_id: &str, _session: Session) -> Result<(), StorageError> {
        Err(StorageError::Internal("disk on fire".into()))
    }

    async fn delete(&self, _client_id: &str) -> Result<(), StorageError> {
        Err(StorageError::Internal("disk on fire".into()))
    }
}

/// Memory store that fails selected writes.
pub struct FlakyStore {
    inner: MemoryStore,
    upserts_allowed: Option<usize>,
    upserts: AtomicUsize,
    fail_delete: bool,
}

impl FlakyStore {
    /// Accept `n` upserts, then fail every later one.
    pub fn fail_upsert_after(n: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            upserts_allowed: Some(n),
            upserts: AtomicUsize::new(0),
            fail_delete: false,
        }
    }

    /// Fail every delete.
    pub fn fail_delete() -> Self {
        Self {
            upserts_allowed: None,
            fail_delete: true,
            ..Self::fail_upsert_after(0)
        }
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn read(&self, client_id: &str) -> Result<Option<Session>, StorageError> {
        self.inner.read(client_id).await
    }

    async fn upsert(&self, client_id: &str, session: Session) -> Result<(), StorageError> {
        let attempt = self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.upserts_allowed.is_some_and(|n| attempt >= n) {
            return Err(StorageError::Internal("write rejected".into()));
        }
        self.inner.upsert(client_id, session).await
    }

    async fn delete(&self, client_id: &str) -> Result<(), StorageError> {
        if self.fail_delete {
            return Err(StorageError::Internal("delete rejected".into()));
        }
        self.inner.delete(client_id).await
    }
}
