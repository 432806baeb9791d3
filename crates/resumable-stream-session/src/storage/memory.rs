//! In-memory session storage.

use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;
use resumable_stream_core::{Session, SessionStore, StorageError};

/// In-memory storage implementation.
///
/// Useful for single-process deployments. Data is lost on restart, and
/// sessions whose client never comes back are never evicted.
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemoryStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live sessions.
    ///
    /// # Errors
    /// Returns error if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self
            .sessions
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .len())
    }

    /// Whether the store holds no sessions.
    ///
    /// # Errors
    /// Returns error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        self.len().map(|n| n == 0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn read(&self, client_id: &str) -> Result<Option<Session>, StorageError> {
        Ok(self
            .sessions
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .get(client_id)
            .copied())
    }

    async fn upsert(&self, client_id: &str, session: Session) -> Result<(), StorageError> {
        self.sessions
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .insert(client_id.to_owned(), session);

        Ok(())
    }

    async fn delete(&self, client_id: &str) -> Result<(), StorageError> {
        self.sessions
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .remove(client_id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio_test::{assert_ok, block_on};

    use super::*;

    fn marked(n: u32) -> Session {
        Session {
            seed: i64::from(n),
            progress: n,
            total_messages: n,
            last_activity_epoch: i64::from(n),
        }
    }

    #[test]
    fn test_read_missing_is_none() {
        let store = MemoryStore::new();
        let found = assert_ok!(block_on(store.read("nobody")));
        assert!(found.is_none());
    }

    #[test]
    fn test_upsert_then_read() {
        let store = MemoryStore::new();
        let session = Session::new(11, 5, 1_000);
        assert_ok!(block_on(store.upsert("a", session)));
        assert_eq!(assert_ok!(block_on(store.read("a"))), Some(session));

        let advanced = Session {
            progress: 1,
            last_activity_epoch: 1_001,
            ..session
        };
        assert_ok!(block_on(store.upsert("a", advanced)));
        assert_eq!(assert_ok!(block_on(store.read("a"))), Some(advanced));
        assert_eq!(assert_ok!(store.len()), 1);
    }

    #[test]
    fn test_delete_absent_is_ok() {
        let store = MemoryStore::new();
        assert_ok!(block_on(store.delete("ghost")));
        assert_ok!(block_on(store.upsert("a", marked(1))));
        assert_ok!(block_on(store.delete("a")));
        assert_ok!(block_on(store.delete("a")));
        assert!(assert_ok!(store.is_empty()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_distinct_ids() {
        let store = Arc::new(MemoryStore::new());
        let mut tasks = Vec::new();

        for worker in 0..16_u32 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                let id = format!("client-{worker}");
                for round in 0..200_u32 {
                    let session = marked(worker * 1_000 + round);
                    store.upsert(&id, session).await.unwrap();
                    assert_eq!(store.read(&id).await.unwrap(), Some(session));
                }
                if worker % 2 == 0 {
                    store.delete(&id).await.unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.len().unwrap(), 8);
        for worker in (1..16_u32).step_by(2) {
            let id = format!("client-{worker}");
            assert_eq!(
                store.read(&id).await.unwrap(),
                Some(marked(worker * 1_000 + 199))
            );
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_id_never_tears() {
        let store = Arc::new(MemoryStore::new());
        let mut tasks = Vec::new();

        for worker in 0..8_u32 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                for round in 0..500_u32 {
                    let n = worker * 10_000 + round;
                    match round % 3 {
                        0 | 1 => store.upsert("shared", marked(n)).await.unwrap(),
                        _ => store.delete("shared").await.unwrap(),
                    }
                    if let Some(seen) = store.read("shared").await.unwrap() {
                        assert_eq!(seen, marked(seen.progress));
                    }
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        if let Some(last) = store.read("shared").await.unwrap() {
            assert_eq!(last, marked(last.progress));
        }
        assert!(store.len().unwrap() <= 1);
    }
}
