use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::store::KvStore;

/// In-memory backend used by tests and the embedded UI process.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, Value>>,
    writes: AtomicU64,
    fail_next_set: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set_raw` calls that reached the backend. Lets tests
    /// observe that an idempotent pass produced no redundant write.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make the next write fail with a storage error, for exercising the
    /// abort-the-pass failure path.
    pub fn fail_next_set(&self) {
        self.fail_next_set.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get_raw(&self, key: &str) -> Result<Option<Value>> {
        let data = self.data.read().await;
        Ok(data.get(key).cloned())
    }

    async fn set_raw(&self, entries: Vec<(String, Value)>) -> Result<()> {
        if self.fail_next_set.swap(false, Ordering::SeqCst) {
            return Err(Error::store("injected write failure"));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut data = self.data.write().await;
        for (key, value) in entries {
            data.insert(key, value);
        }
        Ok(())
    }

    async fn remove_raw(&self, keys: &[&str]) -> Result<()> {
        let mut data = self.data.write().await;
        for key in keys {
            data.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn counts_writes() {
        let backend = Arc::new(MemoryStore::new());
        assert_eq!(backend.write_count(), 0);

        backend
            .set_raw(vec![("k".into(), Value::from(1))])
            .await
            .unwrap();
        backend
            .set_raw(vec![("k".into(), Value::from(2))])
            .await
            .unwrap();
        assert_eq!(backend.write_count(), 2);
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let backend = MemoryStore::new();
        backend.fail_next_set();

        let err = backend
            .set_raw(vec![("k".into(), Value::from(1))])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));

        // Subsequent writes succeed and the failed write left no data.
        assert!(backend.get_raw("k").await.unwrap().is_none());
        backend
            .set_raw(vec![("k".into(), Value::from(2))])
            .await
            .unwrap();
        assert_eq!(backend.get_raw("k").await.unwrap(), Some(Value::from(2)));
    }
}
