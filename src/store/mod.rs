//! Persistent key/value store shared by the background agent and the UI
//! process.
//!
//! Single-key get/set on a backend is atomic; read-modify-write sequences
//! must run inside a named lock scope (`Store::lock`) so a UI-initiated
//! write cannot race a background-initiated one and silently lose a change.

pub mod file;
pub mod memory;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::Result;

/// Persisted state keys.
pub mod keys {
    pub const WORKSPACES: &str = "workspaces";
    pub const SAVED_TABS: &str = "savedTabs";
    pub const ACTIVE_WORKSPACE_ID: &str = "activeWorkspaceId";
    pub const IS_SWITCHING: &str = "isSwitchingWorkspace";
    pub const RESOURCES: &str = "resources";
    pub const NOTES: &str = "notes";
    pub const TODOS: &str = "todos";
    pub const SCHEMA_VERSION: &str = "schemaVersion";
}

/// Durable key/value backend with atomic single-key operations.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<Value>>;
    async fn set_raw(&self, entries: Vec<(String, Value)>) -> Result<()>;
    async fn remove_raw(&self, keys: &[&str]) -> Result<()>;
}

/// Typed access plus named mutual-exclusion scopes over a `KvStore`.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn KvStore>,
    scopes: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl Store {
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self {
            backend,
            scopes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.backend.get_raw(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Read a key, falling back to `T::default()` when absent.
    pub async fn get_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        Ok(self.get(key).await?.unwrap_or_default())
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.backend.set_raw(vec![(key.to_string(), value)]).await
    }

    pub async fn remove(&self, keys: &[&str]) -> Result<()> {
        self.backend.remove_raw(keys).await
    }

    /// Acquire the named mutual-exclusion scope. Hold the returned guard
    /// across the whole read-modify-write sequence. Callers must not nest
    /// acquisitions of the same scope within one logical task.
    pub async fn lock(&self, name: &str) -> OwnedMutexGuard<()> {
        let scope = {
            let mut scopes = self.scopes.lock().await;
            Arc::clone(scopes.entry(name.to_string()).or_default())
        };
        scope.lock_owned().await
    }
}
