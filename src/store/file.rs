use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::store::{KvStore, keys};

/// Current on-disk schema version. Version 0 = legacy files without the
/// marker, which still need the one-time legacy migration.
const SCHEMA_VERSION: u64 = 1;

/// File-backed store: one JSON document, loaded at open, rewritten on every
/// mutation via temp-file + rename so a crash never leaves a torn state file.
pub struct FileStore {
    path: PathBuf,
    data: RwLock<HashMap<String, Value>>,
}

impl FileStore {
    /// Open the state file, creating an empty document if it does not exist.
    ///
    /// On first load (schema version 0) the legacy state file, if configured
    /// and present, is folded into the document; keys already present in the
    /// primary win. The schema marker is stamped so the migration never runs
    /// again.
    pub async fn open(path: PathBuf, legacy_path: Option<&Path>) -> Result<Self> {
        let mut data = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str::<HashMap<String, Value>>(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        let schema_version = data
            .get(keys::SCHEMA_VERSION)
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let mut dirty = false;
        if schema_version == 0 {
            if let Some(legacy) = legacy_path {
                let migrated = migrate_legacy(&mut data, legacy).await;
                if migrated > 0 {
                    info!(keys = migrated, legacy = %legacy.display(), "migrated legacy state");
                }
            }
            data.insert(keys::SCHEMA_VERSION.to_string(), Value::from(SCHEMA_VERSION));
            dirty = true;
        } else if schema_version > SCHEMA_VERSION {
            warn!(
                version = schema_version,
                "state file has newer schema version than supported ({}), some fields may be lost",
                SCHEMA_VERSION
            );
        }

        let store = Self {
            path,
            data: RwLock::new(data),
        };
        if dirty {
            let snapshot = store.data.read().await.clone();
            store.persist(&snapshot).await?;
        }
        Ok(store)
    }

    /// Write the document to a temp file then rename (atomic on the same
    /// filesystem).
    async fn persist(&self, snapshot: &HashMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        let contents = serde_json::to_string_pretty(snapshot)?;
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &contents).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

/// Fold a legacy state file into `data`. Returns the number of keys copied.
/// Unreadable or unparsable legacy files are skipped; migration is
/// best-effort and must never block startup.
async fn migrate_legacy(data: &mut HashMap<String, Value>, legacy: &Path) -> usize {
    let contents = match tokio::fs::read_to_string(legacy).await {
        Ok(contents) => contents,
        Err(e) => {
            debug!(path = %legacy.display(), error = %e, "no legacy state to migrate");
            return 0;
        }
    };
    let legacy_data: HashMap<String, Value> = match serde_json::from_str(&contents) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(path = %legacy.display(), error = %e, "legacy state file is unparsable, skipping migration");
            return 0;
        }
    };

    let mut migrated = 0;
    for (key, value) in legacy_data {
        if key != keys::SCHEMA_VERSION && !data.contains_key(&key) {
            data.insert(key, value);
            migrated += 1;
        }
    }
    migrated
}

#[async_trait]
impl KvStore for FileStore {
    async fn get_raw(&self, key: &str) -> Result<Option<Value>> {
        let data = self.data.read().await;
        Ok(data.get(key).cloned())
    }

    async fn set_raw(&self, entries: Vec<(String, Value)>) -> Result<()> {
        // The write lock is held across the file write so snapshots land on
        // disk in mutation order.
        let mut data = self.data.write().await;
        for (key, value) in entries {
            data.insert(key, value);
        }
        let snapshot = data.clone();
        self.persist(&snapshot).await
    }

    async fn remove_raw(&self, keys: &[&str]) -> Result<()> {
        let mut data = self.data.write().await;
        for key in keys {
            data.remove(*key);
        }
        let snapshot = data.clone();
        self.persist(&snapshot).await
    }
}
