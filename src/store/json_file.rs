//! JSON-file store adapter
//!
//! Keeps the whole collection in memory and rewrites its file after every
//! mutation, so each write is durable on return - the durability contract
//! the engine assumes of its collaborator. Suitable for the demo driver and
//! the modest per-module collections this engine fronts, not for bulk data.

use crate::store::{KvCollection, StoreResult};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// File-backed collection persisted as one JSON object
pub struct JsonFileStore<V> {
    path: PathBuf,
    entries: Arc<RwLock<HashMap<String, V>>>,
}

impl<V> JsonFileStore<V>
where
    V: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    /// Open the collection at `path`, loading existing contents if present
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
        })
    }

    fn save(&self, entries: &HashMap<String, V>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(entries)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl<V> KvCollection<V> for JsonFileStore<V>
where
    V: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    async fn get(&self, id: &str) -> StoreResult<Option<V>> {
        Ok(self.entries.read().await.get(id).cloned())
    }

    async fn put(&self, id: &str, value: V) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(id.to_string(), value);
        self.save(&entries)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        if entries.remove(id).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }

    async fn entries(&self) -> StoreResult<Vec<(String, V)>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn clear(&self) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        entries.clear();
        self.save(&entries)
    }
}
