//! In-memory store adapter
//!
//! Backs tests and demo seeding. Shared `HashMap` behind Tokio's async
//! `RwLock`, cloned values in and out so nothing aliases live state.

use crate::store::{KvCollection, StoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// HashMap-backed collection
#[derive(Clone, Default)]
pub struct MemoryStore<V> {
    entries: Arc<RwLock<HashMap<String, V>>>,
}

impl<V: Clone + Send + Sync + 'static> MemoryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of entries currently held
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl<V: Clone + Send + Sync + 'static> KvCollection<V> for MemoryStore<V> {
    async fn get(&self, id: &str) -> StoreResult<Option<V>> {
        Ok(self.entries.read().await.get(id).cloned())
    }

    async fn put(&self, id: &str, value: V) -> StoreResult<()> {
        self.entries.write().await.insert(id.to_string(), value);
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.entries.write().await.remove(id);
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
        self.entries.write().await.clear();
        Ok(())
    }
}
