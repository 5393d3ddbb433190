//! In-Memory Store Module
//!
//! HashMap-backed storage, the default backend.

use std::collections::HashMap;
use std::hash::Hash;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::CacheEntry;
use crate::error::CacheResult;
use crate::store::Store;

// == Memory Store ==
/// Plain in-memory key/value table behind an async RwLock.
///
/// Entries vanish when the store is dropped; `close` is a no-op beyond the
/// engine-level contract.
#[derive(Debug, Default)]
pub struct MemoryStore<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> MemoryStore<K, V> {
    // == Constructor ==
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<K, V> Store<K, V> for MemoryStore<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> CacheResult<Option<CacheEntry<V>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: K, entry: CacheEntry<V>) -> CacheResult<()> {
        self.entries.write().await.insert(key, entry);
        Ok(())
    }

    async fn delete(&self, key: &K) -> CacheResult<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn clear(&self) -> CacheResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn close(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn len(&self) -> CacheResult<usize> {
        Ok(self.entries.read().await.len())
    }
}
