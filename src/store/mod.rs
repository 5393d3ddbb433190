//! Store Module
//!
//! Storage backends for cache entries. Stores are pure key/value/deadline
//! I/O with no eviction awareness; liveness checks stay in the engine so
//! backends remain interchangeable.

mod file;
mod memory;

pub use file::{FileConfig, FileStore};
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::cache::CacheEntry;
use crate::error::CacheResult;

// == Store Trait ==
/// Capability set of a storage backend.
///
/// A store returns whatever it holds, expired or not; the engine owns the
/// expiry check. Implementations must be safe for concurrent use, although
/// the engine already serializes all calls for one cache instance.
#[async_trait]
pub trait Store<K, V>: Send + Sync {
    /// Returns the raw entry for a key, or None if absent.
    async fn get(&self, key: &K) -> CacheResult<Option<CacheEntry<V>>>;

    /// Inserts or overwrites the entry for a key.
    async fn set(&self, key: K, entry: CacheEntry<V>) -> CacheResult<()>;

    /// Removes a key; returns whether it was present.
    async fn delete(&self, key: &K) -> CacheResult<bool>;

    /// Removes all entries.
    async fn clear(&self) -> CacheResult<()>;

    /// Flushes pending writes and releases resources.
    async fn close(&self) -> CacheResult<()>;

    /// Number of entries currently held, live or expired.
    async fn len(&self) -> CacheResult<usize>;
}
