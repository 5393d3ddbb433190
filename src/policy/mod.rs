//! Eviction Policy Module
//!
//! Tracks access order over the live key set and decides which key to evict
//! when the cache is at capacity. Policies are notified of every access but
//! never touch the storage backend; the engine performs the actual removal.
//!
//! Built-in implementations: [`LruPolicy`], [`LfuPolicy`], [`FifoPolicy`].
//! Any external type implementing [`EvictionPolicy`] plugs into the engine
//! the same way.

mod fifo;
mod lfu;
mod lru;

pub use fifo::FifoPolicy;
pub use lfu::LfuPolicy;
pub use lru::LruPolicy;

use std::time::Duration;

// == Eviction Policy Trait ==
/// Capability set of an eviction policy.
///
/// The engine calls these under its own lock, so implementations need no
/// internal synchronization. Policies are infallible: they observe accesses
/// and nominate eviction victims, nothing more.
pub trait EvictionPolicy<K, V>: Send {
    /// Called on every successful cache read.
    fn on_get(&mut self, key: &K, value: &V);

    /// Called on every insert or overwrite.
    fn on_set(&mut self, key: &K, value: &V, ttl: Duration);

    /// Called when a key is removed (explicit delete or lazy expiry).
    fn on_delete(&mut self, key: &K);

    /// Called when the cache is cleared; resets all tracking state.
    fn on_clear(&mut self);

    /// Returns and stops tracking the next eviction victim, if any.
    fn evict(&mut self) -> Option<K>;

    /// Number of keys currently tracked.
    fn len(&self) -> usize;

    /// Returns true if no keys are tracked.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of tracked keys, or None for unbounded.
    fn capacity(&self) -> Option<usize>;
}
