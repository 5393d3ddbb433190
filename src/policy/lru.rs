//! LRU Policy Module
//!
//! Implements Least Recently Used eviction ordering.

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::{CacheError, CacheResult};
use crate::policy::EvictionPolicy;

// == LRU Policy ==
/// Tracks access order for LRU eviction.
///
/// Keys are stored in a VecDeque where:
/// - Front = Most recently used
/// - Back = Least recently used
///
/// Both reads and writes count as uses and move the key to the front.
#[derive(Debug, Default)]
pub struct LruPolicy<K> {
    /// Order of keys by access time
    order: VecDeque<K>,
    /// Maximum tracked keys, None = unbounded
    capacity: Option<usize>,
}

impl<K: Eq + Clone> LruPolicy<K> {
    // == Constructors ==
    /// Creates an unbounded LRU policy; eviction is never requested.
    pub fn unbounded() -> Self {
        Self {
            order: VecDeque::new(),
            capacity: None,
        }
    }

    /// Creates an LRU policy bounded to `capacity` keys.
    ///
    /// # Errors
    /// Returns `InvalidCapacity` if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> CacheResult<Self> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity(capacity));
        }
        Ok(Self {
            order: VecDeque::with_capacity(capacity),
            capacity: Some(capacity),
        })
    }

    // == Touch ==
    /// Marks a key as most recently used, inserting it if new.
    fn touch(&mut self, key: &K) {
        self.order.retain(|k| k != key);
        self.order.push_front(key.clone());
    }
}

impl<K, V> EvictionPolicy<K, V> for LruPolicy<K>
where
    K: Eq + Clone + Send,
{
    fn on_get(&mut self, key: &K, _value: &V) {
        self.touch(key);
    }

    fn on_set(&mut self, key: &K, _value: &V, _ttl: Duration) {
        self.touch(key);
    }

    fn on_delete(&mut self, key: &K) {
        self.order.retain(|k| k != key);
    }

    fn on_clear(&mut self) {
        self.order.clear();
    }

    fn evict(&mut self) -> Option<K> {
        self.order.pop_back()
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}
