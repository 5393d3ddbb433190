//! FIFO Policy Module
//!
//! Implements First In, First Out eviction ordering.

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::{CacheError, CacheResult};
use crate::policy::EvictionPolicy;

// == FIFO Policy ==
/// Tracks strict insertion order for FIFO eviction.
///
/// Reads never affect the order; that is FIFO's defining property.
/// Re-setting an existing key keeps its original position.
#[derive(Debug, Default)]
pub struct FifoPolicy<K> {
    /// Keys in insertion order, front = oldest
    order: VecDeque<K>,
    /// Maximum tracked keys, None = unbounded
    capacity: Option<usize>,
}

impl<K: Eq + Clone> FifoPolicy<K> {
    // == Constructors ==
    /// Creates an unbounded FIFO policy; eviction is never requested.
    pub fn unbounded() -> Self {
        Self {
            order: VecDeque::new(),
            capacity: None,
        }
    }

    /// Creates a FIFO policy bounded to `capacity` keys.
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
}

impl<K, V> EvictionPolicy<K, V> for FifoPolicy<K>
where
    K: Eq + Clone + Send,
{
    fn on_get(&mut self, _key: &K, _value: &V) {
        // Access does not affect FIFO eviction order
    }

    fn on_set(&mut self, key: &K, _value: &V, _ttl: Duration) {
        if !self.order.contains(key) {
            self.order.push_back(key.clone());
        }
    }

    fn on_delete(&mut self, key: &K) {
        self.order.retain(|k| k != key);
    }

    fn on_clear(&mut self) {
        self.order.clear();
    }

    fn evict(&mut self) -> Option<K> {
        self.order.pop_front()
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}
