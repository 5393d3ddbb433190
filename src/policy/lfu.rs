//! LFU Policy Module
//!
//! Implements Least Frequently Used eviction ordering.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use crate::error::{CacheError, CacheResult};
use crate::policy::EvictionPolicy;

// == Key State ==
/// Per-key frequency tracking.
#[derive(Debug, Clone, Copy)]
struct KeyState {
    /// Access count; starts at 1 on insert, +1 per read
    frequency: u64,
    /// Insertion sequence number, used to break frequency ties
    inserted_seq: u64,
}

// == LFU Policy ==
/// Tracks access frequency per key for LFU eviction.
///
/// The frequency counter starts at 1 when a key is first set (an insert is
/// an access) and increments on every read. Eviction removes the key with
/// the lowest frequency; ties are broken by oldest insertion first via a
/// monotonic sequence number, keeping the rule deterministic.
#[derive(Debug, Default)]
pub struct LfuPolicy<K> {
    /// Frequency and insertion order per tracked key
    keys: HashMap<K, KeyState>,
    /// Monotonic counter assigning insertion order
    next_seq: u64,
    /// Maximum tracked keys, None = unbounded
    capacity: Option<usize>,
}

impl<K: Eq + Hash + Clone> LfuPolicy<K> {
    // == Constructors ==
    /// Creates an unbounded LFU policy; eviction is never requested.
    pub fn unbounded() -> Self {
        Self {
            keys: HashMap::new(),
            next_seq: 0,
            capacity: None,
        }
    }

    /// Creates an LFU policy bounded to `capacity` keys.
    ///
    /// # Errors
    /// Returns `InvalidCapacity` if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> CacheResult<Self> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity(capacity));
        }
        Ok(Self {
            keys: HashMap::with_capacity(capacity),
            next_seq: 0,
            capacity: Some(capacity),
        })
    }

    /// Returns the access frequency recorded for a key, if tracked.
    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.keys.get(key).map(|state| state.frequency)
    }
}

impl<K, V> EvictionPolicy<K, V> for LfuPolicy<K>
where
    K: Eq + Hash + Clone + Send,
{
    fn on_get(&mut self, key: &K, _value: &V) {
        if let Some(state) = self.keys.get_mut(key) {
            state.frequency += 1;
        }
    }

    fn on_set(&mut self, key: &K, _value: &V, _ttl: Duration) {
        match self.keys.get_mut(key) {
            // Overwrite counts as an access; insertion order is kept
            Some(state) => state.frequency += 1,
            None => {
                let state = KeyState {
                    frequency: 1,
                    inserted_seq: self.next_seq,
                };
                self.next_seq += 1;
                self.keys.insert(key.clone(), state);
            }
        }
    }

    fn on_delete(&mut self, key: &K) {
        self.keys.remove(key);
    }

    fn on_clear(&mut self) {
        self.keys.clear();
    }

    fn evict(&mut self) -> Option<K> {
        let victim = self
            .keys
            .iter()
            .min_by_key(|(_, state)| (state.frequency, state.inserted_seq))
            .map(|(key, _)| key.clone())?;
        self.keys.remove(&victim);
        Some(victim)
    }

    fn len(&self) -> usize {
        self.keys.len()
    }

    fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}
