//! Cache Engine Module
//!
//! The engine composes exactly one storage backend and one eviction policy
//! for its lifetime and is the single source of truth for entry liveness.
//! All mutations of the (store, policy) pair happen under one critical
//! section, so no caller ever observes a key tracked by the policy but
//! missing from the store, or vice versa.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cache::{CacheEntry, CacheStats};
use crate::config::{BatchConfig, MetricsConfig, PoolConfig};
use crate::error::{CacheError, CacheResult};
use crate::metrics::{MetricsHook, NoopMetrics};
use crate::policy::{EvictionPolicy, LruPolicy};
use crate::store::{MemoryStore, Store};

// == Engine State ==
/// The store/policy pair plus bookkeeping, guarded as one unit.
struct EngineState<K, V> {
    store: Box<dyn Store<K, V>>,
    policy: Box<dyn EvictionPolicy<K, V>>,
    stats: CacheStats,
    closed: bool,
}

impl<K, V> EngineState<K, V> {
    /// Rejects operations on a closed cache.
    fn ensure_open(&self) -> CacheResult<()> {
        if self.closed {
            return Err(CacheError::Closed);
        }
        Ok(())
    }
}

struct CacheInner<K, V> {
    state: Mutex<EngineState<K, V>>,
    metrics: Arc<dyn MetricsHook>,
    batch_config: BatchConfig,
    pool_config: PoolConfig,
    metrics_config: MetricsConfig,
}

// == Cache ==
/// A generic, concurrency-safe cache with TTL expiration.
///
/// Cloning is cheap and clones share the same underlying cache; this is how
/// the batch layer fans operations out across tasks.
///
/// Expiration is lazy: an entry whose deadline has passed is removed the
/// next time it is read, and reads report it as `KeyNotFound` exactly as if
/// it had never been set. Durable stores may additionally sweep expired
/// entries in the background on their own schedule.
pub struct Cache<K, V> {
    inner: Arc<CacheInner<K, V>>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates a cache with the default configuration: an unbounded LRU
    /// policy over an in-memory store.
    pub fn new() -> Self {
        CacheBuilder::new().build()
    }

    /// Returns a builder for assembling a customized cache.
    pub fn builder() -> CacheBuilder<K, V> {
        CacheBuilder::new()
    }

    // == Set ==
    /// Inserts or overwrites a key with the given value and TTL.
    ///
    /// The value is visible to subsequent `get` calls immediately. If the
    /// key is new and the policy is at capacity, victims are evicted before
    /// the insert; overwriting an existing key never triggers eviction.
    ///
    /// # Errors
    /// - `InvalidTtl` if `ttl` is zero
    /// - `Closed` if the cache was closed
    /// - `Store` if the backend fails
    pub async fn set(&self, key: K, value: V, ttl: Duration) -> CacheResult<()> {
        if ttl.is_zero() {
            return Err(CacheError::InvalidTtl);
        }

        let mut state = self.inner.state.lock().await;
        state.ensure_open()?;

        // An entry already present (even if expired) means this set is an
        // overwrite and must not evict
        let is_overwrite = state.store.get(&key).await?.is_some();
        if !is_overwrite {
            while let Some(capacity) = state.policy.capacity() {
                if state.policy.len() < capacity {
                    break;
                }
                let Some(victim) = state.policy.evict() else {
                    break;
                };
                state.store.delete(&victim).await?;
                state.stats.record_eviction();
                self.inner.metrics.on_eviction();
                debug!("evicted key to make room at capacity {capacity}");
            }
        }

        let entry = CacheEntry::new(value.clone(), ttl);
        state.store.set(key.clone(), entry).await?;
        state.policy.on_set(&key, &value, ttl);
        let tracked = state.policy.len();
        state.stats.set_total_entries(tracked);
        self.inner.metrics.on_set();
        Ok(())
    }

    // == Get ==
    /// Retrieves the live value for a key.
    ///
    /// An entry whose TTL has elapsed is removed from the store and policy
    /// and reported as `KeyNotFound`.
    ///
    /// # Errors
    /// - `KeyNotFound` if the key is absent or expired
    /// - `Closed` if the cache was closed
    /// - `Store` if the backend fails
    pub async fn get(&self, key: &K) -> CacheResult<V> {
        let mut state = self.inner.state.lock().await;
        state.ensure_open()?;

        match state.store.get(key).await? {
            Some(entry) if !entry.is_expired() => {
                let value = entry.value;
                state.policy.on_get(key, &value);
                state.stats.record_hit();
                self.inner.metrics.on_hit();
                Ok(value)
            }
            Some(_) => {
                // Lazy expiration: drop the stale entry on access
                state.store.delete(key).await?;
                state.policy.on_delete(key);
                let tracked = state.policy.len();
                state.stats.set_total_entries(tracked);
                state.stats.record_expiration();
                state.stats.record_miss();
                self.inner.metrics.on_miss();
                Err(CacheError::KeyNotFound)
            }
            None => {
                // A durable store's background sweep removes files without
                // telling the engine; untrack here so the policy does not
                // keep counting a key the store no longer holds
                state.policy.on_delete(key);
                let tracked = state.policy.len();
                state.stats.set_total_entries(tracked);
                state.stats.record_miss();
                self.inner.metrics.on_miss();
                Err(CacheError::KeyNotFound)
            }
        }
    }

    // == Delete ==
    /// Removes a key from the store and policy.
    ///
    /// Deleting an absent key returns `KeyNotFound`; repeating the delete
    /// returns `KeyNotFound` again rather than failing fatally.
    pub async fn delete(&self, key: &K) -> CacheResult<()> {
        let mut state = self.inner.state.lock().await;
        state.ensure_open()?;

        if !state.store.delete(key).await? {
            return Err(CacheError::KeyNotFound);
        }
        state.policy.on_delete(key);
        let tracked = state.policy.len();
        state.stats.set_total_entries(tracked);
        self.inner.metrics.on_delete();
        Ok(())
    }

    // == Clear ==
    /// Removes every entry and resets the policy; counters are retained.
    ///
    /// Clearing an already empty cache is a no-op.
    pub async fn clear(&self) -> CacheResult<()> {
        let mut state = self.inner.state.lock().await;
        state.ensure_open()?;

        state.store.clear().await?;
        state.policy.on_clear();
        state.stats.set_total_entries(0);
        Ok(())
    }

    // == Close ==
    /// Flushes and releases the store; every later call fails with `Closed`.
    ///
    /// Expected to be called exactly once; a second close also returns
    /// `Closed`.
    pub async fn close(&self) -> CacheResult<()> {
        let mut state = self.inner.state.lock().await;
        state.ensure_open()?;

        state.store.close().await?;
        state.closed = true;
        info!("cache closed");
        Ok(())
    }

    // == Accessors ==
    /// Returns a snapshot of the performance counters.
    pub async fn stats(&self) -> CacheStats {
        self.inner.state.lock().await.stats.clone()
    }

    /// Number of live keys currently tracked by the policy.
    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.policy.len()
    }

    /// Returns true if no keys are tracked.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// The batch configuration this cache was built with.
    pub fn batch_config(&self) -> &BatchConfig {
        &self.inner.batch_config
    }

    /// The pool collaborator configuration this cache was built with.
    pub fn pool_config(&self) -> &PoolConfig {
        &self.inner.pool_config
    }

    /// The metrics identity this cache was built with.
    pub fn metrics_config(&self) -> &MetricsConfig {
        &self.inner.metrics_config
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

// == Cache Builder ==
/// Assembles a [`Cache`] from its collaborators.
///
/// Every part has a default: unbounded LRU policy, in-memory store, default
/// batch/pool configs and no metrics hook.
pub struct CacheBuilder<K, V> {
    policy: Option<Box<dyn EvictionPolicy<K, V>>>,
    store: Option<Box<dyn Store<K, V>>>,
    batch_config: BatchConfig,
    pool_config: PoolConfig,
    metrics_config: MetricsConfig,
    metrics: Option<Arc<dyn MetricsHook>>,
}

impl<K, V> CacheBuilder<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a builder with all defaults.
    pub fn new() -> Self {
        Self {
            policy: None,
            store: None,
            batch_config: BatchConfig::default(),
            pool_config: PoolConfig::default(),
            metrics_config: MetricsConfig::default(),
            metrics: None,
        }
    }

    /// Sets the eviction policy; built-ins and custom implementations plug
    /// in the same way.
    pub fn policy(mut self, policy: impl EvictionPolicy<K, V> + 'static) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }

    /// Sets the storage backend.
    pub fn store(mut self, store: impl Store<K, V> + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Sets the batch layer configuration.
    pub fn batch_config(mut self, config: BatchConfig) -> Self {
        self.batch_config = config;
        self
    }

    /// Sets the value-recycling pool collaborator configuration.
    pub fn pool_config(mut self, config: PoolConfig) -> Self {
        self.pool_config = config;
        self
    }

    /// Sets the metrics identity (cache name and labels).
    pub fn metrics_config(mut self, config: MetricsConfig) -> Self {
        self.metrics_config = config;
        self
    }

    /// Sets the metrics hook receiving per-operation events.
    pub fn metrics(mut self, hook: Arc<dyn MetricsHook>) -> Self {
        self.metrics = Some(hook);
        self
    }

    /// Builds the cache.
    pub fn build(self) -> Cache<K, V> {
        let policy = self
            .policy
            .unwrap_or_else(|| Box::new(LruPolicy::unbounded()));
        let store = self
            .store
            .unwrap_or_else(|| Box::new(MemoryStore::new()));
        let metrics = self.metrics.unwrap_or_else(|| Arc::new(NoopMetrics));

        Cache {
            inner: Arc::new(CacheInner {
                state: Mutex::new(EngineState {
                    store,
                    policy,
                    stats: CacheStats::new(),
                    closed: false,
                }),
                metrics,
                batch_config: self.batch_config,
                pool_config: self.pool_config,
                metrics_config: self.metrics_config,
            }),
        }
    }
}

impl<K, V> Default for CacheBuilder<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
