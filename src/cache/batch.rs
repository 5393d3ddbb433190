//! Batch Cache Module
//!
//! Executes many single-key operations against one engine with bounded
//! concurrency and a shared deadline. Partial success is the expected
//! contract: keys processed before a failure or timeout keep their effect,
//! nothing is rolled back.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

use crate::cache::Cache;
use crate::config::BatchConfig;
use crate::error::{CacheError, CacheResult};

// == Batch Cache ==
/// Wraps a [`Cache`] to perform multi-key operations concurrently.
///
/// Each batch call fans its keys out over spawned tasks, gated by a
/// semaphore of `max_concurrent` permits, and runs under
/// `operation_timeout`. On timeout the call stops waiting and reports
/// `BatchTimeout`, but in-flight operations are never force-cancelled:
/// they run to completion in the background, so an engine operation is
/// never dropped mid-critical-section and the store/policy pair stays
/// consistent. No ordering is guaranteed among the keys of one batch.
pub struct BatchCache<K, V> {
    cache: Cache<K, V>,
    config: BatchConfig,
}

impl<K, V> BatchCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates a batch layer over the given cache with an explicit config.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCapacity` if `max_batch_size` or `max_concurrent`
    /// is zero; a zero-permit semaphore would stall every batch until its
    /// deadline.
    pub fn new(cache: Cache<K, V>, config: BatchConfig) -> CacheResult<Self> {
        config.validate()?;
        Ok(Self { cache, config })
    }

    /// Creates a batch layer using the batch config the cache was built
    /// with.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCapacity` if that config has a zero
    /// `max_batch_size` or `max_concurrent`.
    pub fn from_cache(cache: Cache<K, V>) -> CacheResult<Self> {
        let config = cache.batch_config().clone();
        Self::new(cache, config)
    }

    /// Rejects batches above the configured maximum size.
    fn check_batch_size(&self, size: usize) -> CacheResult<()> {
        if size > self.config.max_batch_size {
            return Err(CacheError::BatchTooLarge {
                size,
                max: self.config.max_batch_size,
            });
        }
        Ok(())
    }

    // == Set Many ==
    /// Sets every entry in the batch with a uniform TTL.
    ///
    /// Individual failures do not stop the rest of the batch; the first
    /// error encountered is returned once all operations have finished.
    /// Successfully set keys stay set.
    pub async fn set_many(&self, entries: HashMap<K, V>, ttl: Duration) -> CacheResult<()> {
        self.check_batch_size(entries.len())?;

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        let mut tasks = JoinSet::new();
        for (key, value) in entries {
            let cache = self.cache.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| CacheError::Canceled)?;
                cache.set(key, value, ttl).await
            });
        }

        self.drain(tasks, |_: ()| {}).await
    }

    // == Get Many ==
    /// Retrieves the live values for a set of keys.
    ///
    /// Keys that are absent or expired are omitted from the result rather
    /// than failing the batch; store failures and timeouts are reported.
    pub async fn get_many(&self, keys: &[K]) -> CacheResult<HashMap<K, V>> {
        self.check_batch_size(keys.len())?;

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        let mut tasks = JoinSet::new();
        for key in keys.iter().cloned() {
            let cache = self.cache.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| CacheError::Canceled)?;
                match cache.get(&key).await {
                    Ok(value) => Ok(Some((key, value))),
                    Err(CacheError::KeyNotFound) => Ok(None),
                    Err(e) => Err(e),
                }
            });
        }

        let mut found = HashMap::new();
        self.drain(tasks, |hit| {
            if let Some((key, value)) = hit {
                found.insert(key, value);
            }
        })
        .await?;
        Ok(found)
    }

    // == Delete Many ==
    /// Deletes a set of keys, best-effort.
    ///
    /// Absent keys do not abort the batch; only store failures and
    /// timeouts are reported.
    pub async fn delete_many(&self, keys: &[K]) -> CacheResult<()> {
        self.check_batch_size(keys.len())?;

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        let mut tasks = JoinSet::new();
        for key in keys.iter().cloned() {
            let cache = self.cache.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| CacheError::Canceled)?;
                match cache.delete(&key).await {
                    Ok(()) | Err(CacheError::KeyNotFound) => Ok(()),
                    Err(e) => Err(e),
                }
            });
        }

        self.drain(tasks, |_: ()| {}).await
    }

    // == Drain ==
    /// Collects batch task results under the shared deadline.
    ///
    /// Returns the first per-key error after the whole batch has run, or
    /// `BatchTimeout` if the deadline elapsed first. On timeout the
    /// remaining tasks are detached, not aborted: each engine operation is
    /// an atomic critical section and must be allowed to finish.
    async fn drain<T: Send + 'static>(
        &self,
        mut tasks: JoinSet<CacheResult<T>>,
        mut on_result: impl FnMut(T),
    ) -> CacheResult<()> {
        let deadline = self.config.operation_timeout;
        let collected = tokio::time::timeout(deadline, async {
            let mut first_error = None;
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(result)) => on_result(result),
                    Ok(Err(e)) => {
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                    Err(join_error) => {
                        warn!(error = %join_error, "batch task did not complete");
                        if first_error.is_none() {
                            first_error = Some(CacheError::Canceled);
                        }
                    }
                }
            }
            first_error
        })
        .await;

        match collected {
            Ok(None) => Ok(()),
            Ok(Some(error)) => Err(error),
            Err(_) => {
                // Detach rather than abort: an aborted task could be killed
                // between its store mutation and the matching policy
                // update, stranding a half-evicted entry.
                tasks.detach_all();
                Err(CacheError::BatchTimeout)
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{FifoPolicy, LruPolicy};
    use crate::store::{MemoryStore, Store};

    const TTL: Duration = Duration::from_secs(60);

    fn batch_cache() -> BatchCache<String, String> {
        BatchCache::from_cache(Cache::new()).unwrap()
    }

    fn entries(n: usize) -> HashMap<String, String> {
        (1..=n)
            .map(|i| (format!("key{i}"), format!("value{i}")))
            .collect()
    }

    #[tokio::test]
    async fn test_set_many_then_get_many() {
        let batch = batch_cache();
        batch.set_many(entries(5), TTL).await.unwrap();

        let keys: Vec<String> = (1..=5).map(|i| format!("key{i}")).collect();
        let found = batch.get_many(&keys).await.unwrap();

        assert_eq!(found.len(), 5);
        assert_eq!(found["key3"], "value3");
    }

    #[tokio::test]
    async fn test_get_many_omits_misses() {
        let batch = batch_cache();
        batch.set_many(entries(2), TTL).await.unwrap();

        let keys = vec![
            "key1".to_string(),
            "key2".to_string(),
            "ghost".to_string(),
        ];
        let found = batch.get_many(&keys).await.unwrap();

        assert_eq!(found.len(), 2);
        assert!(!found.contains_key("ghost"));
    }

    #[tokio::test]
    async fn test_delete_many_tolerates_absent_keys() {
        let batch = batch_cache();
        batch.set_many(entries(3), TTL).await.unwrap();

        let keys = vec![
            "key1".to_string(),
            "key2".to_string(),
            "never-existed".to_string(),
        ];
        batch.delete_many(&keys).await.unwrap();

        let found = batch.get_many(&keys).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected() {
        let cache = Cache::new();
        let batch = BatchCache::new(
            cache,
            BatchConfig {
                max_batch_size: 3,
                ..BatchConfig::default()
            },
        )
        .unwrap();

        let result = batch.set_many(entries(4), TTL).await;
        assert!(matches!(
            result,
            Err(CacheError::BatchTooLarge { size: 4, max: 3 })
        ));
    }

    #[tokio::test]
    async fn test_batch_respects_policy_capacity() {
        let cache = Cache::builder()
            .policy(LruPolicy::with_capacity(4).unwrap())
            .build();
        let batch = BatchCache::from_cache(cache.clone()).unwrap();

        batch.set_many(entries(10), TTL).await.unwrap();
        assert!(cache.len().await <= 4);
    }

    /// In-memory store that sleeps on writes and deletes, to force
    /// deadlines at chosen points.
    struct SlowStore {
        inner: MemoryStore<String, String>,
        write_delay: Duration,
        delete_delay: Duration,
    }

    #[async_trait::async_trait]
    impl Store<String, String> for SlowStore {
        async fn get(
            &self,
            key: &String,
        ) -> CacheResult<Option<crate::cache::CacheEntry<String>>> {
            self.inner.get(key).await
        }

        async fn set(
            &self,
            key: String,
            entry: crate::cache::CacheEntry<String>,
        ) -> CacheResult<()> {
            tokio::time::sleep(self.write_delay).await;
            self.inner.set(key, entry).await
        }

        async fn delete(&self, key: &String) -> CacheResult<bool> {
            tokio::time::sleep(self.delete_delay).await;
            self.inner.delete(key).await
        }

        async fn clear(&self) -> CacheResult<()> {
            self.inner.clear().await
        }

        async fn close(&self) -> CacheResult<()> {
            self.inner.close().await
        }

        async fn len(&self) -> CacheResult<usize> {
            self.inner.len().await
        }
    }

    #[tokio::test]
    async fn test_batch_timeout_reported() {
        let cache = Cache::builder()
            .store(SlowStore {
                inner: MemoryStore::new(),
                write_delay: Duration::from_millis(25),
                delete_delay: Duration::ZERO,
            })
            .build();
        let batch = BatchCache::new(
            cache.clone(),
            BatchConfig {
                operation_timeout: Duration::from_millis(60),
                max_concurrent: 1,
                ..BatchConfig::default()
            },
        )
        .unwrap();

        // 10 serialized writes at 25ms each cannot fit a 60ms deadline
        let result = batch.set_many(entries(10), TTL).await;
        assert!(matches!(result, Err(CacheError::BatchTimeout)));

        // Operations that completed before the deadline keep their effect
        assert!(cache.len().await >= 1);
    }

    #[tokio::test]
    async fn test_timed_out_eviction_still_completes() {
        let cache = Cache::builder()
            .policy(FifoPolicy::with_capacity(1).unwrap())
            .store(SlowStore {
                inner: MemoryStore::new(),
                write_delay: Duration::ZERO,
                delete_delay: Duration::from_millis(80),
            })
            .build();
        cache
            .set("old".to_string(), "v".to_string(), TTL)
            .await
            .unwrap();

        let batch = BatchCache::new(
            cache.clone(),
            BatchConfig {
                operation_timeout: Duration::from_millis(30),
                ..BatchConfig::default()
            },
        )
        .unwrap();

        // The single set must evict "old" first, and the 80ms victim
        // delete blows the 30ms deadline mid-operation.
        let result = batch
            .set_many(HashMap::from([("new".to_string(), "v".to_string())]), TTL)
            .await;
        assert!(matches!(result, Err(CacheError::BatchTimeout)));

        // The in-flight set keeps running after the deadline; once it
        // lands, the victim is fully gone and the new entry is live.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(matches!(
            cache.get(&"old".to_string()).await,
            Err(CacheError::KeyNotFound)
        ));
        assert_eq!(cache.get(&"new".to_string()).await.unwrap(), "v");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_zero_concurrency_rejected_at_construction() {
        let result = BatchCache::new(
            Cache::<String, String>::new(),
            BatchConfig {
                max_concurrent: 0,
                ..BatchConfig::default()
            },
        );
        assert!(matches!(result, Err(CacheError::InvalidCapacity(0))));

        let result = BatchCache::new(
            Cache::<String, String>::new(),
            BatchConfig {
                max_batch_size: 0,
                ..BatchConfig::default()
            },
        );
        assert!(matches!(result, Err(CacheError::InvalidCapacity(0))));
    }

    #[tokio::test]
    async fn test_set_many_partial_failure_reports_first_error() {
        let cache = Cache::new();
        let batch = BatchCache::from_cache(cache.clone()).unwrap();

        batch.set_many(entries(3), TTL).await.unwrap();
        cache.close().await.unwrap();

        let result = batch.set_many(entries(3), TTL).await;
        assert!(matches!(result, Err(CacheError::Closed)));
    }
}
