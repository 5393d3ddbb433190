//! Integration Tests for the Cache Engine
//!
//! Exercises full scenarios across policies, stores and the batch layer
//! through the public API.

use std::collections::HashMap;
use std::time::Duration;

use tempfile::TempDir;

use gencache::{
    BatchCache, BatchConfig, Cache, CacheError, FifoPolicy, FileConfig, FileStore, LfuPolicy,
    LruPolicy,
};

const TTL: Duration = Duration::from_secs(60);

// == Helper Functions ==

fn file_config(dir: &TempDir) -> FileConfig {
    FileConfig {
        directory: dir.path().to_path_buf(),
        ..FileConfig::default()
    }
}

async fn set_keys(cache: &Cache<String, String>, keys: &[&str]) {
    for key in keys {
        cache
            .set(key.to_string(), format!("value-{key}"), TTL)
            .await
            .unwrap();
    }
}

async fn present(cache: &Cache<String, String>, key: &str) -> bool {
    cache.get(&key.to_string()).await.is_ok()
}

// == TTL Scenarios ==

#[tokio::test]
async fn test_ttl_expiry_end_to_end() {
    let cache = Cache::new();
    cache
        .set("temp".to_string(), "value".to_string(), Duration::from_millis(40))
        .await
        .unwrap();

    assert_eq!(cache.get(&"temp".to_string()).await.unwrap(), "value");
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert!(matches!(
        cache.get(&"temp".to_string()).await,
        Err(CacheError::KeyNotFound)
    ));
}

// == Policy Scenarios ==

#[tokio::test]
async fn test_lru_example_sequence() {
    let cache = Cache::builder()
        .policy(LruPolicy::with_capacity(3).unwrap())
        .build();

    // key1..key4: inserting key4 evicts key1 (oldest, untouched)
    set_keys(&cache, &["key1", "key2", "key3", "key4"]).await;
    assert!(!present(&cache, "key1").await);

    // Touch key2, then insert key5: key3 is now least recently used
    assert!(present(&cache, "key2").await);
    cache
        .set("key5".to_string(), "value-key5".to_string(), TTL)
        .await
        .unwrap();

    assert!(!present(&cache, "key3").await);
    for survivor in ["key2", "key4", "key5"] {
        assert!(present(&cache, survivor).await, "{survivor} should survive");
    }
}

#[tokio::test]
async fn test_fifo_access_does_not_save_keys() {
    let cache = Cache::builder()
        .policy(FifoPolicy::with_capacity(3).unwrap())
        .build();

    set_keys(&cache, &["key1", "key2", "key3", "key4"]).await;
    assert!(!present(&cache, "key1").await);

    // Accessing key2 must not change its place in line
    assert!(present(&cache, "key2").await);
    cache
        .set("key5".to_string(), "value-key5".to_string(), TTL)
        .await
        .unwrap();

    assert!(!present(&cache, "key2").await);
    for survivor in ["key3", "key4", "key5"] {
        assert!(present(&cache, survivor).await, "{survivor} should survive");
    }
}

#[tokio::test]
async fn test_lfu_evicts_coldest_key() {
    let cache = Cache::builder()
        .policy(LfuPolicy::with_capacity(3).unwrap())
        .build();

    set_keys(&cache, &["key1", "key2", "key3"]).await;

    // key1 read 3 times, key2 once, key3 never
    for _ in 0..3 {
        assert!(present(&cache, "key1").await);
    }
    assert!(present(&cache, "key2").await);

    cache
        .set("key4".to_string(), "value-key4".to_string(), TTL)
        .await
        .unwrap();

    assert!(!present(&cache, "key3").await);
    for survivor in ["key1", "key2", "key4"] {
        assert!(present(&cache, survivor).await, "{survivor} should survive");
    }
}

// == Idempotence ==

#[tokio::test]
async fn test_delete_and_clear_idempotence() {
    let cache = Cache::<String, String>::new();

    for _ in 0..2 {
        assert!(matches!(
            cache.delete(&"absent".to_string()).await,
            Err(CacheError::KeyNotFound)
        ));
    }

    set_keys(&cache, &["key1"]).await;
    cache.clear().await.unwrap();
    cache.clear().await.unwrap();
    assert!(cache.is_empty().await);
}

// == Persistence Scenarios ==

#[tokio::test]
async fn test_file_store_persistence_round_trip() {
    let dir = TempDir::new().unwrap();

    {
        let store = FileStore::new(file_config(&dir)).await.unwrap();
        let cache = Cache::builder().store(store).build();
        set_keys(&cache, &["key1", "key2", "key3"]).await;
        cache.close().await.unwrap();
    }

    // A fresh store over the same directory sees the same keys
    let store = FileStore::<String, String>::new(file_config(&dir)).await.unwrap();
    let cache = Cache::builder().store(store).build();
    for key in ["key1", "key2", "key3"] {
        assert_eq!(
            cache.get(&key.to_string()).await.unwrap(),
            format!("value-{key}")
        );
    }
    cache.close().await.unwrap();
}

#[tokio::test]
async fn test_file_store_expired_keys_do_not_survive_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let store = FileStore::new(file_config(&dir)).await.unwrap();
        let cache = Cache::builder().store(store).build();
        cache
            .set("short".to_string(), "v".to_string(), Duration::from_millis(20))
            .await
            .unwrap();
        cache.set("long".to_string(), "v".to_string(), TTL).await.unwrap();
        cache.close().await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(50)).await;

    let store = FileStore::new(file_config(&dir)).await.unwrap();
    let cache = Cache::builder().store(store).build();
    assert!(present(&cache, "long").await);
    assert!(!present(&cache, "short").await);
    cache.close().await.unwrap();
}

#[tokio::test]
async fn test_cleared_file_store_is_empty_after_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let store = FileStore::new(file_config(&dir)).await.unwrap();
        let cache = Cache::builder().store(store).build();
        set_keys(&cache, &["key1", "key2"]).await;
        cache.clear().await.unwrap();
        cache.close().await.unwrap();
    }

    let store = FileStore::<String, String>::new(file_config(&dir)).await.unwrap();
    let cache = Cache::builder().store(store).build();
    assert!(!present(&cache, "key1").await);
    assert!(!present(&cache, "key2").await);
    cache.close().await.unwrap();
}

#[tokio::test]
async fn test_compressed_file_store_round_trip() {
    let dir = TempDir::new().unwrap();
    let config = FileConfig {
        compression_enabled: true,
        compression_level: 3,
        ..file_config(&dir)
    };

    {
        let store = FileStore::new(config.clone()).await.unwrap();
        let cache = Cache::builder().store(store).build();
        cache
            .set("big".to_string(), "payload ".repeat(200), TTL)
            .await
            .unwrap();
        cache.close().await.unwrap();
    }

    let store = FileStore::<String, String>::new(config).await.unwrap();
    let cache = Cache::builder().store(store).build();
    assert_eq!(
        cache.get(&"big".to_string()).await.unwrap(),
        "payload ".repeat(200)
    );
    cache.close().await.unwrap();
}

// == Batch Scenarios ==

#[tokio::test]
async fn test_batch_set_get_delete_cycle() {
    let cache = Cache::new();
    let batch = BatchCache::new(
        cache.clone(),
        BatchConfig {
            max_batch_size: 1000,
            operation_timeout: Duration::from_secs(5),
            max_concurrent: 10,
        },
    )
    .unwrap();

    let keys: Vec<String> = (1..=5).map(|i| format!("key{i}")).collect();
    let values: HashMap<String, String> = keys
        .iter()
        .map(|k| (k.clone(), format!("value-{k}")))
        .collect();

    batch.set_many(values, TTL).await.unwrap();
    let found = batch.get_many(&keys).await.unwrap();
    assert_eq!(found.len(), 5);

    batch.delete_many(&keys[..3]).await.unwrap();
    let found = batch.get_many(&keys[..3]).await.unwrap();
    assert!(found.is_empty());

    // The remaining keys are untouched
    assert!(present(&cache, "key4").await);
    assert!(present(&cache, "key5").await);
}

#[tokio::test]
async fn test_batch_over_file_store() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(file_config(&dir)).await.unwrap();
    let cache = Cache::builder().store(store).build();
    let batch = BatchCache::from_cache(cache.clone()).unwrap();

    let values: HashMap<String, String> = (1..=20)
        .map(|i| (format!("key{i}"), format!("value{i}")))
        .collect();
    let keys: Vec<String> = values.keys().cloned().collect();

    batch.set_many(values, TTL).await.unwrap();
    let found = batch.get_many(&keys).await.unwrap();
    assert_eq!(found.len(), 20);
    cache.close().await.unwrap();
}

// == Concurrency Scenarios ==

#[tokio::test]
async fn test_concurrent_mixed_operations_keep_capacity_invariant() {
    let cache = Cache::builder()
        .policy(LruPolicy::with_capacity(10).unwrap())
        .build();

    let mut handles = Vec::new();
    for worker in 0..8 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..25 {
                let key = format!("w{worker}-k{i}");
                cache.set(key.clone(), "v".to_string(), TTL).await.unwrap();
                let _ = cache.get(&key).await;
                if i % 5 == 0 {
                    let _ = cache.delete(&key).await;
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(cache.len().await <= 10);
    let stats = cache.stats().await;
    assert!(stats.evictions > 0);
}

#[tokio::test]
async fn test_per_key_linearizability() {
    let cache = Cache::new();

    // A set followed by a get on the same key by the same caller always
    // sees the new value
    for round in 0..100 {
        let value = format!("value{round}");
        cache.set("key".to_string(), value.clone(), TTL).await.unwrap();
        assert_eq!(cache.get(&"key".to_string()).await.unwrap(), value);
    }
}
