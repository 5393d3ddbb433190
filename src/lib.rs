//! # gencache
//!
//! A generic, concurrency-safe cache engine with TTL expiration, swappable
//! eviction policies, swappable storage backends, and a bounded-concurrency
//! batch layer.
//!
//! ```no_run
//! use std::time::Duration;
//! use gencache::{Cache, LruPolicy};
//!
//! # async fn demo() -> gencache::CacheResult<()> {
//! let cache = Cache::builder()
//!     .policy(LruPolicy::with_capacity(1000)?)
//!     .build();
//!
//! cache.set("key1".to_string(), "value1".to_string(), Duration::from_secs(60)).await?;
//! let value = cache.get(&"key1".to_string()).await?;
//! assert_eq!(value, "value1");
//! cache.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod store;

pub use cache::{BatchCache, Cache, CacheBuilder, CacheEntry, CacheStats};
pub use config::{BatchConfig, MetricsConfig, PoolConfig};
pub use error::{CacheError, CacheResult, StoreError};
pub use metrics::{MetricsHook, NoopMetrics, StandardExporter};
pub use policy::{EvictionPolicy, FifoPolicy, LfuPolicy, LruPolicy};
pub use store::{FileConfig, FileStore, MemoryStore, Store};
