//! Configuration Module
//!
//! Configuration structs for the batch layer, the value-recycling pool
//! collaborator, and the metrics collaborator.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{CacheError, CacheResult};

// == Batch Config ==
/// Configuration for batched multi-key operations.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum number of keys accepted in a single batch call
    pub max_batch_size: usize,
    /// Deadline shared by all operations of one batch call
    pub operation_timeout: Duration,
    /// Maximum number of simultaneously in-flight engine calls per batch
    pub max_concurrent: usize,
}

impl BatchConfig {
    /// Checks that the limits can make progress.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCapacity` if `max_batch_size` or `max_concurrent`
    /// is zero. A zero `max_concurrent` hands the batch a semaphore with
    /// no permits, so every call would sit at its deadline and fail with
    /// `BatchTimeout` instead of surfacing the misconfiguration.
    pub fn validate(&self) -> CacheResult<()> {
        if self.max_batch_size == 0 || self.max_concurrent == 0 {
            return Err(CacheError::InvalidCapacity(0));
        }
        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 1000,
            operation_timeout: Duration::from_secs(5),
            max_concurrent: 10,
        }
    }
}

// == Pool Config ==
/// Configuration for the optional value-recycling pool collaborator.
///
/// The pool itself lives outside the engine; this struct is the recognized
/// boundary the builder accepts and hands through to that collaborator.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of pooled values
    pub max_size: usize,
    /// Number of values kept warm regardless of idle time
    pub min_size: usize,
    /// How often idle values are reclaimed
    pub cleanup_period: Duration,
    /// Idle duration after which a pooled value becomes reclaimable
    pub max_idle_time: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            min_size: 10,
            cleanup_period: Duration::from_secs(300),
            max_idle_time: Duration::from_secs(600),
        }
    }
}

// == Metrics Config ==
/// Identity attached to metrics emitted by a cache instance.
///
/// The engine emits typed events through a [`MetricsHook`]; whatever exporter
/// the application wires in uses this config to label its output.
///
/// [`MetricsHook`]: crate::metrics::MetricsHook
#[derive(Debug, Clone, Default)]
pub struct MetricsConfig {
    /// Logical name of the cache instance
    pub cache_name: String,
    /// Static labels attached to every exported metric
    pub labels: HashMap<String, String>,
}

impl MetricsConfig {
    /// Creates a config with the given cache name and no labels.
    pub fn named(cache_name: impl Into<String>) -> Self {
        Self {
            cache_name: cache_name.into(),
            labels: HashMap::new(),
        }
    }
}
