//! Metrics Module
//!
//! Boundary between the engine and external metrics aggregation. The engine
//! calls hook methods on every hit, miss, set, delete and eviction; whatever
//! renders those events into a wire format (a Prometheus endpoint, a
//! push-gateway client) lives outside this crate and simply implements
//! [`MetricsHook`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

use crate::config::MetricsConfig;

// == Metrics Hook Trait ==
/// Receives per-operation events from a cache instance.
///
/// Implementations must be cheap and non-blocking; hooks are invoked inline
/// on the operation path.
pub trait MetricsHook: Send + Sync {
    /// A read found a live entry.
    fn on_hit(&self);
    /// A read found nothing, or only an expired entry.
    fn on_miss(&self);
    /// An entry was inserted or overwritten.
    fn on_set(&self);
    /// An entry was explicitly deleted.
    fn on_delete(&self);
    /// An entry was removed by the eviction policy.
    fn on_eviction(&self);
}

// == Noop Metrics ==
/// Default hook that discards every event.
#[derive(Debug, Default)]
pub struct NoopMetrics;

impl MetricsHook for NoopMetrics {
    fn on_hit(&self) {}
    fn on_miss(&self) {}
    fn on_set(&self) {}
    fn on_delete(&self) {}
    fn on_eviction(&self) {}
}

// == Standard Exporter ==
/// Built-in hook that aggregates counters and logs snapshots via `tracing`.
///
/// Suitable for applications that want cache visibility without wiring a
/// full metrics pipeline.
#[derive(Debug)]
pub struct StandardExporter {
    config: MetricsConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    evictions: AtomicU64,
}

impl StandardExporter {
    // == Constructor ==
    /// Creates an exporter labeled by the given config.
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Returns the current counter values as (hits, misses, sets, deletes,
    /// evictions).
    pub fn counters(&self) -> (u64, u64, u64, u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.sets.load(Ordering::Relaxed),
            self.deletes.load(Ordering::Relaxed),
            self.evictions.load(Ordering::Relaxed),
        )
    }

    // == Snapshot ==
    /// Logs the current counters at info level, labeled with the cache name
    /// and configured labels.
    pub fn log_snapshot(&self) {
        let (hits, misses, sets, deletes, evictions) = self.counters();
        // BTreeMap gives the labels a stable order in the log line
        let labels: BTreeMap<_, _> = self.config.labels.iter().collect();
        info!(
            cache = %self.config.cache_name,
            ?labels,
            hits,
            misses,
            sets,
            deletes,
            evictions,
            "cache metrics snapshot"
        );
    }
}

impl MetricsHook for StandardExporter {
    fn on_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn on_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn on_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    fn on_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    fn on_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }
}
