//! Cache Module
//!
//! The entry record, the engine composing a store with an eviction policy,
//! performance counters, and the batched-operation layer.

mod batch;
mod engine;
pub(crate) mod entry;
mod stats;


// Re-export public types
pub use batch::BatchCache;
pub use engine::{Cache, CacheBuilder};
pub use entry::CacheEntry;
pub use stats::CacheStats;
