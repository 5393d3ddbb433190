//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for all cache engine operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in the cache, or found but expired.
    ///
    /// Absent and expired are deliberately not distinguished: expiration is
    /// a liveness property, not a separate failure mode.
    #[error("key not found")]
    KeyNotFound,

    /// TTL was zero; entries must carry a positive time-to-live
    #[error("invalid TTL: must be greater than zero")]
    InvalidTtl,

    /// Policy capacity was zero where a bounded capacity is required
    #[error("invalid capacity: {0} (must be greater than zero)")]
    InvalidCapacity(usize),

    /// Storage backend I/O or codec failure, wrapping the underlying cause
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Batch exceeded the configured maximum size
    #[error("batch of {size} operations exceeds maximum of {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// Batch did not complete within the configured operation timeout
    #[error("batch operation timed out")]
    BatchTimeout,

    /// Operation was cancelled before it completed
    #[error("operation cancelled")]
    Canceled,

    /// Operation attempted after the cache was closed
    #[error("cache is closed")]
    Closed,
}

// == Store Error ==
/// Failure inside a storage backend.
///
/// Wraps the underlying I/O or serialization cause so callers can inspect it;
/// store failures are never silently swallowed by the engine.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem or other I/O failure
    #[error("i/o error during {operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Entry could not be serialized for persistence
    #[error("failed to serialize entry: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl StoreError {
    /// Wraps an I/O error with the operation that produced it.
    pub fn io(operation: &'static str, source: std::io::Error) -> Self {
        Self::Io { operation, source }
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache engine operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;
