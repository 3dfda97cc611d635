//! # Error Types Module
//!
//! This module defines the error types produced by the expiring store, the
//! named cache manager, and the persistence engine. Errors are modeled per
//! layer, the way the client/provider split works in a typical SDK error
//! module, so callers can match on exactly the failure surface of the
//! component they used.
//!
//! ## Overview
//!
//! - [`StoreError`] — raised by [`crate::store::ExpiringStore`] operations.
//! - [`CacheError`] — raised by [`crate::cache_manager::CacheManager`]
//!   operations; wraps [`StoreError`] for operations that delegate to the
//!   underlying store.
//! - [`PersistenceError`] — raised by [`crate::persistence::PersistenceEngine`]
//!   during snapshot reads and writes.

use thiserror::Error;

/// Errors produced by the expiring key-value store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The requested key is not present (or has already expired).
    #[error("key not found: {0}")]
    NotFound(String),
}

/// Errors produced by the named cache manager.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The named cache does not exist.
    #[error("cache not found: {0}")]
    CacheNotFound(String),

    /// A cache with this name already exists.
    #[error("cache already exists: {0}")]
    AlreadyExists(String),

    /// The key does not exist within an existing cache.
    #[error("key not found in cache {cache}: {key}")]
    KeyNotFound { cache: String, key: String },

    /// Wraps a lower-level store error encountered while delegating.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A search pattern (regex or JSON path) was malformed.
    #[error("invalid search pattern: {0}")]
    InvalidPattern(String),
}

/// Errors produced while snapshotting or restoring a cache to/from disk.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// No persistence directory was configured on the manager.
    #[error("persistence is not configured")]
    NotConfigured,

    /// The cache named does not currently exist, so it cannot be snapshotted.
    #[error("cache not found: {0}")]
    CacheNotFound(String),

    /// Underlying filesystem I/O failed.
    #[error("persistence I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// The on-disk payload could not be parsed as the expected JSON shape.
    #[error("malformed snapshot payload: {0}")]
    BadPayload(#[from] serde_json::Error),
}
