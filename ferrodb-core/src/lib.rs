//! # ferrodb-core
//!
//! The in-memory engine behind ferrodb: a TTL-aware key-value store, a
//! manager for independently addressable named caches (each itself backed by
//! the same store primitive), JSON-path/glob/value-template search over
//! cache contents, a synchronous event bus for cache observers, hit/miss/
//! write statistics, and disk snapshot persistence for named caches.
//!
//! This crate has no network surface of its own — `ferrodb-server` is the
//! binary that speaks the wire protocol and dispatches commands into the
//! types defined here.
//!
//! ## Concurrency model
//!
//! Every mutating type ([`store::ExpiringStore`], [`cache_manager::CacheManager`],
//! [`persistence::PersistenceEngine`]) is `Send + Sync` and safe to share
//! behind an `Arc` across connection-handling tasks. Internally they protect
//! their state with `tokio::sync::Mutex` or `dashmap::DashMap`, never a
//! blocking `std::sync::Mutex` held across an `.await`.

pub mod cache_manager;
pub mod error;
pub mod events;
pub mod persistence;
pub mod search;
pub mod stats;
pub mod store;
pub mod value;

pub use cache_manager::CacheManager;
pub use error::{CacheError, PersistenceError, StoreError};
pub use events::{EventBus, EventContext, EventKind, Observer};
pub use stats::{CacheStats, GlobalStats, StatsTracker};
pub use store::ExpiringStore;
pub use value::Value;
