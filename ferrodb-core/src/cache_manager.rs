//! # Named Cache Manager Module
//!
//! Owns a hierarchy of independently addressable named caches. Structurally,
//! the manager holds one [`ExpiringStore`] whose values are themselves
//! `Arc<NamedCache>` — and a `NamedCache` is, in turn, just another
//! `ExpiringStore` over [`Value`]. This gives every cache its own reaper and
//! its own per-entry TTLs "for free," by reusing the same primitive the
//! manager is built on top of.
//!
//! The manager composes three collaborators per cache operation: the
//! [`StatsTracker`] (hit/miss/write counters), the [`EventBus`] (observer
//! dispatch), and optionally a [`crate::persistence::PersistenceEngine`]
//! (disk snapshots) that callers drive from outside this module.

use std::sync::Arc;
use std::time::Duration;

use crate::error::CacheError;
use crate::events::{EventBus, EventContext, EventKind, Observer};
use crate::search;
use crate::stats::{CacheStats, GlobalStats, StatsTracker};
use crate::store::ExpiringStore;
use crate::value::Value;

struct NamedCache {
    entries: ExpiringStore<Value>,
}

impl NamedCache {
    fn new(
        name: String,
        default_ttl: Option<Duration>,
        cleanup_interval: Duration,
        stats: Arc<StatsTracker>,
        events: Arc<EventBus>,
    ) -> Self {
        let hook_cache_name = name.clone();
        let hook = Arc::new(move |key: String, value: Value| {
            stats.record_expire(&hook_cache_name);
            events.dispatch(
                EventKind::Expire,
                EventContext::new(hook_cache_name.clone(), EventKind::Expire)
                    .with_key(key)
                    .with_old_value(value),
            );
        });
        Self {
            entries: ExpiringStore::with_hook(default_ttl, cleanup_interval, Some(hook)),
        }
    }
}

/// Manages the full set of named caches: creation/deletion, per-entry
/// read/write/delete, search, event registration, and the persistence
/// snapshot/restore hooks used by [`crate::persistence::PersistenceEngine`].
pub struct CacheManager {
    store: ExpiringStore<Arc<NamedCache>>,
    stats_tracker: Arc<StatsTracker>,
    events: Arc<EventBus>,
    default_ttl: Option<Duration>,
    cleanup_interval: Duration,
}

impl CacheManager {
    /// `default_ttl` is inherited by entries of any cache created without an
    /// explicit per-entry TTL; `cleanup_interval` governs both the outer
    /// store's reaper and every per-cache reaper spawned under it.
    pub fn new(default_ttl: Option<Duration>, cleanup_interval: Duration) -> Self {
        Self {
            store: ExpiringStore::new(None, cleanup_interval),
            stats_tracker: Arc::new(StatsTracker::new()),
            events: Arc::new(EventBus::new()),
            default_ttl,
            cleanup_interval,
        }
    }

    fn new_named_cache(&self, name: &str) -> NamedCache {
        NamedCache::new(
            name.to_string(),
            self.default_ttl,
            self.cleanup_interval,
            self.stats_tracker.clone(),
            self.events.clone(),
        )
    }

    /// Creates an empty cache. Returns `false` without effect if it already
    /// exists.
    pub async fn create_cache(&self, name: &str) -> bool {
        if self.store.contains(name).await {
            return false;
        }
        let cache = self.new_named_cache(name);
        self.store.set(name, Arc::new(cache), None).await;
        self.stats_tracker.init_cache(name);
        self.events
            .dispatch(EventKind::CreateCache, EventContext::new(name, EventKind::CreateCache));
        true
    }

    /// Deletes a cache and everything in it, atomically from the caller's
    /// perspective: a `delete` event fires for every surviving entry, then a
    /// `delete_cache` event, then the stats block is dropped. Returns
    /// `false` without effect if the cache did not exist.
    pub async fn delete_cache(&self, name: &str) -> bool {
        let Ok(cache) = self.store.delete(name).await else {
            return false;
        };
        for (key, value) in cache.entries.snapshot().await {
            self.events.dispatch(
                EventKind::Delete,
                EventContext::new(name, EventKind::Delete)
                    .with_key(key)
                    .with_old_value(value),
            );
        }
        cache.entries.stop().await;
        self.stats_tracker.remove_cache(name);
        self.events
            .dispatch(EventKind::DeleteCache, EventContext::new(name, EventKind::DeleteCache));
        true
    }

    /// Names of every cache currently known to the manager, forcing a sweep
    /// first so an expired outer entry is never reported.
    pub async fn list_caches(&self) -> Vec<String> {
        self.store.keys().await
    }

    /// Removes every entry from a cache without deleting the cache itself.
    /// Returns `false` without effect if the cache did not exist.
    pub async fn clear_cache(&self, name: &str) -> bool {
        let Some(cache) = self.store.get(name).await else {
            return false;
        };
        for (key, value) in cache.entries.snapshot().await {
            self.events.dispatch(
                EventKind::Delete,
                EventContext::new(name, EventKind::Delete)
                    .with_key(key)
                    .with_old_value(value),
            );
        }
        cache.entries.clear().await;
        self.stats_tracker.set_items(name, 0);
        self.events
            .dispatch(EventKind::Clear, EventContext::new(name, EventKind::Clear));
        true
    }

    /// Current item count of a cache, or `0` if it does not exist.
    pub async fn cache_size(&self, name: &str) -> usize {
        match self.store.get(name).await {
            Some(cache) => cache.entries.len().await,
            None => 0,
        }
    }

    /// `true` if a cache named `name` currently exists. Lets callers that
    /// need to distinguish "cache absent" from "key absent within an
    /// existing cache" check the former before treating a miss from
    /// [`CacheManager::get`] as a soft `NULL`.
    pub async fn cache_exists(&self, name: &str) -> bool {
        self.store.contains(name).await
    }

    /// Writes `key` into `cache_name`, creating the cache (with the
    /// manager's default TTL policy) if it does not already exist.
    pub async fn set(&self, cache_name: &str, key: &str, value: Value, ttl: Option<Duration>) {
        let cache = match self.store.get(cache_name).await {
            Some(cache) => cache,
            None => {
                self.create_cache(cache_name).await;
                self.store
                    .get(cache_name)
                    .await
                    .expect("cache was just created")
            }
        };
        cache.entries.set(key, value.clone(), ttl).await;
        let items = cache.entries.len().await;
        self.stats_tracker.record_write(cache_name, items);
        self.events.dispatch(
            EventKind::Set,
            EventContext::new(cache_name, EventKind::Set)
                .with_key(key)
                .with_new_value(value),
        );
    }

    /// Reads `key` from `cache_name`. A read against a cache that does not
    /// exist, or a key that is missing or expired within one that does, is a
    /// soft miss: `None`, with the miss counted in stats.
    pub async fn get(&self, cache_name: &str, key: &str) -> Option<Value> {
        let Some(cache) = self.store.get(cache_name).await else {
            self.stats_tracker.record_miss(cache_name);
            return None;
        };
        match cache.entries.get(key).await {
            Some(value) => {
                self.stats_tracker.record_hit(cache_name);
                self.events.dispatch(
                    EventKind::Get,
                    EventContext::new(cache_name, EventKind::Get)
                        .with_key(key)
                        .with_new_value(value.clone()),
                );
                Some(value)
            }
            None => {
                self.stats_tracker.record_miss(cache_name);
                None
            }
        }
    }

    /// Deletes `key` from `cache_name`. Fails with [`CacheError::CacheNotFound`]
    /// or [`CacheError::KeyNotFound`] rather than silently no-op-ing, so
    /// callers can distinguish "nothing happened" from "deleted."
    pub async fn delete(&self, cache_name: &str, key: &str) -> Result<(), CacheError> {
        let cache = self
            .store
            .get(cache_name)
            .await
            .ok_or_else(|| CacheError::CacheNotFound(cache_name.to_string()))?;
        let old_value = cache
            .entries
            .delete(key)
            .await
            .map_err(|_| CacheError::KeyNotFound {
                cache: cache_name.to_string(),
                key: key.to_string(),
            })?;
        let items = cache.entries.len().await;
        self.stats_tracker.set_items(cache_name, items);
        self.events.dispatch(
            EventKind::Delete,
            EventContext::new(cache_name, EventKind::Delete)
                .with_key(key)
                .with_old_value(old_value),
        );
        Ok(())
    }

    /// Returns every `(key, value)` pair in `cache_name` for which
    /// `predicate` is truthy, in the cache's current key order.
    pub async fn search<F>(&self, cache_name: &str, predicate: F) -> Result<Vec<(String, Value)>, CacheError>
    where
        F: Fn(&str, &Value) -> bool,
    {
        let cache = self
            .store
            .get(cache_name)
            .await
            .ok_or_else(|| CacheError::CacheNotFound(cache_name.to_string()))?;
        let all = cache.entries.snapshot().await;
        Ok(all.into_iter().filter(|(k, v)| predicate(k, v)).collect())
    }

    /// Pattern search over keys. `None` matches every key; otherwise the
    /// pattern is a glob by default, or a regular expression if `regex` is
    /// set.
    pub async fn search_by_pattern(
        &self,
        cache_name: &str,
        key_pattern: Option<&str>,
        regex: bool,
    ) -> Result<Vec<(String, Value)>, CacheError> {
        match key_pattern {
            None => self.search(cache_name, |_, _| true).await,
            Some(pattern) => {
                let compiled = search::compile_pattern(pattern, regex)
                    .map_err(|e| CacheError::InvalidPattern(e.to_string()))?;
                self.search(cache_name, move |k, _| compiled.is_match(k)).await
            }
        }
    }

    /// Dotted JSON-path search, with `*` matching any key at that level.
    pub async fn search_json_path(
        &self,
        cache_name: &str,
        path_pattern: &str,
    ) -> Result<Vec<(String, Value)>, CacheError> {
        let parts: Vec<&str> = path_pattern.split('.').collect();
        self.search(cache_name, move |_, v| search::matches_json_path(v, &parts))
            .await
    }

    /// Keys whose value recursively matches `value_template`.
    pub async fn find_by_value(
        &self,
        cache_name: &str,
        value_template: &Value,
    ) -> Result<Vec<String>, CacheError> {
        let matches = self
            .search(cache_name, move |_, v| {
                search::matches_value_template(value_template, v)
            })
            .await?;
        Ok(matches.into_iter().map(|(k, _)| k).collect())
    }

    /// Registers `observer` for `kind`, scoped to `cache_name` if given.
    pub fn on(&self, kind: EventKind, cache_name: Option<&str>, observer: Observer) {
        self.events.on(kind, cache_name, observer);
    }

    /// Removes a previously registered observer. A soft no-op if it was not
    /// found.
    pub fn off(&self, kind: EventKind, cache_name: Option<&str>, observer: &Observer) -> bool {
        self.events.off(kind, cache_name, observer)
    }

    pub fn stats(&self, cache_name: &str) -> Option<CacheStats> {
        self.stats_tracker.get(cache_name)
    }

    pub fn all_stats(&self) -> Vec<(String, CacheStats)> {
        self.stats_tracker.all()
    }

    pub fn reset_stats(&self, cache_name: &str) -> bool {
        self.stats_tracker.reset(cache_name)
    }

    pub fn global_stats(&self) -> &GlobalStats {
        &self.stats_tracker.global
    }

    /// Point-in-time copy of a cache's contents and stats block, taken for
    /// the persistence engine. `None` if the cache does not exist.
    pub(crate) async fn snapshot_cache(&self, name: &str) -> Option<(Vec<(String, Value)>, CacheStats)> {
        let cache = self.store.get(name).await?;
        let data = cache.entries.snapshot().await;
        let stats = self.stats_tracker.get(name).unwrap_or_default();
        Some((data, stats))
    }

    /// Creates (or replaces the contents of) a cache from a persisted
    /// snapshot, emitting a `create_cache` event the way a fresh
    /// `CREATECACHE` would. Restored entries carry no TTL: persistence
    /// captures values, not in-flight expiry deadlines.
    pub(crate) async fn restore_cache(&self, name: &str, data: Vec<(String, Value)>, stats: CacheStats) {
        if !self.store.contains(name).await {
            let cache = self.new_named_cache(name);
            self.store.set(name, Arc::new(cache), None).await;
        }
        let cache = self
            .store
            .get(name)
            .await
            .expect("cache was just ensured present");
        cache.entries.clear().await;
        for (key, value) in data {
            cache.entries.set(key, value, None).await;
        }
        self.stats_tracker.restore(name, stats);
        self.events
            .dispatch(EventKind::CreateCache, EventContext::new(name, EventKind::CreateCache));
    }

    /// Stops every cache's reaper, then the outer store's. Does not persist
    /// — callers driving a full shutdown should snapshot before calling
    /// this, as [`crate::persistence::PersistenceEngine::stop`] does.
    pub async fn stop(&self) {
        for name in self.store.keys().await {
            if let Some(cache) = self.store.get(&name).await {
                cache.entries.stop().await;
            }
        }
        self.store.stop().await;
    }
}
