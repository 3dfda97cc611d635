//! # Statistics Module
//!
//! Per-cache hit/miss/write counters plus a small set of globally aggregated
//! counters (total hits, total misses, total expired, last cleanup time).
//! [`StatsTracker`] is shared (via `Arc`) between the cache manager and every
//! per-cache expiring store's expiry hook, so expirations recorded by a
//! background reaper land in the same place as hits recorded on the request
//! path.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time statistics for a single named cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub items: usize,
    pub last_access: Option<DateTime<Utc>>,
    pub last_write: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Default for CacheStats {
    fn default() -> Self {
        Self {
            hits: 0,
            misses: 0,
            items: 0,
            last_access: None,
            last_write: None,
            created_at: Utc::now(),
        }
    }
}

/// Globally aggregated counters, independent of any single cache.
#[derive(Debug, Default)]
pub struct GlobalStats {
    pub total_hits: AtomicU64,
    pub total_misses: AtomicU64,
    pub total_expired: AtomicU64,
    last_cleanup_millis: AtomicU64,
}

impl GlobalStats {
    pub fn record_cleanup_now(&self) {
        self.last_cleanup_millis
            .store(Utc::now().timestamp_millis() as u64, Ordering::Relaxed);
    }

    pub fn last_cleanup(&self) -> Option<DateTime<Utc>> {
        let millis = self.last_cleanup_millis.load(Ordering::Relaxed);
        if millis == 0 {
            None
        } else {
            DateTime::from_timestamp_millis(millis as i64)
        }
    }
}

/// Owns the per-cache [`CacheStats`] map and the [`GlobalStats`] counters,
/// and knows how to update both in response to cache operations.
#[derive(Debug, Default)]
pub struct StatsTracker {
    per_cache: DashMap<String, CacheStats>,
    pub global: GlobalStats,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init_cache(&self, name: &str) {
        self.per_cache.insert(name.to_string(), CacheStats::default());
    }

    pub fn remove_cache(&self, name: &str) {
        self.per_cache.remove(name);
    }

    pub fn record_hit(&self, cache: &str) {
        if let Some(mut stats) = self.per_cache.get_mut(cache) {
            stats.hits += 1;
            stats.last_access = Some(Utc::now());
        }
        self.global.total_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self, cache: &str) {
        if let Some(mut stats) = self.per_cache.get_mut(cache) {
            stats.misses += 1;
            stats.last_access = Some(Utc::now());
        }
        self.global.total_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self, cache: &str, items: usize) {
        if let Some(mut stats) = self.per_cache.get_mut(cache) {
            stats.last_write = Some(Utc::now());
            stats.items = items;
        }
    }

    pub fn set_items(&self, cache: &str, items: usize) {
        if let Some(mut stats) = self.per_cache.get_mut(cache) {
            stats.items = items;
        }
    }

    pub fn record_expire(&self, cache: &str) {
        if let Some(mut stats) = self.per_cache.get_mut(cache) {
            stats.items = stats.items.saturating_sub(1);
        }
        self.global.total_expired.fetch_add(1, Ordering::Relaxed);
        self.global.record_cleanup_now();
    }

    pub fn get(&self, cache: &str) -> Option<CacheStats> {
        self.per_cache.get(cache).map(|s| s.clone())
    }

    pub fn all(&self) -> Vec<(String, CacheStats)> {
        self.per_cache
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn reset(&self, cache: &str) -> bool {
        if self.per_cache.contains_key(cache) {
            self.per_cache.insert(cache.to_string(), CacheStats::default());
            true
        } else {
            false
        }
    }

    pub fn restore(&self, cache: &str, stats: CacheStats) {
        self.per_cache.insert(cache.to_string(), stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_and_misses_accumulate_per_cache_and_globally() {
        let tracker = StatsTracker::new();
        tracker.init_cache("users");
        tracker.record_hit("users");
        tracker.record_hit("users");
        tracker.record_miss("users");

        let stats = tracker.get("users").unwrap();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(tracker.global.total_hits.load(Ordering::Relaxed), 2);
        assert_eq!(tracker.global.total_misses.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn reset_clears_counters_but_keeps_the_cache_entry() {
        let tracker = StatsTracker::new();
        tracker.init_cache("users");
        tracker.record_hit("users");
        assert!(tracker.reset("users"));
        assert_eq!(tracker.get("users").unwrap().hits, 0);
        assert!(!tracker.reset("missing"));
    }
}
