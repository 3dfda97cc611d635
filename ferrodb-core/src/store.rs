//! # Expiring Store Module
//!
//! A thread-safe, insertion-ordered map with per-entry time-to-live. Every
//! [`ExpiringStore`] owns a background reaper task that sweeps expired
//! entries on a fixed interval; reads also expire entries lazily, so a key
//! that outlives its deadline is never visible regardless of whether the
//! reaper has run yet.
//!
//! The same type backs both the server's flat global store (`String` values)
//! and, one level down, each named cache's entry map ([`crate::value::Value`]
//! values) — a named cache is, structurally, just another `ExpiringStore`
//! held as the value of an outer one. See [`crate::cache_manager`].
//!
//! ## Ordering
//!
//! Keys preserve insertion order except for [`ExpiringStore::prepend`], which
//! moves a key to the front without disturbing the relative order of the
//! rest. This is the only operation that reorders the map, and it is what
//! `LPUSH` relies on.

use crate::error::StoreError;
use indexmap::IndexMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Callback invoked once per entry the reaper (or a lazy read) discovers to
/// be expired. Used by [`crate::cache_manager::CacheManager`] to translate
/// expiry into `expire` events and stats updates; ordinary callers pass
/// `None`.
pub type ExpireHook<V> = Arc<dyn Fn(String, V) + Send + Sync>;

struct StoredEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> StoredEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|deadline| deadline <= now).unwrap_or(false)
    }
}

type Map<V> = IndexMap<String, StoredEntry<V>>;

/// A TTL-aware, insertion-ordered key-value map with a background reaper.
pub struct ExpiringStore<V: Clone + Send + Sync + 'static> {
    inner: Arc<Mutex<Map<V>>>,
    default_ttl: Option<Duration>,
    hook: Option<ExpireHook<V>>,
    stopped: Arc<AtomicBool>,
    reaper_handle: StdMutex<Option<JoinHandle<()>>>,
}

impl<V: Clone + Send + Sync + 'static> ExpiringStore<V> {
    /// Creates a store with no expiry hook. Entries written without an
    /// explicit TTL never expire unless `default_ttl` is set.
    pub fn new(default_ttl: Option<Duration>, cleanup_interval: Duration) -> Self {
        Self::with_hook(default_ttl, cleanup_interval, None)
    }

    /// Creates a store whose reaper and lazy-expiry paths invoke `hook` for
    /// every entry they discover to be expired.
    pub fn with_hook(
        default_ttl: Option<Duration>,
        cleanup_interval: Duration,
        hook: Option<ExpireHook<V>>,
    ) -> Self {
        let inner: Arc<Mutex<Map<V>>> = Arc::new(Mutex::new(IndexMap::new()));
        let stopped = Arc::new(AtomicBool::new(false));

        let reaper_handle = {
            let inner = inner.clone();
            let stopped = stopped.clone();
            let hook = hook.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(cleanup_interval);
                ticker.tick().await; // first tick fires immediately; skip it
                loop {
                    ticker.tick().await;
                    if stopped.load(Ordering::Acquire) {
                        break;
                    }
                    let expired = {
                        let mut guard = inner.lock().await;
                        sweep(&mut guard)
                    };
                    if !expired.is_empty() {
                        tracing::debug!(count = expired.len(), "reaper swept expired entries");
                    }
                    if let Some(hook) = &hook {
                        for (key, value) in expired {
                            hook(key, value);
                        }
                    }
                }
            })
        };

        Self {
            inner,
            default_ttl,
            hook,
            stopped,
            reaper_handle: StdMutex::new(Some(reaper_handle)),
        }
    }

    /// Writes `key`, replacing any prior value and expiration. `ttl` wins
    /// over `default_ttl`; if neither is present the entry never expires.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let expires_at = ttl.or(self.default_ttl).map(|d| Instant::now() + d);
        let mut guard = self.inner.lock().await;
        guard.insert(key.into(), StoredEntry { value, expires_at });
    }

    /// Reads `key`, returning `None` for a missing or expired entry. An
    /// entry found to be expired is removed before returning and, if a hook
    /// is configured, is reported through it.
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut guard = self.inner.lock().await;
        match guard.get(key) {
            Some(entry) if entry.is_expired(now) => {
                let removed = guard.shift_remove(key);
                drop(guard);
                if let (Some(hook), Some(entry)) = (&self.hook, removed) {
                    hook(key.to_string(), entry.value);
                }
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// `true` if `key` is present and not expired.
    pub async fn contains(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    /// Removes `key`. Fails with [`StoreError::NotFound`] if the key is
    /// absent or already expired (expired-but-unswept entries behave as
    /// absent for every read path, deletion included).
    pub async fn delete(&self, key: &str) -> Result<V, StoreError> {
        let now = Instant::now();
        let mut guard = self.inner.lock().await;
        match guard.get(key) {
            Some(entry) if entry.is_expired(now) => {
                let removed = guard.shift_remove(key);
                drop(guard);
                if let (Some(hook), Some(entry)) = (&self.hook, removed) {
                    hook(key.to_string(), entry.value);
                }
                Err(StoreError::NotFound(key.to_string()))
            }
            Some(_) => Ok(guard.shift_remove(key).expect("checked present above").value),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    /// Inserts `key` at the front of the ordered map, displacing any prior
    /// occurrence of it. Every other key keeps its relative order.
    pub async fn prepend(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let expires_at = ttl.or(self.default_ttl).map(|d| Instant::now() + d);
        let mut guard = self.inner.lock().await;
        guard.shift_remove(&key);
        guard.shift_insert(0, key, StoredEntry { value, expires_at });
    }

    /// Forces a sweep, then returns the surviving keys in their current
    /// order.
    pub async fn keys(&self) -> Vec<String> {
        self.cleanup().await;
        let guard = self.inner.lock().await;
        guard.keys().cloned().collect()
    }

    /// Sweeps expired entries now rather than waiting for the reaper's next
    /// tick. Returns the number of entries removed.
    pub async fn cleanup(&self) -> usize {
        let mut guard = self.inner.lock().await;
        sweep(&mut guard).len()
    }

    /// Removes every entry, expired or not.
    pub async fn clear(&self) {
        let mut guard = self.inner.lock().await;
        guard.clear();
    }

    /// Current number of non-expired entries (forces a sweep first).
    pub async fn len(&self) -> usize {
        self.keys().await.len()
    }

    /// Snapshots all non-expired `(key, value)` pairs in order, without
    /// disturbing iteration order or removing anything beyond the swept
    /// expired entries.
    pub async fn snapshot(&self) -> Vec<(String, V)> {
        self.cleanup().await;
        let guard = self.inner.lock().await;
        guard
            .iter()
            .map(|(k, entry)| (k.clone(), entry.value.clone()))
            .collect()
    }

    /// Signals the reaper to stop and waits for it to exit. Safe to call
    /// more than once.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        let handle = self.reaper_handle.lock().expect("reaper mutex poisoned").take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }
    }
}

fn sweep<V>(guard: &mut Map<V>) -> Vec<(String, V)> {
    let now = Instant::now();
    let expired_keys: Vec<String> = guard
        .iter()
        .filter(|(_, entry)| entry.is_expired(now))
        .map(|(k, _)| k.clone())
        .collect();
    let mut removed = Vec::with_capacity(expired_keys.len());
    for key in expired_keys {
        if let Some(entry) = guard.shift_remove(&key) {
            removed.push((key, entry.value));
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_returns_the_value() {
        let store: ExpiringStore<String> = ExpiringStore::new(None, Duration::from_millis(50));
        store.set("k", "v".to_string(), None).await;
        assert_eq!(store.get("k").await, Some("v".to_string()));
        store.stop().await;
    }

    #[tokio::test]
    async fn get_on_missing_key_returns_none() {
        let store: ExpiringStore<String> = ExpiringStore::new(None, Duration::from_millis(50));
        assert_eq!(store.get("missing").await, None);
        store.stop().await;
    }

    #[tokio::test]
    async fn entry_expires_and_is_removed_lazily() {
        let store: ExpiringStore<String> =
            ExpiringStore::new(None, Duration::from_millis(500));
        store
            .set("k", "v".to_string(), Some(Duration::from_millis(20)))
            .await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get("k").await, None);
        assert!(!store.contains("k").await);
        store.stop().await;
    }

    #[tokio::test]
    async fn reaper_sweeps_without_a_read() {
        let store: ExpiringStore<String> =
            ExpiringStore::new(None, Duration::from_millis(20));
        store
            .set("k", "v".to_string(), Some(Duration::from_millis(5)))
            .await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        let keys = store.keys().await;
        assert!(keys.is_empty());
        store.stop().await;
    }

    #[tokio::test]
    async fn set_replaces_value_and_expiration_without_moving_position() {
        let store: ExpiringStore<String> = ExpiringStore::new(None, Duration::from_secs(10));
        store.set("a", "1".to_string(), None).await;
        store.set("b", "2".to_string(), None).await;
        store
            .set("a", "1b".to_string(), Some(Duration::from_secs(10)))
            .await;
        assert_eq!(store.keys().await, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.get("a").await, Some("1b".to_string()));
        store.stop().await;
    }

    #[tokio::test]
    async fn prepend_moves_key_to_front() {
        let store: ExpiringStore<String> = ExpiringStore::new(None, Duration::from_secs(10));
        store.prepend("k1", "v1".to_string(), None).await;
        store.prepend("k2", "v2".to_string(), None).await;
        store.prepend("k3", "v3".to_string(), None).await;
        assert_eq!(
            store.keys().await,
            vec!["k3".to_string(), "k2".to_string(), "k1".to_string()]
        );
        store.stop().await;
    }

    #[tokio::test]
    async fn delete_missing_key_fails() {
        let store: ExpiringStore<String> = ExpiringStore::new(None, Duration::from_secs(10));
        assert!(store.delete("missing").await.is_err());
        store.stop().await;
    }

    #[tokio::test]
    async fn delete_existing_key_succeeds_once() {
        let store: ExpiringStore<String> = ExpiringStore::new(None, Duration::from_secs(10));
        store.set("k", "v".to_string(), None).await;
        assert!(store.delete("k").await.is_ok());
        assert!(store.delete("k").await.is_err());
        store.stop().await;
    }

    #[tokio::test]
    async fn default_ttl_applies_when_none_given() {
        let store: ExpiringStore<String> =
            ExpiringStore::new(Some(Duration::from_millis(20)), Duration::from_millis(500));
        store.set("k", "v".to_string(), None).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get("k").await, None);
        store.stop().await;
    }
}
