//! # Persistence Module
//!
//! Snapshots a named cache's contents and stats block to disk as JSON,
//! optionally gzip-compressed, and restores them back through
//! [`CacheManager::restore_cache`]. A background task can run `persist_all`
//! on a fixed interval, mirroring the cleanup-task pattern the store's
//! reaper uses.
//!
//! ## File format
//!
//! Each cache `<name>` snapshots to `<directory>/<name>.json` (or
//! `<name>.json.gz` if compression is enabled) as:
//!
//! ```json
//! { "data": { "key": "value" }, "stats": { "hits": 0 } }
//! ```
//!
//! On restore, a compressed file wins over an uncompressed one of the same
//! name if both happen to exist. Persist only ever writes the variant
//! selected at construction — it never leaves a stale copy of the other
//! variant behind.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::cache_manager::CacheManager;
use crate::error::PersistenceError;
use crate::stats::CacheStats;
use crate::value::Value;

#[derive(Serialize, Deserialize)]
struct CacheSnapshot {
    data: BTreeMap<String, Value>,
    stats: CacheStats,
}

/// Drives disk snapshotting for every cache owned by a [`CacheManager`].
pub struct PersistenceEngine {
    manager: Arc<CacheManager>,
    directory: PathBuf,
    compress: bool,
    stopped: Arc<AtomicBool>,
    auto_task: StdMutex<Option<JoinHandle<()>>>,
}

impl PersistenceEngine {
    pub fn new(manager: Arc<CacheManager>, directory: impl Into<PathBuf>, compress: bool) -> Self {
        Self {
            manager,
            directory: directory.into(),
            compress,
            stopped: Arc::new(AtomicBool::new(false)),
            auto_task: StdMutex::new(None),
        }
    }

    fn snapshot_path(&self, cache_name: &str) -> PathBuf {
        let file_name = if self.compress {
            format!("{cache_name}.json.gz")
        } else {
            format!("{cache_name}.json")
        };
        self.directory.join(file_name)
    }

    fn candidate_paths(&self, cache_name: &str) -> [PathBuf; 2] {
        [
            self.directory.join(format!("{cache_name}.json.gz")),
            self.directory.join(format!("{cache_name}.json")),
        ]
    }

    /// Writes `cache_name`'s current contents and stats to disk. Fails with
    /// [`PersistenceError::CacheNotFound`] if the cache does not exist.
    pub async fn persist(&self, cache_name: &str) -> Result<(), PersistenceError> {
        let (entries, stats) = self
            .manager
            .snapshot_cache(cache_name)
            .await
            .ok_or_else(|| PersistenceError::CacheNotFound(cache_name.to_string()))?;
        let snapshot = CacheSnapshot {
            data: entries.into_iter().collect(),
            stats,
        };
        let json = serde_json::to_vec_pretty(&snapshot)?;
        let path = self.snapshot_path(cache_name);
        let directory = self.directory.clone();
        let compress = self.compress;
        tokio::task::spawn_blocking(move || write_snapshot(&directory, &path, &json, compress))
            .await
            .expect("persistence write task panicked")?;
        Ok(())
    }

    /// Persists every cache currently known to the manager. The first
    /// failure aborts the sweep; caches already written before it stay
    /// written. Returns the number of caches successfully persisted.
    pub async fn persist_all(&self) -> Result<usize, PersistenceError> {
        let mut count = 0;
        for name in self.manager.list_caches().await {
            self.persist(&name).await?;
            count += 1;
        }
        Ok(count)
    }

    /// Restores `cache_name` from whichever snapshot file is found first:
    /// compressed, then uncompressed, regardless of this engine's own
    /// `compress` setting.
    pub async fn restore(&self, cache_name: &str) -> Result<(), PersistenceError> {
        let candidates = self.candidate_paths(cache_name);
        let json = tokio::task::spawn_blocking(move || read_snapshot(&candidates))
            .await
            .expect("persistence read task panicked")?;
        let snapshot: CacheSnapshot = serde_json::from_slice(&json)?;
        self.manager
            .restore_cache(cache_name, snapshot.data.into_iter().collect(), snapshot.stats)
            .await;
        Ok(())
    }

    /// Restores every snapshot file found in the configured directory,
    /// returning the number of caches restored. Intended to run once at
    /// server startup to rehydrate state left by a prior run.
    pub async fn restore_all(&self) -> Result<usize, PersistenceError> {
        let directory = self.directory.clone();
        let names = tokio::task::spawn_blocking(move || list_snapshot_names(&directory))
            .await
            .expect("persistence listing task panicked")?;
        let mut count = 0;
        for name in names {
            self.restore(&name).await?;
            count += 1;
        }
        Ok(count)
    }

    /// Spawns a background task that calls [`PersistenceEngine::persist_all`]
    /// on a fixed interval, logging rather than propagating any failure so a
    /// single bad sweep doesn't kill future ones.
    pub fn start_auto_persist(self: &Arc<Self>, interval: Duration) {
        let engine = self.clone();
        let stopped = self.stopped.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                if stopped.load(Ordering::Acquire) {
                    break;
                }
                match engine.persist_all().await {
                    Ok(count) => tracing::debug!(count, "auto-persist sweep completed"),
                    Err(error) => tracing::warn!(%error, "auto-persist sweep failed"),
                }
            }
        });
        *self.auto_task.lock().expect("auto-persist mutex poisoned") = Some(handle);
    }

    /// Persists every cache one last time, then stops the auto-persist task
    /// if one was running. Safe to call even if `start_auto_persist` never
    /// ran.
    pub async fn stop(&self) {
        if let Err(error) = self.persist_all().await {
            tracing::warn!(%error, "final persist on shutdown failed");
        }
        self.stopped.store(true, Ordering::Release);
        let handle = self
            .auto_task
            .lock()
            .expect("auto-persist mutex poisoned")
            .take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }
    }
}

/// Writes `json` to `path` via a sibling `.tmp` file, fsyncing it before an
/// atomic rename into place. A write failure (full disk, killed process,
/// revoked permission) leaves the `.tmp` file orphaned but never disturbs
/// whatever snapshot was already at `path`.
fn write_snapshot(directory: &Path, path: &Path, json: &[u8], compress: bool) -> Result<(), PersistenceError> {
    std::fs::create_dir_all(directory)?;
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let file = std::fs::File::create(&tmp_path)?;
    if compress {
        let mut encoder = GzEncoder::new(file, Compression::default());
        std::io::Write::write_all(&mut encoder, json)?;
        let file = encoder.finish()?;
        file.sync_all()?;
    } else {
        let mut file = file;
        std::io::Write::write_all(&mut file, json)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn read_snapshot(candidates: &[PathBuf]) -> Result<Vec<u8>, PersistenceError> {
    for path in candidates {
        if !path.exists() {
            continue;
        }
        let bytes = std::fs::read(path)?;
        if path.extension().and_then(|ext| ext.to_str()) == Some("gz") {
            let mut decoder = GzDecoder::new(bytes.as_slice());
            let mut out = Vec::new();
            std::io::Read::read_to_end(&mut decoder, &mut out)?;
            return Ok(out);
        }
        return Ok(bytes);
    }
    Err(PersistenceError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "no snapshot file found for cache",
    )))
}

fn list_snapshot_names(directory: &Path) -> Result<Vec<String>, PersistenceError> {
    if !directory.exists() {
        return Ok(Vec::new());
    }
    let mut names = BTreeSet::new();
    for entry in std::fs::read_dir(directory)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        if let Some(name) = file_name.strip_suffix(".json.gz") {
            names.insert(name.to_string());
        } else if let Some(name) = file_name.strip_suffix(".json") {
            names.insert(name.to_string());
        }
    }
    Ok(names.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    fn manager() -> Arc<CacheManager> {
        Arc::new(CacheManager::new(None, StdDuration::from_millis(200)))
    }

    #[tokio::test]
    async fn persist_then_restore_round_trips_data_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager();
        manager.set("users", "u1", Value::from("alice"), None).await;
        manager.get("users", "u1").await;

        let engine = PersistenceEngine::new(manager.clone(), dir.path(), false);
        engine.persist("users").await.unwrap();

        let fresh = manager();
        let engine2 = PersistenceEngine::new(fresh.clone(), dir.path(), false);
        engine2.restore("users").await.unwrap();

        assert_eq!(fresh.get("users", "u1").await, Some(Value::from("alice")));
        assert_eq!(fresh.stats("users").unwrap().hits, 1);

        manager.stop().await;
        fresh.stop().await;
    }

    #[tokio::test]
    async fn compressed_round_trip_matches_uncompressed_data() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager();
        manager.set("c", "k", Value::from("v"), None).await;

        let engine = PersistenceEngine::new(manager.clone(), dir.path(), true);
        engine.persist("c").await.unwrap();
        assert!(dir.path().join("c.json.gz").exists());
        assert!(!dir.path().join("c.json").exists());

        let fresh = manager();
        let engine2 = PersistenceEngine::new(fresh.clone(), dir.path(), false);
        engine2.restore("c").await.unwrap();
        assert_eq!(fresh.get("c", "k").await, Some(Value::from("v")));

        manager.stop().await;
        fresh.stop().await;
    }

    #[tokio::test]
    async fn restore_all_rehydrates_every_snapshot_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager();
        manager.set("a", "k", Value::from("1"), None).await;
        manager.set("b", "k", Value::from("2"), None).await;
        let engine = PersistenceEngine::new(manager.clone(), dir.path(), false);
        engine.persist_all().await.unwrap();

        let fresh = manager();
        let engine2 = PersistenceEngine::new(fresh.clone(), dir.path(), false);
        let restored = engine2.restore_all().await.unwrap();
        assert_eq!(restored, 2);
        assert_eq!(fresh.get("a", "k").await, Some(Value::from("1")));
        assert_eq!(fresh.get("b", "k").await, Some(Value::from("2")));

        manager.stop().await;
        fresh.stop().await;
    }

    #[tokio::test]
    async fn persist_on_missing_cache_fails() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager();
        let engine = PersistenceEngine::new(manager.clone(), dir.path(), false);
        assert!(engine.persist("nope").await.is_err());
        manager.stop().await;
    }
}
