//! Snapshot-then-destroy-then-restore, driven against a single long-lived
//! manager rather than two separate ones, to exercise the literal sequence
//! the round-trip invariant describes.

use std::sync::Arc;
use std::time::Duration;

use ferrodb_core::persistence::PersistenceEngine;
use ferrodb_core::{CacheManager, Value};

#[tokio::test]
async fn snapshot_destroy_restore_yields_the_pre_destroy_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(CacheManager::new(None, Duration::from_millis(500)));
    let engine = PersistenceEngine::new(manager.clone(), dir.path(), false);

    manager.set("inventory", "widget", Value::from("42"), None).await;
    manager.set("inventory", "gadget", Value::from("7"), None).await;
    engine.persist("inventory").await.unwrap();

    assert!(manager.delete_cache("inventory").await);
    assert_eq!(manager.cache_size("inventory").await, 0);

    engine.restore("inventory").await.unwrap();

    assert_eq!(manager.get("inventory", "widget").await, Some(Value::from("42")));
    assert_eq!(manager.get("inventory", "gadget").await, Some(Value::from("7")));
    assert_eq!(manager.cache_size("inventory").await, 2);

    manager.stop().await;
}
