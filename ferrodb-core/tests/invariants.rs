//! Cross-module invariants that don't belong to any single module's unit
//! tests: TTL expiry across the reaper's cadence, cache-size/sweep
//! agreement, and a full persistence round trip through a destroyed and
//! recreated cache.

use std::time::Duration;

use ferrodb_core::value::parse_wire_value;
use ferrodb_core::{CacheManager, Value};

#[tokio::test]
async fn expired_key_is_gone_after_wall_time_passes_ttl_plus_cleanup_interval() {
    let manager = CacheManager::new(None, Duration::from_millis(30));
    manager.create_cache("sessions").await;
    manager
        .set("sessions", "token", Value::from("abc"), Some(Duration::from_millis(20)))
        .await;

    tokio::time::sleep(Duration::from_millis(20) + Duration::from_millis(30) + Duration::from_millis(50)).await;

    assert_eq!(manager.get("sessions", "token").await, None);
    assert_eq!(manager.cache_size("sessions").await, 0);
    manager.stop().await;
}

#[tokio::test]
async fn cache_size_matches_the_count_of_immediately_readable_keys() {
    let manager = CacheManager::new(None, Duration::from_millis(500));
    manager.set("c", "a", Value::from("1"), None).await;
    manager.set("c", "b", Value::from("2"), Some(Duration::from_millis(10))).await;
    tokio::time::sleep(Duration::from_millis(40)).await;

    let size = manager.cache_size("c").await;
    let mut readable = 0;
    for key in ["a", "b"] {
        if manager.get("c", key).await.is_some() {
            readable += 1;
        }
    }
    assert_eq!(size, readable);
    manager.stop().await;
}

#[tokio::test]
async fn deletecache_is_idempotent_reporting_not_found_on_the_second_call() {
    let manager = CacheManager::new(None, Duration::from_millis(500));
    manager.create_cache("one-shot").await;
    assert!(manager.delete_cache("one-shot").await);
    assert!(!manager.delete_cache("one-shot").await);
    manager.stop().await;
}

#[tokio::test]
async fn search_json_path_and_value_template_compose_over_structured_entries() {
    let manager = CacheManager::new(None, Duration::from_millis(500));
    manager
        .set(
            "accounts",
            "acc1",
            parse_wire_value(r#"{"profile":{"active":true},"name":"alice"}"#),
            None,
        )
        .await;
    manager
        .set(
            "accounts",
            "acc2",
            parse_wire_value(r#"{"profile":{"active":false},"name":"bob"}"#),
            None,
        )
        .await;

    let via_path = manager.search_json_path("accounts", "profile.active").await.unwrap();
    assert_eq!(via_path.len(), 2);

    let template = parse_wire_value(r#"{"profile":{"active":true}}"#);
    let matches = manager.find_by_value("accounts", &template).await.unwrap();
    assert_eq!(matches, vec!["acc1".to_string()]);
    manager.stop().await;
}
