//! # Verb Handlers
//!
//! One function per command verb, wired to the global store and the named
//! cache manager. [`dispatch`] is only ever called with tokens that already
//! passed [`crate::validator::validate`], so handlers trust arity and typed
//! positions without re-checking them.

use std::time::Duration;

use ferrodb_core::value::parse_wire_value;
use ferrodb_core::{CacheManager, ExpiringStore};

use crate::error_handling::HandlerError;

/// Runs the handler for `verb` against already-validated `tokens`.
pub async fn dispatch(
    verb: &str,
    tokens: &[String],
    store: &ExpiringStore<String>,
    cache_manager: &CacheManager,
) -> Result<String, HandlerError> {
    match verb {
        "PING" => Ok("PONG".to_string()),
        "ECHO" => Ok(tokens[1..].join(" ")),
        "SET" => {
            store.set(tokens[1].clone(), tokens[2].clone(), None).await;
            Ok("OK".to_string())
        }
        "GET" => Ok(store.get(&tokens[1]).await.unwrap_or_else(|| "NULL".to_string())),
        "DEL" | "LPOP" => match store.delete(&tokens[1]).await {
            Ok(_) => Ok("OK".to_string()),
            Err(_) => Ok("NULL".to_string()),
        },
        "EXPIRE" => {
            let seconds: i64 = tokens[2].parse().expect("validated as an integer");
            match store.get(&tokens[1]).await {
                Some(value) => {
                    let ttl = Duration::from_secs(seconds.max(0) as u64);
                    store.set(tokens[1].clone(), value, Some(ttl)).await;
                    Ok("OK".to_string())
                }
                None => Ok("NULL".to_string()),
            }
        }
        "LPUSH" => {
            store.prepend(tokens[1].clone(), tokens[2].clone(), None).await;
            Ok("OK".to_string())
        }
        "RPUSH" => {
            // Degenerates to a plain write: the original never actually
            // appends, and spec compatibility is preserved over "fixing" it.
            store.set(tokens[1].clone(), tokens[2].clone(), None).await;
            Ok("OK".to_string())
        }
        "INSPECT" => {
            tracing::warn!("INSPECT invoked: dumping every key in the global store, unauthenticated");
            let mut lines = Vec::new();
            for key in store.keys().await {
                if let Some(value) = store.get(&key).await {
                    lines.push(format!("{key}: {value}"));
                }
            }
            lines.push("END".to_string());
            Ok(lines.join("\n"))
        }
        "CREATECACHE" => {
            if cache_manager.create_cache(&tokens[1]).await {
                Ok("OK".to_string())
            } else {
                Err(HandlerError::CacheAlreadyExists(tokens[1].clone()))
            }
        }
        "DELETECACHE" => {
            if cache_manager.delete_cache(&tokens[1]).await {
                Ok("OK".to_string())
            } else {
                Err(HandlerError::CacheNotFound(tokens[1].clone()))
            }
        }
        "LISTCACHES" => {
            let mut lines = Vec::new();
            for name in cache_manager.list_caches().await {
                let size = cache_manager.cache_size(&name).await;
                lines.push(format!("{name}: {size} items"));
            }
            Ok(lines.join("\n"))
        }
        "CACHESET" => {
            let value = parse_wire_value(&tokens[3]);
            cache_manager.set(&tokens[1], &tokens[2], value, None).await;
            Ok("OK".to_string())
        }
        "CACHEGET" => {
            if !cache_manager.cache_exists(&tokens[1]).await {
                return Err(HandlerError::CacheNotFound(tokens[1].clone()));
            }
            match cache_manager.get(&tokens[1], &tokens[2]).await {
                Some(value) => Ok(value.render()),
                None => Ok("NULL".to_string()),
            }
        }
        "CACHEDEL" => match cache_manager.delete(&tokens[1], &tokens[2]).await {
            Ok(()) => Ok("OK".to_string()),
            Err(_) => Ok("NULL".to_string()),
        },
        "CACHEKEYS" => match cache_manager.search_by_pattern(&tokens[1], None, false).await {
            Ok(entries) if entries.is_empty() => Ok("(empty)".to_string()),
            Ok(entries) => Ok(entries.into_iter().map(|(k, _)| k).collect::<Vec<_>>().join("\n")),
            // A non-existent cache is treated the same as an empty one:
            // soft reply, not an error, matching CACHEGETALL's leniency.
            Err(_) => Ok("(empty)".to_string()),
        },
        "CACHEGETALL" => match cache_manager.search_by_pattern(&tokens[1], None, false).await {
            Ok(entries) => {
                let map: serde_json::Map<String, serde_json::Value> = entries
                    .into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect();
                Ok(serde_json::to_string(&serde_json::Value::Object(map))
                    .unwrap_or_else(|_| "{}".to_string()))
            }
            Err(_) => Ok("{}".to_string()),
        },
        other => unreachable!("validator rejects unregistered verb {other} before dispatch"),
    }
}
