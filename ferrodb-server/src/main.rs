//! ferrodb-server: the TCP front end over `ferrodb-core`'s expiring store
//! and named cache manager.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ferrodb_core::persistence::PersistenceEngine;
use ferrodb_core::{CacheManager, ExpiringStore};

use ferrodb_server::{Dispatcher, Server, ServerConfig};

/// A Redis-inspired, in-memory key-value server with TTL expiration and
/// named caches.
#[derive(Parser, Debug)]
#[command(name = "ferrodb-server", version, about)]
struct Args {
    /// Path to an optional TOML configuration file.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Overrides the configured tracing log level (e.g. "debug", "info,ferrodb_core=debug").
    #[arg(long)]
    log_level: Option<String>,

    /// Overrides the directory named caches are persisted to.
    #[arg(long)]
    persistence_dir: Option<std::path::PathBuf>,

    /// Overrides the auto-persist sweep interval, in seconds.
    #[arg(long)]
    auto_persist_interval: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::load(args.config.as_deref()).context("loading server configuration")?;
    if let Some(log_level) = args.log_level {
        config.log_level = log_level;
    }
    if let Some(dir) = args.persistence_dir {
        config.persistence_dir = Some(dir);
    }
    if let Some(interval) = args.auto_persist_interval {
        config.auto_persist_interval_seconds = Some(interval);
    }
    config.validate().context("validating server configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(config.log_level.clone()))
        .init();

    tracing::info!(?config, "starting ferrodb-server");

    let default_ttl = config.default_ttl_seconds.map(Duration::from_secs);
    let cleanup_interval = Duration::from_secs(config.cleanup_interval_seconds);

    let store = Arc::new(ExpiringStore::<String>::new(default_ttl, cleanup_interval));
    let cache_manager = Arc::new(CacheManager::new(default_ttl, cleanup_interval));

    let persistence = match config.persistence_dir.clone() {
        Some(dir) => {
            let engine = Arc::new(PersistenceEngine::new(cache_manager.clone(), dir, config.compress));
            let restored = engine.restore_all().await.context("restoring persisted caches")?;
            tracing::info!(restored, "restored caches from disk");
            if let Some(interval) = config.auto_persist_interval_seconds {
                engine.start_auto_persist(Duration::from_secs(interval));
                tracing::info!(interval_seconds = interval, "auto-persist task started");
            }
            Some(engine)
        }
        None => None,
    };

    let dispatcher = Arc::new(Dispatcher::new(store.clone(), cache_manager.clone()));
    let addr = format!("{}:{}", config.host, config.port);
    let server = Server::bind(&addr, dispatcher)
        .await
        .with_context(|| format!("binding listener to {addr}"))?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    server.run(shutdown_rx).await.context("server accept loop failed")?;

    if let Some(engine) = persistence {
        engine.stop().await;
    }
    store.stop().await;
    cache_manager.stop().await;

    Ok(())
}
