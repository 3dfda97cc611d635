//! # Server Configuration Module
//!
//! [`ServerConfig`] is loaded in three layers, lowest precedence first:
//! built-in defaults, an optional TOML file, then `RADISH_`-prefixed
//! environment variables. A missing config file is not an error — it just
//! means the defaults (possibly overridden by the environment) apply.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub default_ttl_seconds: Option<u64>,
    pub cleanup_interval_seconds: u64,
    pub persistence_dir: Option<PathBuf>,
    pub auto_persist_interval_seconds: Option<u64>,
    pub compress: bool,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            default_ttl_seconds: None,
            cleanup_interval_seconds: 60,
            persistence_dir: None,
            auto_persist_interval_seconds: Some(300),
            compress: false,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Builds the layered configuration. `path` is the `--config` flag, if
    /// given; it is only consulted if the file actually exists.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if path.exists() {
                builder = builder.add_source(config::File::from(path));
            } else {
                tracing::warn!(path = %path.display(), "config file not found, falling back to defaults");
            }
        }

        builder = builder.add_source(config::Environment::with_prefix("RADISH").try_parsing(true));

        builder.build()?.try_deserialize()
    }

    /// Fails only when persistence is enabled and its directory genuinely
    /// cannot be created. Every other condition is absorbed by a default
    /// rather than aborting startup, per the cold-start failure policy.
    pub fn validate(&self) -> std::io::Result<()> {
        if let Some(dir) = &self.persistence_dir {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
