use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::services::EngineSettings;

/// Backing store for the engine's sets and rankings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // HTTP server config
    pub http_host: String,
    pub http_port: u16,

    // Set store
    pub store_backend: StoreBackend,
    pub redis_url: String,
    pub redis_command_timeout_ms: u64,

    // Engine
    pub key_prefix: String,
    pub max_neighbors: usize,

    // Observability
    pub log_level: String,
    pub log_format: String,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .set_default("http_host", "0.0.0.0")?
            .set_default("http_port", 8012)?
            .set_default("store_backend", "redis")?
            .set_default("redis_url", "redis://localhost:6379")?
            .set_default("redis_command_timeout_ms", 3000)?
            .set_default("key_prefix", "recommender")?
            .set_default("max_neighbors", 10)?
            .set_default("log_level", "info")?
            .set_default("log_format", "text")?
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn validate(&self) -> Result<()> {
        if self.http_port == 0 {
            return Err(anyhow!("HTTP port must be greater than 0"));
        }

        if self.store_backend == StoreBackend::Redis && self.redis_url.is_empty() {
            return Err(anyhow!("Redis URL is required for the redis store backend"));
        }

        if self.redis_command_timeout_ms == 0 {
            return Err(anyhow!("Redis command timeout must be greater than 0"));
        }

        if self.key_prefix.is_empty() || self.key_prefix.contains(':') {
            return Err(anyhow!("Key prefix must be non-empty and must not contain ':'"));
        }

        if self.max_neighbors == 0 || self.max_neighbors > 1000 {
            return Err(anyhow!("Max neighbors must be between 1 and 1000"));
        }

        if !matches!(self.log_format.as_str(), "text" | "json") {
            return Err(anyhow!("Log format must be 'text' or 'json'"));
        }

        Ok(())
    }

    pub fn redis_command_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_command_timeout_ms)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            key_prefix: self.key_prefix.clone(),
            max_neighbors: self.max_neighbors,
        }
    }
}
