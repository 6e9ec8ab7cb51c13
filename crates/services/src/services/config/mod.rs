use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::events::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_SUBSCRIBERS_PER_TOPIC, MAX_CHANNEL_CAPACITY,
};

pub const DEFAULT_SQLITE_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_SSE_KEEPALIVE_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Runtime settings. Every field has a default, so a partial JSON file is fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Config {
    pub host: String,
    /// `0` lets the OS pick a port.
    pub port: u16,
    pub database_path: Option<PathBuf>,
    pub sqlite_max_connections: u32,
    pub event_channel_capacity: usize,
    pub max_subscribers_per_topic: usize,
    pub sse_keepalive_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_path: None,
            sqlite_max_connections: DEFAULT_SQLITE_MAX_CONNECTIONS,
            event_channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_subscribers_per_topic: DEFAULT_MAX_SUBSCRIBERS_PER_TOPIC,
            sse_keepalive_secs: DEFAULT_SSE_KEEPALIVE_SECS,
        }
    }
}

impl From<String> for Config {
    fn from(raw_config: String) -> Self {
        match serde_json::from_str::<Config>(&raw_config) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Invalid config file: {}, using default", e);
                Self::default()
            }
        }
    }
}

impl Config {
    /// Defaults, then `path` if it exists, then environment overrides.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = load_config_from_file(path).await;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("HOST")
            && !host.trim().is_empty()
        {
            self.host = host;
        }
        if let Some(port) = env_parse::<u16>("BACKEND_PORT").or_else(|| env_parse("PORT")) {
            self.port = port;
        }
        if let Ok(path) = std::env::var("KAN_DATABASE_PATH")
            && !path.trim().is_empty()
        {
            self.database_path = Some(utils::assets::expand_tilde(&path));
        }
        if let Some(n) = env_parse("KAN_SQLITE_MAX_CONNECTIONS") {
            self.sqlite_max_connections = n;
        }
        if let Some(n) = env_parse("KAN_EVENT_CHANNEL_CAPACITY") {
            self.event_channel_capacity = n;
        }
        if let Some(n) = env_parse("KAN_MAX_SUBSCRIBERS_PER_TOPIC") {
            self.max_subscribers_per_topic = n;
        }
        if let Some(n) = env_parse("KAN_SSE_KEEPALIVE_SECS") {
            self.sse_keepalive_secs = n;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.sqlite_max_connections) {
            return Err(ConfigError::ValidationError(format!(
                "sqlite_max_connections must be between 1 and 100, got {}",
                self.sqlite_max_connections
            )));
        }
        if !(1..=MAX_CHANNEL_CAPACITY).contains(&self.event_channel_capacity) {
            return Err(ConfigError::ValidationError(format!(
                "event_channel_capacity must be between 1 and {MAX_CHANNEL_CAPACITY}, got {}",
                self.event_channel_capacity
            )));
        }
        if self.max_subscribers_per_topic == 0 {
            return Err(ConfigError::ValidationError(
                "max_subscribers_per_topic must be at least 1".to_string(),
            ));
        }
        if self.sse_keepalive_secs == 0 {
            return Err(ConfigError::ValidationError(
                "sse_keepalive_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(utils::assets::database_path)
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable environment variable");
            None
        }
    }
}

/// Will always return config, falling back to defaults
pub async fn load_config_from_file(config_path: &Path) -> Config {
    match std::fs::read_to_string(config_path) {
        Ok(raw_config) => Config::from(raw_config),
        Err(_) => {
            tracing::info!(path = %config_path.display(), "No config file found, using defaults");
            Config::default()
        }
    }
}

/// Saves the config to the given path
pub async fn save_config_to_file(config: &Config, config_path: &Path) -> Result<(), ConfigError> {
    let raw_config = serde_json::to_string_pretty(config)?;
    std::fs::write(config_path, raw_config)?;
    Ok(())
}
