//! # configs
//!
//! Layered settings for the verity client. Sources, later ones winning:
//!
//! 1. built-in defaults
//! 2. `verity.toml` in the working directory (or an explicit path), optional
//! 3. environment variables `VERITY__<SECTION>__<KEY>`, e.g. `VERITY__API__BASE_URL`
//!
//! A `.env` file is loaded into the environment first when present.

use std::path::Path;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub api: ApiSettings,
    pub notifications: NotificationSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Bearer token; redacted in `Debug` output.
    #[serde(default)]
    pub token: Option<SecretString>,
    /// Environment variable consulted for a token when `token` is unset.
    pub token_env: String,
    pub comment_page_size: u32,
}

#[derive(Debug, Deserialize)]
pub struct NotificationSettings {
    pub ttl_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Json,
}

impl Settings {
    /// Loads from `.env`, `verity.toml` (or `path`) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(env_file) = dotenvy::dotenv() {
            debug!(path = %env_file.display(), "loaded .env");
        }

        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name("verity").required(false),
        };
        let config = defaults()?
            .add_source(file)
            .add_source(Environment::with_prefix("VERITY").prefix_separator("__").separator("__"))
            .build()?;
        Self::from_config(config)
    }

    /// Defaults overlaid with a TOML document; no file or environment access.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config = defaults()?.add_source(File::from_str(toml, FileFormat::Toml)).build()?;
        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url must not be empty".into()));
        }
        if self.api.comment_page_size == 0 {
            return Err(ConfigError::Invalid("api.comment_page_size must be at least 1".into()));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid("api.timeout_secs must be at least 1".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notifications.ttl_ms)
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(Config::builder()
        .set_default("api.base_url", "http://localhost:8080")?
        .set_default("api.timeout_secs", 10_i64)?
        .set_default("api.token_env", "ACCESS_TOKEN")?
        .set_default("api.comment_page_size", 100_i64)?
        .set_default("notifications.ttl_ms", 3000_i64)?
        .set_default("log.level", "info")?
        .set_default("log.format", "compact")?)
}
