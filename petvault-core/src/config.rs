//! Configuration for the client core.

use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Main configuration structure for the client core.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Identity and document backend.
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the PetVault backend (identity and pet endpoints).
    pub base_url: String,
    /// Request timeout for backend calls, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// Build the HTTP client for the REST providers with the configured
    /// timeout applied. Pass the result to `with_client` on
    /// [`crate::auth::RestIdentityProvider`] / [`crate::pets::RestPetStore`].
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// SQLite database holding the session cache.
    #[serde(default = "default_cache_path")]
    pub path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_cache_path() -> String {
    "sqlite:./data/session.db".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (PETVAULT__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .set_default("api.timeout_secs", default_timeout_secs())?
            .set_default("cache.path", default_cache_path())?
            .set_default("logging.level", default_log_level())?
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("PETVAULT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_timeout_defaults_when_absent() {
        let api: ApiConfig =
            serde_json::from_str(r#"{ "base_url": "http://localhost:8080" }"#).unwrap();
        assert_eq!(api.timeout_secs, 30);
        api.http_client().unwrap();
    }

    #[test]
    fn test_api_timeout_deserializes_from_config() {
        let api: ApiConfig = serde_json::from_str(
            r#"{ "base_url": "http://localhost:8080", "timeout_secs": 5 }"#,
        )
        .unwrap();
        assert_eq!(api.timeout_secs, 5);
    }

    #[test]
    fn test_default_cache_config() {
        let cache = CacheConfig::default();
        assert_eq!(cache.path, "sqlite:./data/session.db");
    }

    #[test]
    fn test_default_logging_config() {
        let logging = LoggingConfig::default();
        assert_eq!(logging.level, "info");
    }
}
