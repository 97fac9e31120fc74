//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. `main` loads a `.env` file first when one is present.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use market_core::{LIST_CACHE_TTL_SECS, REQUEST_DEADLINE_MS};

/// Signing key used by debug builds when `SECRET_KEY` is unset.
const DEV_SECRET_KEY: &str = "market-pos-dev-secret-change-in-production";

/// API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface to bind
    pub host: String,

    /// HTTP port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    pub db_max_connections: u32,

    /// Redis connection string; unset means the in-process cache
    pub redis_url: Option<String>,

    /// Disables list caching entirely when false
    pub cache_enabled: bool,

    pub list_cache_ttl: Duration,

    /// Upper bound on each request's storage work
    pub request_deadline: Duration,

    /// HS256 key for access tokens
    pub secret_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
            database_path: "./data/market.db".to_string(),
            db_max_connections: 5,
            redis_url: None,
            cache_enabled: true,
            list_cache_ttl: Duration::from_secs(LIST_CACHE_TTL_SECS),
            request_deadline: Duration::from_millis(REQUEST_DEADLINE_MS),
            secret_key: DEV_SECRET_KEY.to_string(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ApiConfig::default();

        let secret_key = match lookup("SECRET_KEY").filter(|v| !v.trim().is_empty()) {
            Some(key) => key,
            // Release builds never sign with a well-known key
            None if cfg!(debug_assertions) => defaults.secret_key,
            None => return Err(ConfigError::MissingRequired("SECRET_KEY".to_string())),
        };

        let config = ApiConfig {
            host: lookup("SERVICE_HOST").unwrap_or(defaults.host),

            http_port: parse_or(&lookup, "SERVICE_HTTP_PORT", defaults.http_port)?,

            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),

            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,

            redis_url: lookup("REDIS_URL").filter(|v| !v.trim().is_empty()),

            cache_enabled: parse_or(&lookup, "CACHE_ENABLED", defaults.cache_enabled)?,

            list_cache_ttl: Duration::from_secs(parse_or(&lookup, "LIST_CACHE_TTL_SECS", LIST_CACHE_TTL_SECS)?),

            request_deadline: Duration::from_millis(parse_or(
                &lookup,
                "REQUEST_DEADLINE_MS",
                REQUEST_DEADLINE_MS,
            )?),

            secret_key,
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        if config.request_deadline.is_zero() {
            return Err(ConfigError::InvalidValue("REQUEST_DEADLINE_MS".to_string()));
        }

        Ok(config)
    }

    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.database_path, "./data/market.db");
        assert_eq!(config.db_max_connections, 5);
        assert!(config.redis_url.is_none());
        assert!(config.cache_enabled);
        assert_eq!(config.list_cache_ttl, Duration::from_secs(15));
        assert_eq!(config.request_deadline, Duration::from_millis(2000));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SERVICE_HOST", "127.0.0.1"),
            ("SERVICE_HTTP_PORT", "9000"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("CACHE_ENABLED", "false"),
            ("REQUEST_DEADLINE_MS", "500"),
            ("SECRET_KEY", "prod-key"),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert!(!config.cache_enabled);
        assert_eq!(config.request_deadline, Duration::from_millis(500));
        assert_eq!(config.secret_key, "prod-key");
    }

    #[test]
    fn test_invalid_values() {
        let err = load(&[("SERVICE_HTTP_PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "SERVICE_HTTP_PORT"));

        let err = load(&[("DB_MAX_CONNECTIONS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));

        let err = load(&[("CACHE_ENABLED", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_blank_redis_url_means_memory_cache() {
        let config = load(&[("REDIS_URL", "  ")]).unwrap();
        assert!(config.redis_url.is_none());
    }
}
