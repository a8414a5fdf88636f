//! Levy configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use levy_core::RoundingMode;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::pool::DbConfig;

/// Levy runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevyConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Connection pool size
    pub max_connections: u32,

    /// Wait for a free pooled connection before failing
    pub acquire_timeout: Duration,

    /// Redis connection string (optional, in-memory cache when absent)
    pub redis_url: Option<String>,

    /// Lifetime of a cached active class
    pub cache_ttl: Duration,

    /// Rounding law applied to every tax line
    pub rounding: RoundingMode,
}

impl Default for LevyConfig {
    fn default() -> Self {
        LevyConfig {
            database_path: PathBuf::from("levy.db"),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            redis_url: None,
            cache_ttl: Duration::from_secs(300),
            rounding: RoundingMode::HalfUp,
        }
    }
}

impl LevyConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = LevyConfig {
            database_path: lookup("LEVY_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("levy.db")),

            max_connections: parse_or(&lookup, "LEVY_DB_MAX_CONNECTIONS", 5)?,

            acquire_timeout: Duration::from_secs(parse_or(
                &lookup,
                "LEVY_DB_ACQUIRE_TIMEOUT_SECS",
                30,
            )?),

            redis_url: lookup("LEVY_REDIS_URL").filter(|url| !url.trim().is_empty()),

            cache_ttl: Duration::from_secs(parse_or(&lookup, "LEVY_CACHE_TTL_SECS", 300)?),

            rounding: parse_or(&lookup, "LEVY_ROUNDING", RoundingMode::HalfUp)?,
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "LEVY_DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(config)
    }

    /// Pool settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LevyConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LevyConfig::default());
        let db = config.db_config();
        assert_eq!(db.max_connections, 5);
        assert_eq!(db.acquire_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = LevyConfig::from_lookup(lookup(&[
            ("LEVY_DATABASE_PATH", "/tmp/levy-test.db"),
            ("LEVY_DB_MAX_CONNECTIONS", "8"),
            ("LEVY_DB_ACQUIRE_TIMEOUT_SECS", "2"),
            ("LEVY_REDIS_URL", "redis://localhost:6379"),
            ("LEVY_CACHE_TTL_SECS", "30"),
            ("LEVY_ROUNDING", "half_even"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/levy-test.db"));
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.db_config().acquire_timeout, Duration::from_secs(2));
        assert_eq!(config.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.rounding, RoundingMode::HalfEven);
    }

    #[test]
    fn test_invalid_values() {
        let err = LevyConfig::from_lookup(lookup(&[("LEVY_ROUNDING", "ceiling")])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for LEVY_ROUNDING");

        let err = LevyConfig::from_lookup(lookup(&[("LEVY_CACHE_TTL_SECS", "-1")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(name) if name == "LEVY_CACHE_TTL_SECS"));

        assert!(LevyConfig::from_lookup(lookup(&[("LEVY_DB_MAX_CONNECTIONS", "0")])).is_err());
    }

    #[test]
    fn test_blank_redis_url_means_memory() {
        let config = LevyConfig::from_lookup(lookup(&[("LEVY_REDIS_URL", "  ")])).unwrap();
        assert_eq!(config.redis_url, None);
    }
}
