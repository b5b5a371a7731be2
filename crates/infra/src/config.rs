//! Process configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `APP_PORT` | `8080` |
//! | `DATABASE_URL` | assembled from `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASS`, `DB_NAME`, `SSL_MODE` |
//! | `DB_MAX_CONNECTIONS` | `10` |
//! | `DB_ACQUIRE_TIMEOUT_SECS` | `5` |
//! | `REDIS_URL` | assembled from `REDIS_HOST`, `REDIS_PORT`, `REDIS_PASS` |
//! | `USE_PERSISTENT_STORES` | `false` (in-memory stores) |

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub database: DatabaseConfig,
    pub redis_url: String,
    pub use_persistent_stores: bool,
}

impl AppConfig {
    /// Read the process environment, after loading `.env` when one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => {
                let user = or("DB_USER", "postgres");
                let pass = get("DB_PASS");
                let credentials = match pass {
                    Some(pass) => format!("{user}:{pass}"),
                    None => user,
                };
                format!(
                    "postgres://{credentials}@{}:{}/{}?sslmode={}",
                    or("DB_HOST", "localhost"),
                    or("DB_PORT", "5432"),
                    or("DB_NAME", "pinledger"),
                    or("SSL_MODE", "disable"),
                )
            }
        };

        let redis_url = match get("REDIS_URL") {
            Some(url) => url,
            None => {
                let host = or("REDIS_HOST", "127.0.0.1");
                let port = or("REDIS_PORT", "6379");
                match get("REDIS_PASS") {
                    Some(pass) => format!("redis://:{pass}@{host}:{port}"),
                    None => format!("redis://{host}:{port}"),
                }
            }
        };

        Ok(Self {
            port: parse_or(get("APP_PORT"), "APP_PORT", 8080)?,
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 10)?,
                acquire_timeout: Duration::from_secs(parse_or(
                    get("DB_ACQUIRE_TIMEOUT_SECS"),
                    "DB_ACQUIRE_TIMEOUT_SECS",
                    5,
                )?),
            },
            redis_url,
            use_persistent_stores: parse_flag(get("USE_PERSISTENT_STORES"))?,
        })
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn parse_flag(raw: Option<String>) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::trim) {
        None => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
        Some(v) => Err(ConfigError::Invalid {
            key: "USE_PERSISTENT_STORES",
            value: v.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(
            cfg.database.url,
            "postgres://postgres@localhost:5432/pinledger?sslmode=disable"
        );
        assert_eq!(cfg.database.max_connections, 10);
        assert_eq!(cfg.database.acquire_timeout, Duration::from_secs(5));
        assert_eq!(cfg.redis_url, "redis://127.0.0.1:6379");
        assert!(!cfg.use_persistent_stores);
    }

    #[test]
    fn database_url_is_assembled_from_parts() {
        let cfg = config(&[
            ("DB_HOST", "db"),
            ("DB_PORT", "6543"),
            ("DB_USER", "ledger"),
            ("DB_PASS", "s3cret"),
            ("DB_NAME", "bank"),
            ("SSL_MODE", "require"),
            ("REDIS_PASS", "hunter2"),
            ("REDIS_HOST", "cache"),
        ])
        .unwrap();
        assert_eq!(
            cfg.database.url,
            "postgres://ledger:s3cret@db:6543/bank?sslmode=require"
        );
        assert_eq!(cfg.redis_url, "redis://:hunter2@cache:6379");
    }

    #[test]
    fn explicit_urls_win() {
        let cfg = config(&[
            ("DATABASE_URL", "postgres://x/y"),
            ("DB_HOST", "ignored"),
            ("REDIS_URL", "redis://r:1"),
        ])
        .unwrap();
        assert_eq!(cfg.database.url, "postgres://x/y");
        assert_eq!(cfg.redis_url, "redis://r:1");
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert_eq!(
            config(&[("APP_PORT", "eighty")]).unwrap_err(),
            ConfigError::Invalid {
                key: "APP_PORT",
                value: "eighty".to_string()
            }
        );
        assert!(config(&[("USE_PERSISTENT_STORES", "maybe")]).is_err());
        assert!(config(&[("USE_PERSISTENT_STORES", "TRUE")]).unwrap().use_persistent_stores);
    }
}
