//! Application configuration management

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::services::apod::DEFAULT_API_URL;
use crate::services::logging::LogFormat;

/// File name of the cache index inside the image directory
pub const DATABASE_FILE_NAME: &str = "image_cache.db";

/// NASA's shared, heavily rate-limited demo key
pub const DEMO_API_KEY: &str = "DEMO_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// api.nasa.gov key
    pub api_key: String,

    /// APOD endpoint
    pub api_url: String,

    /// Directory holding cached images (and, by default, the index)
    pub cache_dir: PathBuf,

    /// Explicit index location; `None` means `<cache_dir>/image_cache.db`
    pub database_path: Option<PathBuf>,

    /// Timeout applied to the APOD request and the image download
    pub http_timeout: Duration,

    /// Maximum pooled SQLite connections
    pub max_connections: u32,

    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let http_timeout_secs: u64 = parse_or(&get, "APOD_HTTP_TIMEOUT_SECS", 30)?;
        if http_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "APOD_HTTP_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "timeout must be at least one second".to_string(),
            });
        }

        let log_format = match get("APOD_LOG_FORMAT") {
            Some(value) => value.parse::<LogFormat>().map_err(|reason| ConfigError::Invalid {
                key: "APOD_LOG_FORMAT",
                value,
                reason,
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            api_key: get("APOD_API_KEY").unwrap_or_else(|| DEMO_API_KEY.to_string()),

            api_url: get("APOD_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),

            cache_dir: get("APOD_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_cache_dir),

            database_path: get("APOD_DATABASE_PATH").map(PathBuf::from),

            http_timeout: Duration::from_secs(http_timeout_secs),

            max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 5)?,

            log_format,
        })
    }

    /// Override the image directory (e.g. from the command line)
    pub fn with_cache_dir(mut self, cache_dir: PathBuf) -> Self {
        self.cache_dir = cache_dir;
        self
    }

    /// Location of the SQLite index
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.cache_dir.join(DATABASE_FILE_NAME))
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

/// `<data dir>/apod-desktop/images`, or `./images` when there is no data dir
fn default_cache_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("apod-desktop").join("images"))
        .unwrap_or_else(|| PathBuf::from("./images"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.api_key, DEMO_API_KEY);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.cache_dir.ends_with("images"));
        assert_eq!(config.database_path(), config.cache_dir.join(DATABASE_FILE_NAME));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("APOD_API_KEY", "secret"),
            ("APOD_CACHE_DIR", "/tmp/apod"),
            ("APOD_HTTP_TIMEOUT_SECS", "5"),
            ("APOD_LOG_FORMAT", "json"),
            ("DATABASE_MAX_CONNECTIONS", "2"),
        ])
        .unwrap();
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/apod/image_cache.db"));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.max_connections, 2);
    }

    #[test]
    fn test_cache_dir_override_moves_default_database() {
        let config = config_from(&[("APOD_CACHE_DIR", "/a")])
            .unwrap()
            .with_cache_dir(PathBuf::from("/b"));
        assert_eq!(config.database_path(), PathBuf::from("/b/image_cache.db"));

        let pinned = config_from(&[("APOD_DATABASE_PATH", "/db/index.db")])
            .unwrap()
            .with_cache_dir(PathBuf::from("/b"));
        assert_eq!(pinned.database_path(), PathBuf::from("/db/index.db"));
    }

    #[test]
    fn test_invalid_values() {
        assert_matches!(
            config_from(&[("APOD_HTTP_TIMEOUT_SECS", "soon")]),
            Err(ConfigError::Invalid { key: "APOD_HTTP_TIMEOUT_SECS", .. })
        );
        assert_matches!(
            config_from(&[("APOD_HTTP_TIMEOUT_SECS", "0")]),
            Err(ConfigError::Invalid { .. })
        );
        assert_matches!(
            config_from(&[("APOD_LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid { key: "APOD_LOG_FORMAT", .. })
        );
    }
}
