//! Application configuration.
//!
//! Defaults are overridden by environment variables (a `.env` file is
//! loaded by the binary through `dotenvy`), then by command-line flags.
//!
//! | Variable                    | Default  |
//! |-----------------------------|----------|
//! | `TABSHIFT_PORT`             | `3000`   |
//! | `TABSHIFT_MAX_UPLOAD_BYTES` | 50 MiB   |
//! | `TABSHIFT_PREVIEW_ROWS`     | `5`      |

use std::str::FromStr;

use crate::error::ConfigError;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Maximum upload size (in bytes).
///
/// 50 MB limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Rows shown in a table preview.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

pub const ENV_PORT: &str = "TABSHIFT_PORT";
pub const ENV_MAX_UPLOAD_BYTES: &str = "TABSHIFT_MAX_UPLOAD_BYTES";
pub const ENV_PREVIEW_ROWS: &str = "TABSHIFT_PREVIEW_ROWS";

/// Runtime settings shared by the CLI and the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub max_upload_bytes: usize,
    pub preview_rows: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

impl AppConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup(ENV_PORT) {
            config.port = parse_value(ENV_PORT, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_UPLOAD_BYTES) {
            config.max_upload_bytes = parse_value(ENV_MAX_UPLOAD_BYTES, &v)?;
        }
        if let Some(v) = lookup(ENV_PREVIEW_ROWS) {
            config.preview_rows = parse_value(ENV_PREVIEW_ROWS, &v)?;
        }

        if config.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: ENV_MAX_UPLOAD_BYTES.to_string(),
                value: "0".to_string(),
            });
        }

        Ok(config)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.port, 3000);
        assert_eq!(config.preview_rows, 5);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENV_PORT, "8080"),
            (ENV_MAX_UPLOAD_BYTES, " 1024 "),
            (ENV_PREVIEW_ROWS, "10"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(config.preview_rows, 10);
    }

    #[test]
    fn test_invalid_value() {
        let err = AppConfig::from_lookup(lookup(&[(ENV_PORT, "eighty")])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(ENV_PORT));
        assert!(msg.contains("eighty"));
    }

    #[test]
    fn test_zero_upload_limit_rejected() {
        assert!(AppConfig::from_lookup(lookup(&[(ENV_MAX_UPLOAD_BYTES, "0")])).is_err());
    }
}
