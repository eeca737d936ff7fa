//! Engine configuration.
//!
//! Loaded from an optional JSON file and then overridden from the
//! environment:
//!
//! | Variable                  | Field            |
//! |---------------------------|------------------|
//! | `ASSETFLOW_CACHE_DIR`     | `cache_dir`      |
//! | `ASSETFLOW_CACHE_ENABLED` | `cache_enabled`  |
//! | `ASSETFLOW_RETRY_BASE_MS` | `retry.base_delay_ms` |
//! | `ASSETFLOW_LOG_FORMAT`    | `log_format`     |

use crate::errors::ConfigError;
use crate::executor::RetryConfig;
use crate::observability::{self, LogFormat, LOG_FORMAT_ENV};
use tracing_subscriber::util::TryInitError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the cache directory.
pub const CACHE_DIR_ENV: &str = "ASSETFLOW_CACHE_DIR";
/// Environment variable switching the cache on or off.
pub const CACHE_ENABLED_ENV: &str = "ASSETFLOW_CACHE_ENABLED";
/// Environment variable overriding the backoff time unit.
pub const RETRY_BASE_ENV: &str = "ASSETFLOW_RETRY_BASE_MS";

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory of the on-disk cache. Without one, an enabled cache lives in memory.
    pub cache_dir: Option<PathBuf>,
    /// Whether the cache is consulted at all.
    pub cache_enabled: bool,
    /// Retry delay schedule.
    pub retry: RetryConfig,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            cache_enabled: true,
            retry: RetryConfig::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    /// Applies overrides from any variable lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let invalid = |var: &str, value: &str| ConfigError::InvalidEnv {
            var: var.to_string(),
            value: value.to_string(),
        };

        if let Some(dir) = lookup(CACHE_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            self.cache_dir = Some(PathBuf::from(dir));
        }

        if let Some(value) = lookup(CACHE_ENABLED_ENV) {
            self.cache_enabled = match value.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(invalid(CACHE_ENABLED_ENV, &value)),
            };
        }

        if let Some(value) = lookup(RETRY_BASE_ENV) {
            self.retry.base_delay_ms = value
                .trim()
                .parse()
                .map_err(|_| invalid(RETRY_BASE_ENV, &value))?;
        }

        if let Some(value) = lookup(LOG_FORMAT_ENV) {
            self.log_format = value.parse().map_err(|_| invalid(LOG_FORMAT_ENV, &value))?;
        }

        Ok(self)
    }

    /// Installs the global tracing subscriber in the configured log format.
    ///
    /// # Errors
    ///
    /// Fails if a global subscriber is already installed.
    pub fn init_tracing(&self) -> Result<(), TryInitError> {
        observability::init_tracing(self.log_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.cache_enabled);
        assert_eq!(config.cache_dir, None);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("assetflow.json");
        fs::write(
            &path,
            r#"{"cache_dir": "/var/cache/assetflow", "retry": {"base_delay_ms": 250}}"#,
        )
        .unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.cache_dir, Some(PathBuf::from("/var/cache/assetflow")));
        assert!(config.cache_enabled);
        assert_eq!(config.retry.base_delay_ms, 250);
        assert_eq!(config.retry.max_delay_ms, 300_000);
    }

    #[test]
    fn test_from_file_errors() {
        let tmp = TempDir::new().unwrap();
        let missing = EngineConfig::from_file(tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));

        let path = tmp.path().join("bad.json");
        fs::write(&path, "{").unwrap();
        let bad = EngineConfig::from_file(&path).unwrap_err();
        assert!(matches!(bad, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_overrides_apply() {
        let config = EngineConfig::default()
            .with_overrides(lookup(&[
                (CACHE_DIR_ENV, "/tmp/af"),
                (CACHE_ENABLED_ENV, "off"),
                (RETRY_BASE_ENV, "10"),
                (LOG_FORMAT_ENV, "json"),
            ]))
            .unwrap();

        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/af")));
        assert!(!config.cache_enabled);
        assert_eq!(config.retry.base_delay_ms, 10);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let err = EngineConfig::default()
            .with_overrides(lookup(&[(RETRY_BASE_ENV, "soon")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid value 'soon' for ASSETFLOW_RETRY_BASE_MS");
    }

    #[test]
    fn test_init_tracing_installs_once() {
        let config = EngineConfig::default()
            .with_overrides(lookup(&[(LOG_FORMAT_ENV, "compact")]))
            .unwrap();
        let _ = config.init_tracing();
        assert!(config.init_tracing().is_err());
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let config = EngineConfig::default().with_overrides(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
