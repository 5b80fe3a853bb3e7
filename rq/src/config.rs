//! RequestQueue configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use recencycache::CacheConfig;
use serde::{Deserialize, Serialize};

use crate::queue::QueueConfig;
use crate::simulate::SimulationConfig;

/// Project-local config file name
const LOCAL_CONFIG: &str = ".requestqueue.yml";

/// Main configuration for the `rq` binary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Queue scheduling limits
    pub queue: QueueConfig,

    /// Result cache limits; caching is disabled when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,

    /// Synthetic workload used by `rq simulate`
    pub simulation: SimulationConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .requestqueue.yml
        let local_config = PathBuf::from(LOCAL_CONFIG);
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/requestqueue/requestqueue.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("requestqueue").join("requestqueue.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialised
    ///
    /// Errors are swallowed; the full load reports them later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|config| config.log_level)
    }

    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        self.queue.validate().context("Invalid queue configuration")?;
        self.simulation.validate().context("Invalid simulation configuration")?;
        Ok(())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.queue, QueueConfig::default());
        assert!(config.cache.is_none());
        assert!(config.log_level.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("rq.yml");
        fs::write(
            &path,
            "log-level: debug\nqueue:\n  concurrency-limit: 2\n  max-retry-times: 3\ncache:\n  max-item-count: 100\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.queue.concurrency_limit, 2);
        assert_eq!(config.queue.max_retry_times, 3);
        assert_eq!(config.queue.channel_buffer, 256);
        assert_eq!(config.cache, Some(CacheConfig::with_max_item_count(100)));
        assert_eq!(config.simulation, SimulationConfig::default());
    }

    #[test]
    fn test_load_explicit_file_missing() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("missing.yml");
        assert!(Config::load(Some(&path)).is_err());
        assert_eq!(Config::load_log_level(Some(&path)), None);
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("bad.yml");
        fs::write(&path, "queue: [not, a, map]\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    #[serial]
    fn test_load_project_local_config() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(LOCAL_CONFIG), "queue:\n  concurrency-limit: 9\n").unwrap();

        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(temp.path()).unwrap();
        let loaded = Config::load(None);
        std::env::set_current_dir(original).unwrap();

        assert_eq!(loaded.unwrap().queue.concurrency_limit, 9);
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.queue.concurrency_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_round_trip_yaml() {
        let config = Config {
            cache: Some(CacheConfig::new(10, 1024)),
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("concurrency-limit: 5"));
        assert!(yaml.contains("max-item-count: 10"));
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
