//! Configuration management for opsift.

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on the worker pool size.
const MAX_WORKER_THREADS: usize = 64;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scan-related settings
    pub scan: ScanConfig,
    /// Built-in marker inspectors
    pub inspect: InspectConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigLoad(format!("Failed to read config file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config file: {}", e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigSave(format!("Failed to create config directory: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| Error::ConfigSave(format!("Failed to write config file: {}", e)))
    }

    /// Load configuration from default location, or create default if not exists.
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        if config_path.exists() {
            match Self::load(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    log::warn!("Failed to load config, using defaults: {}", e);
                }
            }
        }

        let config = Self::default();

        if let Err(e) = config.save(&config_path) {
            log::warn!("Failed to save default config: {}", e);
        }

        config
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        Self::data_dir().join("config.json")
    }

    /// Get the application data directory.
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("opsift")
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.scan.file_extensions.is_empty() {
            return Err(Error::ConfigInvalid {
                field: "scan.file_extensions".to_string(),
                message: "At least one extension is required".to_string(),
            });
        }

        if self.scan.worker_threads == 0 || self.scan.worker_threads > MAX_WORKER_THREADS {
            return Err(Error::ConfigInvalid {
                field: "scan.worker_threads".to_string(),
                message: format!("Must be between 1 and {}", MAX_WORKER_THREADS),
            });
        }

        if self.scan.report_interval_ms == 0 {
            return Err(Error::ConfigInvalid {
                field: "scan.report_interval_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Scan-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Extensions (without the dot) of files to search
    pub file_extensions: Vec<String>,
    /// Number of files decoded in parallel
    pub worker_threads: usize,
    /// Whether to follow symbolic links while enumerating
    pub follow_symlinks: bool,
    /// Milliseconds between progress reports
    pub report_interval_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            file_extensions: vec!["pcap".to_string(), "pcapng".to_string()],
            worker_threads: num_cpus().min(MAX_WORKER_THREADS),
            follow_symlinks: false,
            report_interval_ms: 250,
        }
    }
}

impl ScanConfig {
    /// Worker pool size, clamped to a sane range.
    pub fn workers(&self) -> usize {
        self.worker_threads.clamp(1, MAX_WORKER_THREADS)
    }

    /// Progress reporting period.
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms.max(1))
    }
}

/// Built-in marker inspector selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectConfig {
    /// Report every distinct message code seen in fragments
    pub message_census: bool,
    /// Game event codes (inside 0xF7B0 messages) to report
    pub game_events: Vec<u32>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Get the number of CPUs, with a reasonable default.
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scan.file_extensions, vec!["pcap", "pcapng"]);
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.inspect.game_events = vec![0x0147, 0x02BD];
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.scan.report_interval_ms, config.scan.report_interval_ms);
        assert_eq!(loaded.inspect.game_events, vec![0x0147, 0x02BD]);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = Config::default();
        config.scan.worker_threads = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scan.file_extensions.clear();
        assert!(matches!(
            config.validate(),
            Err(Error::ConfigInvalid { ref field, .. }) if field == "scan.file_extensions"
        ));

        let mut config = Config::default();
        config.scan.report_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"scan":{"file_extensions":["jsonl"]}}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.scan.file_extensions, vec!["jsonl"]);
        assert_eq!(config.scan.report_interval_ms, 250);
        assert_eq!(config.logging.log_level, "info");
    }

    #[test]
    fn test_workers_clamped() {
        let scan = ScanConfig {
            worker_threads: 1000,
            ..ScanConfig::default()
        };
        assert_eq!(scan.workers(), MAX_WORKER_THREADS);
    }
}
