//! Configuration
//!
//! TOML config file with per-field defaults, loaded by the demo driver.
//! `EngineConfig` doubles as the engine's plain tuning-knob struct when the
//! engine is embedded directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Engine tuning knobs
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Days indexed eagerly on first access
    #[serde(default = "default_bootstrap_window_days")]
    pub bootstrap_window_days: u32,

    /// Days per backfill chunk when the caller does not override
    #[serde(default = "default_backfill_chunk_days")]
    pub backfill_chunk_days: u32,

    /// Records processed between cooperative yields during full scans
    #[serde(default = "default_scan_yield_every")]
    pub scan_yield_every: usize,
}

fn default_bootstrap_window_days() -> u32 {
    30
}

fn default_backfill_chunk_days() -> u32 {
    30
}

fn default_scan_yield_every() -> usize {
    256
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bootstrap_window_days: default_bootstrap_window_days(),
            backfill_chunk_days: default_backfill_chunk_days(),
            scan_yield_every: default_scan_yield_every(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "daydex=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Config {
    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load from a TOML file if it exists, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Resolved data directory: configured value or the platform default
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|p| p.join("daydex"))
                .unwrap_or_else(|| PathBuf::from("./daydex_data"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.engine.bootstrap_window_days, 30);
        assert_eq!(config.engine.backfill_chunk_days, 30);
        assert_eq!(config.engine.scan_yield_every, 256);
        assert_eq!(config.logging.level, "daydex=info");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            data_dir = "/tmp/daydex-test"

            [engine]
            backfill_chunk_days = 14
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.backfill_chunk_days, 14);
        assert_eq!(config.engine.bootstrap_window_days, 30);
        assert_eq!(config.resolved_data_dir(), PathBuf::from("/tmp/daydex-test"));
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "engine = 12").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }
}
