//! Configuration module for stream-replay
//!
//! This module handles replay configuration:
//! - Outlet tuning handed to the sink (chunk size, buffer duration)
//! - Pacing, speed and timestamp mode of the replay scheduler
//! - Emission retry policy
//! - Policy for streams with malformed metadata
//! - Logging
//!
//! # Config Location
//!
//! The configuration is read from `replay.toml` in the platform-appropriate
//! config directory under `dev.stream-replay`:
//! - **Linux**: `~/.config/dev.stream-replay/`
//! - **macOS**: `~/Library/Application Support/dev.stream-replay/`
//! - **Windows**: `%APPDATA%\dev.stream-replay\`
//!
//! A missing file means defaults.
//!
//! # Example
//!
//! ```toml
//! countdown_secs = 3
//! invalid_stream_policy = "abort"
//!
//! [outlet]
//! chunk_size = 1
//!
//! [pacing]
//! strategy = "busy_poll"
//! speed = 2.0
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{ReplayError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.stream-replay";

/// Config filename
pub const CONFIG_FILE: &str = "replay.toml";

/// Recording replayed when no path is given
pub const DEFAULT_RECORDING: &str = "SampleData.json";

/// Default countdown before replay starts, in seconds
pub const DEFAULT_COUNTDOWN_SECS: u32 = 10;

/// Get the path of the config file
pub fn config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

/// What to do with a stream whose metadata cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvalidStreamPolicy {
    /// Leave the stream out of the replay and continue with the rest
    #[default]
    Skip,
    /// Fail before anything is replayed
    Abort,
}

/// Complete replay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Countdown before the first event, in whole seconds
    pub countdown_secs: u32,
    /// Handling of streams with malformed metadata
    pub invalid_stream_policy: InvalidStreamPolicy,
    /// Treat unsupported descriptor shapes as metadata errors
    pub strict_descriptors: bool,
    /// Outlet tuning
    pub outlet: OutletSettings,
    /// Pacing
    pub pacing: PacingSettings,
    /// Emission retries
    pub retry: RetrySettings,
    /// Logging
    pub logging: LoggingSettings,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            invalid_stream_policy: InvalidStreamPolicy::Skip,
            strict_descriptors: false,
            outlet: OutletSettings::default(),
            pacing: PacingSettings::default(),
            retry: RetrySettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl ReplayConfig {
    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReplayError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            ReplayError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config from the default location
    ///
    /// A missing file yields defaults; a broken one is logged and ignored.
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ReplayError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ReplayError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            ReplayError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.outlet.chunk_size == 0 {
            return Err(ReplayError::Config("outlet.chunk_size must be at least 1".into()));
        }
        if self.outlet.max_buffer_secs == 0 {
            return Err(ReplayError::Config(
                "outlet.max_buffer_secs must be at least 1".into(),
            ));
        }
        let speed = self.pacing.speed;
        if !speed.is_finite() || !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(ReplayError::Config(format!(
                "pacing.speed must be between {} and {}, got {}",
                MIN_SPEED, MAX_SPEED, speed
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(ReplayError::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ReplayError::Config(
                "retry.initial_backoff_ms exceeds retry.max_backoff_ms".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ReplayConfig::default();
        assert_eq!(config.countdown_secs, 10);
        assert_eq!(config.invalid_stream_policy, InvalidStreamPolicy::Skip);
        assert_eq!(config.outlet.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.pacing.strategy, PacingStrategy::Hybrid);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ReplayConfig = toml::from_str(
            r#"
            countdown_secs = 0
            invalid_stream_policy = "abort"

            [pacing]
            strategy = "busy_poll"
            timestamp_mode = "latency_corrected"
            "#,
        )
        .unwrap();

        assert_eq!(config.countdown_secs, 0);
        assert_eq!(config.invalid_stream_policy, InvalidStreamPolicy::Abort);
        assert_eq!(config.pacing.strategy, PacingStrategy::BusyPoll);
        assert_eq!(config.pacing.timestamp_mode, TimestampMode::LatencyCorrected);
        assert_eq!(config.pacing.speed, 1.0);
        assert_eq!(config.outlet, OutletSettings::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ReplayConfig::default();
        config.outlet.chunk_size = 0;
        assert!(matches!(config.validate(), Err(ReplayError::Config(_))));

        let mut config = ReplayConfig::default();
        config.pacing.speed = 50.0;
        assert!(config.validate().is_err());

        let mut config = ReplayConfig::default();
        config.retry.initial_backoff_ms = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = ReplayConfig::default();
        config.countdown_secs = 3;
        config.pacing = config.pacing.with_speed(2.0);
        config.logging.directory = Some(dir.path().join("logs"));
        config.save(&path).unwrap();

        let loaded = ReplayConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReplayConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ReplayError::Config(_)));
    }
}
