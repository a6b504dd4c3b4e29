//! Configuration loading for the sync client.
//!
//! Settings are loaded from a TOML file. Every section and field is optional
//! and falls back to the defaults below.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sync_types::DAY_MILLIS;

/// Root settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncSettings {
    /// Local storage.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Sync scheduling.
    #[serde(default)]
    pub sync: ScheduleSettings,
    /// Tombstone retention.
    #[serde(default)]
    pub retention: RetentionSettings,
    /// Relay calls.
    #[serde(default)]
    pub relay: RelaySettings,
}

/// Local storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageSettings {
    /// Directory holding device state (default: platform data dir).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Sync scheduling settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScheduleSettings {
    /// Periodic sync interval in seconds; 0 disables the task (default: 300).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Run a full cycle when the engine starts (default: true).
    #[serde(default = "default_pull_on_startup")]
    pub pull_on_startup: bool,
}

/// Tombstone retention settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetentionSettings {
    /// Days a tombstone is kept before a local purge drops it (default: 30).
    #[serde(default = "default_tombstone_days")]
    pub tombstone_days: u64,
    /// Purge task interval in seconds; 0 disables the task (default: 1 day).
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
}

/// Relay call settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelaySettings {
    /// Per-call timeout in seconds (default: 15).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("dev", "keepsync", "keepsync")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".keepsync"))
}

fn default_interval_secs() -> u64 {
    300 // 5 minutes
}

fn default_pull_on_startup() -> bool {
    true
}

fn default_tombstone_days() -> u64 {
    30
}

fn default_purge_interval_secs() -> u64 {
    24 * 60 * 60 // 1 day
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            pull_on_startup: default_pull_on_startup(),
        }
    }
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            tombstone_days: default_tombstone_days(),
            purge_interval_secs: default_purge_interval_secs(),
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            storage: StorageSettings::default(),
            sync: ScheduleSettings::default(),
            retention: RetentionSettings::default(),
            relay: RelaySettings::default(),
        }
    }
}

impl ScheduleSettings {
    /// Periodic sync interval, or `None` when disabled.
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
    }
}

impl RetentionSettings {
    /// Retention window as a duration.
    pub fn tombstone_retention(&self) -> Duration {
        Duration::from_millis(self.tombstone_days.saturating_mul(DAY_MILLIS))
    }

    /// Purge task interval, or `None` when disabled.
    pub fn purge_interval(&self) -> Option<Duration> {
        (self.purge_interval_secs > 0).then(|| Duration::from_secs(self.purge_interval_secs))
    }
}

impl RelaySettings {
    /// Per-call relay timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SyncSettings {
    /// Load settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let settings: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse and validate settings from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            source: e,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would disable safety mechanisms.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retention.tombstone_days == 0 {
            return Err(ConfigError::Invalid(
                "retention.tombstone_days must be at least 1".into(),
            ));
        }
        if self.relay.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "relay.timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}
