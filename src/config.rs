//! Configuration loading and management
//!
//! Handles parsing of `config.toml` in the data directory. Every key is
//! optional; missing tables and fields fall back to their defaults.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::urgency::UrgencyCoefficients;

/// Name of the config file inside the data directory
pub const CONFIG_FILE: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Urgency coefficients
    #[serde(default)]
    pub urgency: UrgencyCoefficients,

    /// Edit history behaviour
    #[serde(default)]
    pub history: HistoryConfig,

    /// Due-date reminders
    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// Task file storage
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Edit history configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Merge consecutive description edits into one undo step
    #[serde(default)]
    pub coalesce_description: bool,
}

/// Reminder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minutes before the due date to fire
    #[serde(default)]
    pub lead_minutes: u32,
}

fn default_true() -> bool {
    true
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lead_minutes: 0,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// How long to wait for the task file lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    crate::lock::DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `config.toml` from `data_dir`, or return defaults if absent
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.urgency.validate()?;
        if self.storage.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "storage.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.notifications.lead_minutes > 7 * 24 * 60 {
            return Err(Error::InvalidConfig(
                "notifications.lead_minutes must be at most one week".to_string(),
            ));
        }
        Ok(())
    }
}

/// Pick the data directory: an explicit path wins, else the platform
/// data dir for taskdeck.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    ProjectDirs::from("", "", "taskdeck")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::InvalidConfig(
                "could not determine a data directory; pass --data-dir or set TASKDECK_DIR"
                    .to_string(),
            )
        })
}
