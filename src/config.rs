//! Configuration loading and management
//!
//! Handles parsing of the homedo `config.toml`. Every key is optional.
//!
//! ```toml
//! [store]
//! path = "/var/lib/homedo/homedo.db"
//!
//! [history]
//! max_per_task = 20
//!
//! [publish]
//! upcoming_days = 7
//! debounce_ms = 500
//! destination = "-"
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::history::MAX_HISTORY_PER_TASK;

/// Name of the config file inside the platform config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Name of the database file inside the platform data directory
pub const DATABASE_FILE: &str = "homedo.db";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Record store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Field history configuration
    #[serde(default)]
    pub history: HistoryConfig,

    /// Upcoming-task publishing configuration
    #[serde(default)]
    pub publish: PublishConfig,
}

/// Record store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database path (defaults to the platform data directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Field history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Records retained per task
    #[serde(default = "default_max_per_task")]
    pub max_per_task: usize,
}

fn default_max_per_task() -> usize {
    MAX_HISTORY_PER_TASK
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_per_task: default_max_per_task(),
        }
    }
}

/// Upcoming-task publishing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Horizon for the upcoming list, in days from today
    #[serde(default = "default_upcoming_days")]
    pub upcoming_days: u32,

    /// Quiet period before a burst of changes is published
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// `-` for stdout or a file path; unset disables publishing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

fn default_upcoming_days() -> u32 {
    7
}

fn default_debounce_ms() -> u64 {
    500
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            upcoming_days: default_upcoming_days(),
            debounce_ms: default_debounce_ms(),
            destination: None,
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

    /// Load configuration from `path`, or return defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Database path, falling back to the platform data directory
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.store.path {
            return Ok(path.clone());
        }
        let dirs = project_dirs()?;
        Ok(dirs.data_dir().join(DATABASE_FILE))
    }

    fn validate(&self) -> Result<()> {
        self.history.validate()?;
        self.publish.validate()?;
        Ok(())
    }
}

impl HistoryConfig {
    fn validate(&self) -> Result<()> {
        if self.max_per_task == 0 {
            return Err(Error::InvalidConfig(
                "history.max_per_task must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl PublishConfig {
    fn validate(&self) -> Result<()> {
        if self.upcoming_days == 0 {
            return Err(Error::InvalidConfig(
                "publish.upcoming_days must be >= 1".to_string(),
            ));
        }
        if let Some(destination) = &self.destination {
            if destination.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "publish.destination cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Default config file location in the platform config directory
pub fn default_config_path() -> Result<PathBuf> {
    let dirs = project_dirs()?;
    Ok(dirs.config_dir().join(CONFIG_FILE))
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "homedo").ok_or_else(|| {
        Error::InvalidConfig("cannot determine a home directory for homedo".to_string())
    })
}
