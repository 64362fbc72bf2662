use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::media::ToolConfig;
use crate::settings::SettingsConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tool: ToolConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// Where inputs, outputs and remembered settings are kept
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root of the `input/` and `output/` directories
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// SQLite database holding the settings
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            database: default_database(),
        }
    }
}

impl StorageConfig {
    /// Database path, relative paths resolved against the root.
    pub fn database_path(&self) -> PathBuf {
        if self.database.is_absolute() {
            self.database.clone()
        } else {
            self.root.join(&self.database)
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("flare-data")
}

fn default_database() -> PathBuf {
    PathBuf::from("settings.db")
}

/// Task queue timeouts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// Timeout for one conversion (default: 1 hour)
    #[serde(default = "default_conversion_timeout")]
    pub conversion_timeout_secs: u64,
    /// Timeout for extracting one preview frame (default: 60 seconds)
    #[serde(default = "default_frame_timeout")]
    pub frame_timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            conversion_timeout_secs: default_conversion_timeout(),
            frame_timeout_secs: default_frame_timeout(),
        }
    }
}

impl QueueConfig {
    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.conversion_timeout_secs)
    }

    pub fn frame_timeout(&self) -> Duration {
        Duration::from_secs(self.frame_timeout_secs)
    }
}

fn default_conversion_timeout() -> u64 {
    3600
}

fn default_frame_timeout() -> u64 {
    60
}
