//! Configuration for the Cinder driver

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Driver configuration. Everything has a sane default; a missing
/// config file is not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Threat level at which the session burns, in (0, 1].
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Interval between threat evaluations (milliseconds).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Dead-man's switch inactivity window (seconds).
    #[serde(default = "default_deadman_timeout_secs")]
    pub deadman_timeout_secs: u64,

    /// Directory watched by the file-integrity sensor, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_dir: Option<PathBuf>,
}

fn default_threshold() -> f64 {
    0.9
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_deadman_timeout_secs() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            poll_interval_ms: default_poll_interval_ms(),
            deadman_timeout_secs: default_deadman_timeout_secs(),
            watch_dir: None,
        }
    }
}

impl Config {
    /// Default config file location (~/.config/cinder/config.json).
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("cinder")
            .join("config.json")
    }

    /// Load config from file, falling back to defaults if absent.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
