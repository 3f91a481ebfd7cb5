//! Application configuration.
//!
//! Stored as TOML in the platform data directory. A missing file yields the
//! defaults (US reset schedule, `vaulttrack.db`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::period::{Region, ResetSchedule};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application version
    pub version: String,
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Tracker settings
    #[serde(default)]
    pub tracker: TrackerSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::new(),
            tracker: TrackerSettings::default(),
        }
    }
}

impl AppConfig {
    /// Reset schedule in effect: the explicit override, else the region preset.
    pub fn reset_schedule(&self) -> ResetSchedule {
        self.tracker
            .reset_override
            .unwrap_or_else(|| ResetSchedule::for_region(self.tracker.region))
    }

    /// Full path of the backing database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.tracker.database_file)
    }
}

/// Tracker-related settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerSettings {
    /// Server region, selects the reset preset
    pub region: Region,
    /// Explicit reset weekday/hour, takes precedence over the region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_override: Option<ResetSchedule>,
    /// Database file name inside the data directory
    pub database_file: String,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            region: Region::default(),
            reset_override: None,
            database_file: "vaulttrack.db".to_string(),
        }
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "vaulttrack", "VaultTrack")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load application configuration from the default location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let mut config = load_config_from(&get_config_path())?;
    config.data_dir = get_data_dir();
    Ok(config)
}

/// Load configuration from `path`, falling back to defaults if it is absent.
///
/// `data_dir` is set to the file's parent directory.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let data_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(AppConfig {
            data_dir,
            ..Default::default()
        });
    }

    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let mut config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    if let Some(schedule) = config.tracker.reset_override {
        ResetSchedule::new(schedule.weekday, schedule.hour_utc)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
    }

    config.data_dir = data_dir;
    Ok(config)
}

/// Save application configuration to the default location.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &get_config_path())
}

/// Save application configuration to `path`.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
