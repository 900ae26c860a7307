//! Athlete profile and application configuration.
//!
//! Configuration is stored as TOML. The host edits it; the session reads the
//! latest value at every sample.

use crate::alerts::AlertSettings;
use crate::climbs::DetectionSettings;
use crate::metrics::pacing::PacingSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fraction of FTP used as critical power when no CP is configured.
const CP_FROM_FTP: f64 = 0.95;

/// Athlete physiology and equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AthleteProfile {
    /// Functional Threshold Power in watts
    pub ftp: u16,
    /// Rider weight in kilograms
    pub weight_kg: f64,
    /// Anaerobic work capacity in joules
    pub w_prime_max: f64,
    /// Drag coefficient times frontal area (m²)
    pub cda: f64,
    /// Rolling resistance coefficient
    pub crr: f64,
    /// Bike weight in kilograms
    pub bike_weight_kg: f64,
    /// Critical power in watts (0 = derive from FTP)
    pub cp: u16,
}

impl Default for AthleteProfile {
    fn default() -> Self {
        Self {
            ftp: 0,
            weight_kg: 0.0,
            w_prime_max: 20_000.0,
            cda: 0.321,
            crr: 0.005,
            bike_weight_kg: 8.0,
            cp: 0,
        }
    }
}

impl AthleteProfile {
    /// Critical power, falling back to 95% of FTP.
    pub fn effective_cp(&self) -> f64 {
        if self.cp > 0 {
            self.cp as f64
        } else {
            self.ftp as f64 * CP_FROM_FTP
        }
    }

    /// Engines no-op until FTP and weight are set.
    pub fn is_configured(&self) -> bool {
        self.ftp > 0 && self.weight_kg > 0.0
    }

    /// Rider plus bike mass.
    pub fn total_mass_kg(&self) -> f64 {
        self.weight_kg + self.bike_weight_kg
    }

    /// Validate FTP value (50-600 watts).
    pub fn validate_ftp(ftp: u16) -> bool {
        (50..=600).contains(&ftp)
    }

    /// Validate weight value (30-200 kg).
    pub fn validate_weight(weight: f64) -> bool {
        (30.0..=200.0).contains(&weight)
    }

    /// Check the values that are set. Zero means not set yet.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ftp != 0 && !Self::validate_ftp(self.ftp) {
            return Err(ConfigError::InvalidValue(format!("ftp {} outside 50-600 W", self.ftp)));
        }
        if self.weight_kg != 0.0 && !Self::validate_weight(self.weight_kg) {
            return Err(ConfigError::InvalidValue(format!(
                "weight {} outside 30-200 kg",
                self.weight_kg
            )));
        }
        Ok(())
    }
}

/// Checkpoint timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointSettings {
    /// Interval between periodic checkpoints in seconds
    pub interval_secs: u64,
    /// Checkpoints older than this are discarded on restore
    pub max_age_secs: u64,
}

impl Default for CheckpointSettings {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            max_age_secs: 2 * 60 * 60,
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Database file name inside the data directory
    pub database_file: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_file: "climbwise.db".to_string(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Athlete profile
    pub athlete: AthleteProfile,
    /// Climb detection thresholds
    pub detection: DetectionSettings,
    /// Pacing mode and tolerance
    pub pacing: PacingSettings,
    /// Alert toggles and thresholds
    pub alerts: AlertSettings,
    /// Checkpoint timing
    pub checkpoint: CheckpointSettings,
    /// Storage settings
    pub storage: StorageSettings,
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "climbwise", "Climbwise")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the default configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load configuration from `path`, falling back to defaults if it is missing.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        tracing::info!("No config at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    config.athlete.validate()?;

    Ok(config)
}

/// Save configuration to `path`.
pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
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

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
