//! Configuration file support for vialog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/vialog/config.toml`.

use crate::{Error, MassUnit, Result, StockThresholds};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub dosing: DosingConfig,

    #[serde(default)]
    pub stock: StockConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Dose entry configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct DosingConfig {
    /// Unit assumed when a dose is entered without one
    #[serde(default)]
    pub default_unit: MassUnit,
}

/// Stock level thresholds, in percent remaining
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StockConfig {
    #[serde(default = "default_low_percent")]
    pub low_percent: f64,

    #[serde(default = "default_medium_percent")]
    pub medium_percent: f64,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            low_percent: default_low_percent(),
            medium_percent: default_medium_percent(),
        }
    }
}

impl StockConfig {
    pub fn thresholds(&self) -> StockThresholds {
        StockThresholds {
            low_percent: self.low_percent,
            medium_percent: self.medium_percent,
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("vialog")
}

fn default_low_percent() -> f64 {
    20.0
}

fn default_medium_percent() -> f64 {
    50.0
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Check values that deserialize fine but make no sense
    pub fn validate(&self) -> Result<()> {
        let stock = &self.stock;
        if !(0.0..=100.0).contains(&stock.low_percent)
            || !(0.0..=100.0).contains(&stock.medium_percent)
        {
            return Err(Error::Config(
                "stock thresholds must be between 0 and 100".into(),
            ));
        }
        if stock.low_percent > stock.medium_percent {
            return Err(Error::Config(format!(
                "stock.low_percent ({}) must not exceed stock.medium_percent ({})",
                stock.low_percent, stock.medium_percent
            )));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("vialog").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
