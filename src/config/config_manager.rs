// src/config/config_manager.rs

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::hologram::entity::DEFAULT_ENTITY_ID_START;

// Default values
pub fn default_log_filter() -> String {
    "hologram=info".to_string()
}

/// Per-hologram settings. New holograms start from the service's copy; each hologram can
/// change its own afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HologramSettings {
    // Subscribe nearby players automatically on spawn
    pub auto_viewable: bool,
    // In chunks
    pub view_distance: u32,
    // Blocks between two lines
    pub vertical_spacing: f64,
}

impl Default for HologramSettings {
    fn default() -> Self {
        HologramSettings {
            auto_viewable: true,
            view_distance: 4,
            vertical_spacing: 0.25,
        }
    }
}

impl HologramSettings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.vertical_spacing.is_finite() || self.vertical_spacing < 0.0 {
            return Err(ConfigurationError::InvalidVerticalSpacing(self.vertical_spacing));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HologramConfig {
    pub hologram: HologramSettings,
    // First numeric id handed to display entities
    pub entity_id_start: i32,
    pub log_filter: String,
}

impl Default for HologramConfig {
    fn default() -> Self {
        HologramConfig {
            hologram: HologramSettings::default(),
            entity_id_start: DEFAULT_ENTITY_ID_START,
            log_filter: default_log_filter(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to access config file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("vertical spacing must be a non-negative number, got {0}")]
    InvalidVerticalSpacing(f64),
    #[error("entity id start must be positive, got {0}")]
    InvalidEntityIdStart(i32),
    #[error("no config path set")]
    NoPath,
}

pub struct ConfigurationManager {
    current_config: HologramConfig,
    config_path: Option<PathBuf>,
}

impl ConfigurationManager {
    pub fn with_config(config: HologramConfig, config_path: Option<PathBuf>) -> Self {
        Self {
            current_config: config,
            config_path,
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigurationError> {
        let config: HologramConfig = toml::from_str(source)?;
        let manager = Self::with_config(config, None);
        manager.validate()?;
        Ok(manager)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let path_ref = path.as_ref();
        info!("Loading config from: {:?}", path_ref);
        let config_str = fs::read_to_string(path_ref)?;

        let mut manager = Self::from_toml_str(&config_str)?;
        manager.config_path = Some(path_ref.to_path_buf());
        Ok(manager)
    }

    // Fall back to defaults when the file is missing or broken
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_from_file(path.as_ref()) {
            Ok(manager) => manager,
            Err(e) => {
                warn!(
                    "Failed to load config from {:?}: {}. Using default configuration.",
                    path.as_ref(),
                    e
                );
                let mut manager = Self::default();
                manager.config_path = Some(path.as_ref().to_path_buf());
                manager
            }
        }
    }

    pub fn save_to_file(&self) -> Result<(), ConfigurationError> {
        let path = self.config_path.as_ref().ok_or(ConfigurationError::NoPath)?;
        info!("Saving config to: {:?}", path);
        let toml_string = toml::to_string_pretty(&self.current_config)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    pub fn set_config_path<P: AsRef<Path>>(&mut self, path: P) {
        self.config_path = Some(path.as_ref().to_path_buf());
    }

    pub fn update_config(&mut self, updates: HologramConfig) -> Result<(), ConfigurationError> {
        Self::check(&updates)?;
        self.current_config = updates;
        Ok(())
    }

    pub fn get_config(&self) -> &HologramConfig {
        &self.current_config
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        Self::check(&self.current_config)
    }

    fn check(config: &HologramConfig) -> Result<(), ConfigurationError> {
        config.hologram.validate()?;
        if config.entity_id_start <= 0 {
            return Err(ConfigurationError::InvalidEntityIdStart(config.entity_id_start));
        }
        Ok(())
    }
}

impl Default for ConfigurationManager {
    fn default() -> Self {
        Self::with_config(HologramConfig::default(), None)
    }
}
