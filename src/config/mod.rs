pub mod config_manager;

pub use config_manager::{ConfigurationError, ConfigurationManager, HologramConfig, HologramSettings};
