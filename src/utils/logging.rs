use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::config_manager::HologramConfig;

/// Install a fmt subscriber filtered by `RUST_LOG`, or by `default_directive` when the variable
/// is unset or invalid.
///
/// Returns whether this call installed the global subscriber. Later calls leave the first one
/// in place and return false.
pub fn init_logging(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

// Same, with the directive taken from the loaded config
pub fn init_logging_from_config(config: &HologramConfig) -> bool {
    init_logging(&config.log_filter)
}
