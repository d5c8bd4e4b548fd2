//! Per-player holograms: multi-line floating displays that are shown to the players near them,
//! kept in sync with their lines, and that report attacks and interactions back to the owner.

pub mod config;
pub mod core;
pub mod error;
pub mod hologram;
pub mod networking;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::config::{ConfigurationManager, HologramConfig, HologramSettings};
pub use crate::core::{Player, Position, WorldId, WorldRegistry};
pub use error::HologramError;
pub use hologram::Hologram;
pub use hologram::entity::{AttachedEntity, DisplayEntity, DisplayEntityFactory};
pub use hologram::interaction::{InteractionHandler, interaction_handler};
pub use hologram::line::HologramLine;
pub use hologram::service::{HologramBuilder, HologramService};
