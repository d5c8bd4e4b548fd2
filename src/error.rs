use thiserror::Error;

use crate::config::config_manager::ConfigurationError;
use crate::core::position::WorldId;
use crate::networking::packet::PacketError;

#[derive(Debug, Error)]
pub enum HologramError {
    #[error("hologram position is not set")]
    MissingPosition,

    #[error("world '{0}' is not loaded")]
    UnknownWorld(WorldId),

    #[error("hologram position ({x}, {y}, {z}) is not a finite point")]
    InvalidPosition { x: f64, y: f64, z: f64 },

    #[error("hologram doesn't support cross world teleportation (anchored in '{expected}', requested '{requested}')")]
    CrossWorldRelocation { expected: WorldId, requested: WorldId },

    #[error("line index {index} out of bounds for {len} lines")]
    LineIndexOutOfBounds { index: usize, len: usize },

    #[error("hologram is not spawned")]
    NotSpawned,

    #[error("interaction with entity {entity_id} carried undefined action {action}")]
    UnexpectedInteraction { entity_id: i32, action: i32 },

    #[error(transparent)]
    Packet(#[from] PacketError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
