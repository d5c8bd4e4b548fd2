use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// Blocks per chunk edge is 16, so a chunk coordinate is the block coordinate shifted by 4
pub const CHUNK_SHIFT: i32 = 4;

// Name of a loaded world
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldId(Arc<str>);

impl WorldId {
    pub fn new(name: impl AsRef<str>) -> Self {
        WorldId(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorldId {
    fn from(name: &str) -> Self {
        WorldId::new(name)
    }
}

impl From<String> for WorldId {
    fn from(name: String) -> Self {
        WorldId::new(name)
    }
}

// Unique identifier for a chunk based on its position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPosition {
    pub x: i32,
    pub z: i32,
}

impl ChunkPosition {
    pub fn new(x: i32, z: i32) -> Self {
        ChunkPosition { x, z }
    }

    // Euclidean distance in chunk units
    pub fn distance(&self, other: &ChunkPosition) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dz = f64::from(self.z) - f64::from(other.z);
        (dx * dx + dz * dz).sqrt()
    }
}

/// A point in a world, in block units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub world: WorldId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(world: impl Into<WorldId>, x: f64, y: f64, z: f64) -> Self {
        Position {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    pub fn chunk_x(&self) -> i32 {
        (self.x.floor() as i32) >> CHUNK_SHIFT
    }

    pub fn chunk_z(&self) -> i32 {
        (self.z.floor() as i32) >> CHUNK_SHIFT
    }

    pub fn chunk(&self) -> ChunkPosition {
        ChunkPosition::new(self.chunk_x(), self.chunk_z())
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Position {
        Position {
            world: self.world.clone(),
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }
}
