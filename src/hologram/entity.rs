use std::sync::atomic::{AtomicI32, Ordering};

use uuid::Uuid;

use crate::core::player::Player;
use crate::core::position::Position;
use crate::hologram::line::HologramLine;
use crate::networking::connection::TransportError;

pub const DEFAULT_ENTITY_ID_START: i32 = 1_000_000;

/// Identity a display entity keeps for its whole life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityIdentity {
    pub entity_id: i32,
    pub uuid: Uuid,
}

impl EntityIdentity {
    pub fn allocate(ids: &EntityIdCounter) -> Self {
        EntityIdentity {
            entity_id: ids.next(),
            uuid: Uuid::new_v4(),
        }
    }
}

// Numeric ids handed to synthetic entities; keep the range clear of the server's own ids
#[derive(Debug)]
pub struct EntityIdCounter {
    next: AtomicI32,
}

impl EntityIdCounter {
    pub fn new(start: i32) -> Self {
        EntityIdCounter {
            next: AtomicI32::new(start),
        }
    }

    pub fn next(&self) -> i32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for EntityIdCounter {
    fn default() -> Self {
        Self::new(DEFAULT_ENTITY_ID_START)
    }
}

/// Entity a hologram follows. Carried to the display entities as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachedEntity {
    pub entity_id: i32,
    pub uuid: Uuid,
}

// What a display entity needs from its hologram when it talks to a viewer
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub anchor: &'a Position,
    pub attached: Option<&'a AttachedEntity>,
}

pub struct EntitySpec {
    pub identity: EntityIdentity,
    pub y_offset: f64,
    pub line: HologramLine,
}

/// Client-side representation of one hologram line.
///
/// Each call targets a single viewer; a failed send only concerns that viewer.
pub trait DisplayEntity: Send + Sync {
    fn identity(&self) -> EntityIdentity;

    fn y_offset(&self) -> f64;

    fn line(&self) -> &HologramLine;

    fn set_line(&mut self, line: HologramLine);

    fn show(&self, viewer: &Player, ctx: &RenderContext<'_>) -> Result<(), TransportError>;

    fn update(&self, viewer: &Player, ctx: &RenderContext<'_>) -> Result<(), TransportError>;

    fn hide(&self, viewer: &Player, ctx: &RenderContext<'_>) -> Result<(), TransportError>;
}

pub trait DisplayEntityFactory: Send + Sync {
    fn create(&self, spec: EntitySpec) -> Box<dyn DisplayEntity>;
}
