pub mod event_bus;
pub mod events;
pub mod player;
pub mod position;
pub mod world_manager;

pub use event_bus::{Event, EventListener, EventNode, ListenerId};
pub use events::{
    PacketReceiveEvent, PlayerChangedWorldEvent, PlayerEvent, PlayerJoinEvent, PlayerMoveEvent, PlayerQuitEvent,
};
pub use player::Player;
pub use position::{ChunkPosition, Position, WorldId};
pub use world_manager::{World, WorldRegistry};
