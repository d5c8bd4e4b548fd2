use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::event_bus::Event;
use crate::core::player::Player;
use crate::core::position::{Position, WorldId};
use crate::networking::packet::InboundPacket;

// Events that belong to a single player
pub trait PlayerEvent: Event {
    fn player(&self) -> &Arc<Player>;
}

#[derive(Debug)]
pub struct PlayerJoinEvent {
    pub player: Arc<Player>,
}

#[derive(Debug)]
pub struct PlayerQuitEvent {
    pub player: Arc<Player>,
}

/// Fired before the player's position is updated; `from` is where the player still is.
#[derive(Debug)]
pub struct PlayerMoveEvent {
    pub player: Arc<Player>,
    pub from: Position,
    pub to: Position,
    cancelled: AtomicBool,
}

impl PlayerMoveEvent {
    pub fn new(player: Arc<Player>, from: Position, to: Position) -> Self {
        PlayerMoveEvent {
            player,
            from,
            to,
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn changed_chunk(&self) -> bool {
        self.from.world != self.to.world || self.from.chunk() != self.to.chunk()
    }
}

// Fired after the player arrived in the new world
#[derive(Debug)]
pub struct PlayerChangedWorldEvent {
    pub player: Arc<Player>,
    pub from: WorldId,
}

#[derive(Debug)]
pub struct PacketReceiveEvent {
    pub player: Arc<Player>,
    pub packet: InboundPacket,
}

impl Event for PlayerJoinEvent {}
impl Event for PlayerQuitEvent {}
impl Event for PlayerChangedWorldEvent {}
impl Event for PacketReceiveEvent {}

impl Event for PlayerMoveEvent {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl PlayerEvent for PlayerJoinEvent {
    fn player(&self) -> &Arc<Player> {
        &self.player
    }
}

impl PlayerEvent for PlayerQuitEvent {
    fn player(&self) -> &Arc<Player> {
        &self.player
    }
}

impl PlayerEvent for PlayerMoveEvent {
    fn player(&self) -> &Arc<Player> {
        &self.player
    }
}

impl PlayerEvent for PlayerChangedWorldEvent {
    fn player(&self) -> &Arc<Player> {
        &self.player
    }
}

impl PlayerEvent for PacketReceiveEvent {
    fn player(&self) -> &Arc<Player> {
        &self.player
    }
}

/// Listener filter: only moves that cross a chunk border.
pub fn different_chunk(event: &PlayerMoveEvent) -> bool {
    event.changed_chunk()
}
