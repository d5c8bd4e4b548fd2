use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::event_bus::{Event, EventNode};
use crate::core::events::{
    PacketReceiveEvent, PlayerChangedWorldEvent, PlayerEvent, PlayerJoinEvent, PlayerMoveEvent,
    PlayerQuitEvent,
};
use crate::core::player::Player;
use crate::core::position::{Position, WorldId};
use crate::networking::packet::InboundPacket;

/// A loaded world: its players and the event node every player event in it passes through.
pub struct World {
    id: WorldId,
    event_node: Arc<EventNode>,
    players: DashMap<Uuid, Arc<Player>>,
}

impl World {
    pub fn new(id: impl Into<WorldId>) -> Arc<Self> {
        let id = id.into();
        Arc::new(World {
            event_node: EventNode::new(format!("world:{}", id)),
            id,
            players: DashMap::new(),
        })
    }

    pub fn id(&self) -> &WorldId {
        &self.id
    }

    pub fn event_node(&self) -> &Arc<EventNode> {
        &self.event_node
    }

    // Snapshot of the players currently in this world
    pub fn players(&self) -> Vec<Arc<Player>> {
        self.players.iter().map(|entry| Arc::clone(entry.value())).collect()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn contains_player(&self, id: &Uuid) -> bool {
        self.players.contains_key(id)
    }

    fn insert_player(&self, player: Arc<Player>) {
        self.players.insert(player.id(), player);
    }

    fn remove_player(&self, id: &Uuid) -> Option<Arc<Player>> {
        self.players.remove(id).map(|(_, player)| player)
    }
}

/// Registry of loaded worlds.
///
/// It is also the host-side entry point for player activity: every method that changes a
/// player's presence fires the matching event on the player's world node and then on the
/// player's own node. Errors returned are listener failures, handed to the caller untouched.
#[derive(Default)]
pub struct WorldRegistry {
    worlds: DashMap<WorldId, Arc<World>>,
}

impl WorldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, world: Arc<World>) -> Arc<World> {
        info!(world = %world.id(), "world registered");
        self.worlds.insert(world.id().clone(), Arc::clone(&world));
        world
    }

    pub fn get(&self, id: &WorldId) -> Option<Arc<World>> {
        self.worlds.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn get_or_create(&self, id: impl Into<WorldId>) -> Arc<World> {
        let id = id.into();
        self.worlds
            .entry(id.clone())
            .or_insert_with(|| World::new(id))
            .value()
            .clone()
    }

    pub fn unload(&self, id: &WorldId) -> Option<Arc<World>> {
        let removed = self.worlds.remove(id).map(|(_, world)| world);
        if removed.is_some() {
            info!(world = %id, "world unloaded");
        }
        removed
    }

    pub fn all(&self) -> Vec<Arc<World>> {
        self.worlds.iter().map(|entry| Arc::clone(entry.value())).collect()
    }

    // Player enters the world named by its current position
    pub fn join(&self, player: &Arc<Player>) -> anyhow::Result<()> {
        let world = self.get_or_create(player.world());
        world.insert_player(Arc::clone(player));
        debug!(player = %player.name(), world = %world.id(), "player joined");
        self.dispatch(&PlayerJoinEvent {
            player: Arc::clone(player),
        })
    }

    pub fn quit(&self, player: &Arc<Player>) -> anyhow::Result<()> {
        let result = self.dispatch(&PlayerQuitEvent {
            player: Arc::clone(player),
        });
        if let Some(world) = self.get(&player.world()) {
            world.remove_player(&player.id());
        }
        debug!(player = %player.name(), "player quit");
        result
    }

    /// Move a player inside its current world.
    ///
    /// The move event fires before the position changes. Returns whether the move was applied,
    /// i.e. no listener cancelled it. A destination in another world goes through
    /// [`WorldRegistry::change_world`].
    pub fn move_player(&self, player: &Arc<Player>, to: Position) -> anyhow::Result<bool> {
        let from = player.position();
        if from.world != to.world {
            self.change_world(player, to)?;
            return Ok(true);
        }

        let event = PlayerMoveEvent::new(Arc::clone(player), from, to);
        let result = self.dispatch(&event);
        if event.is_cancelled() {
            return result.map(|_| false);
        }
        player.set_position(event.to.clone());
        result.map(|_| true)
    }

    pub fn change_world(&self, player: &Arc<Player>, to: Position) -> anyhow::Result<()> {
        let from = player.world();
        if let Some(old) = self.get(&from) {
            old.remove_player(&player.id());
        }
        let target = self.get_or_create(to.world.clone());
        player.set_position(to);
        target.insert_player(Arc::clone(player));
        debug!(player = %player.name(), from = %from, to = %target.id(), "player changed world");

        self.dispatch(&PlayerChangedWorldEvent {
            player: Arc::clone(player),
            from,
        })
    }

    pub fn receive_packet(&self, player: &Arc<Player>, packet: InboundPacket) -> anyhow::Result<()> {
        self.dispatch(&PacketReceiveEvent {
            player: Arc::clone(player),
            packet,
        })
    }

    // World node first, then the player's own node
    fn dispatch<E: PlayerEvent>(&self, event: &E) -> anyhow::Result<()> {
        let player = event.player();
        let world_result = match self.get(&player.world()) {
            Some(world) => world.event_node().call(event),
            None => Ok(()),
        };
        let player_result = player.event_node().call(event);
        world_result.and(player_result)
    }
}
