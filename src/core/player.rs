use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::core::event_bus::EventNode;
use crate::core::position::{Position, WorldId};
use crate::networking::connection::Connection;

/// A connected client.
///
/// Identity is the player's UUID; two handles with the same id compare equal.
pub struct Player {
    id: Uuid,
    name: String,
    position: RwLock<Position>,
    connection: Arc<dyn Connection>,
    event_node: Arc<EventNode>,
}

impl Player {
    pub fn new(name: impl Into<String>, position: Position, connection: Arc<dyn Connection>) -> Arc<Self> {
        Self::with_id(Uuid::new_v4(), name, position, connection)
    }

    pub fn with_id(
        id: Uuid,
        name: impl Into<String>,
        position: Position,
        connection: Arc<dyn Connection>,
    ) -> Arc<Self> {
        let name = name.into();
        Arc::new(Player {
            id,
            event_node: EventNode::new(format!("player:{}", name)),
            name,
            position: RwLock::new(position),
            connection,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Position {
        self.position.read().clone()
    }

    pub fn world(&self) -> WorldId {
        self.position.read().world.clone()
    }

    // The host applies movement through the world registry so that move events fire first
    pub(crate) fn set_position(&self, position: Position) {
        *self.position.write() = position;
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    pub fn event_node(&self) -> &Arc<EventNode> {
        &self.event_node
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Player {}

impl Hash for Player {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
