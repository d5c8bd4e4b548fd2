use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error};

use crate::core::player::Player;
use crate::error::HologramError;
use crate::networking::packet::{InteractAction, InteractEntityPacket};

/// Callback run when a viewer attacks or interacts with a hologram.
pub type InteractionHandler = Arc<dyn Fn(&Arc<Player>) -> anyhow::Result<()> + Send + Sync>;

// Wrap a closure so it can be registered (and later removed by the same handle)
pub fn interaction_handler<F>(handler: F) -> InteractionHandler
where
    F: Fn(&Arc<Player>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(handler)
}

/// Set of handlers, deduplicated by identity.
///
/// Dispatch iterates a snapshot, so handlers may be added or removed while a dispatch is running.
#[derive(Default)]
pub struct HandlerSet {
    handlers: RwLock<Vec<InteractionHandler>>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    // false if this exact handler is already registered
    pub fn insert(&self, handler: InteractionHandler) -> bool {
        let mut handlers = self.handlers.write();
        if handlers.iter().any(|existing| Arc::ptr_eq(existing, &handler)) {
            return false;
        }
        handlers.push(handler);
        true
    }

    pub fn remove(&self, handler: &InteractionHandler) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|existing| !Arc::ptr_eq(existing, handler));
        handlers.len() != before
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    fn snapshot(&self) -> Vec<InteractionHandler> {
        self.handlers.read().clone()
    }

    /// Run every handler with `player`, in registration order. A failing handler stops the
    /// dispatch and its error is returned unchanged.
    pub fn dispatch(&self, player: &Arc<Player>) -> anyhow::Result<usize> {
        let handlers = self.snapshot();
        for handler in &handlers {
            handler(player)?;
        }
        Ok(handlers.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    // Entity id belongs to someone else
    Ignored,
    Attack { handlers: usize },
    Interact { handlers: usize },
}

/// Route one decoded interaction from `player`.
///
/// `owned` tells whether the referenced entity id belongs to the hologram doing the routing.
/// An action the protocol does not define is a programming error on the sending side and
/// comes back as [`HologramError::UnexpectedInteraction`].
pub fn route(
    packet: &InteractEntityPacket,
    owned: bool,
    player: &Arc<Player>,
    attack: &HandlerSet,
    interact: &HandlerSet,
) -> anyhow::Result<Routed> {
    if !owned {
        return Ok(Routed::Ignored);
    }

    let routed = match packet.action() {
        InteractAction::Attack => Routed::Attack {
            handlers: attack.dispatch(player)?,
        },
        InteractAction::Interact | InteractAction::InteractAt => Routed::Interact {
            handlers: interact.dispatch(player)?,
        },
        InteractAction::Unknown(action) => {
            error!(
                player = %player.name(),
                entity_id = packet.entity_id,
                action,
                "interaction with undefined action"
            );
            return Err(HologramError::UnexpectedInteraction {
                entity_id: packet.entity_id,
                action,
            }
            .into());
        }
    };
    debug!(player = %player.name(), entity_id = packet.entity_id, ?routed, "interaction routed");
    Ok(routed)
}
