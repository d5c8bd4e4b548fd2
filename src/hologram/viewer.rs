use std::sync::{Arc, Weak};

use crate::core::event_bus::{EventListener, EventNode};
use crate::core::events::{
    PacketReceiveEvent, PlayerChangedWorldEvent, PlayerMoveEvent, PlayerQuitEvent, different_chunk,
};
use crate::core::player::Player;
use crate::hologram::HologramInner;
use crate::networking::packet::PacketType;

pub(crate) const VIEWER_NODE_NAME: &str = "hologram:player-update";

/// The rules tying one viewer's events to one hologram.
///
/// Lives as a child node of the player's event node while the subscription is held, and is
/// detached as a unit by [`ViewerSubscription::revoke`] or on drop.
pub(crate) struct ViewerSubscription {
    parent: Arc<EventNode>,
    node: Arc<EventNode>,
    revoked: bool,
}

impl ViewerSubscription {
    pub(crate) fn subscribe(hologram: Weak<HologramInner>, player: &Player) -> Self {
        let node = EventNode::new(VIEWER_NODE_NAME);

        // leave when moving out of range
        let weak = Weak::clone(&hologram);
        node.add_listener(
            EventListener::<PlayerMoveEvent>::builder()
                .ignore_cancelled(true)
                .filter(different_chunk)
                .handler(move |event| {
                    if let Some(hologram) = weak.upgrade() {
                        hologram.on_viewer_moved(event);
                    }
                    Ok(())
                }),
        );

        // leave on quit
        let weak = Weak::clone(&hologram);
        node.listen(move |event: &PlayerQuitEvent| {
            if let Some(hologram) = weak.upgrade() {
                hologram.on_viewer_left(&event.player);
            }
            Ok(())
        });

        // leave on world change
        let weak = Weak::clone(&hologram);
        node.listen(move |event: &PlayerChangedWorldEvent| {
            if let Some(hologram) = weak.upgrade() {
                hologram.on_viewer_left(&event.player);
            }
            Ok(())
        });

        // interactions with our entities
        let weak = hologram;
        node.add_listener(
            EventListener::<PacketReceiveEvent>::builder()
                .filter(|event| event.packet.packet_type == PacketType::InteractEntity)
                .handler(move |event| match weak.upgrade() {
                    Some(hologram) => hologram.on_viewer_packet(event),
                    None => Ok(()),
                }),
        );

        let parent = Arc::clone(player.event_node());
        parent.add_child(Arc::clone(&node));
        ViewerSubscription {
            parent,
            node,
            revoked: false,
        }
    }

    pub(crate) fn revoke(&mut self) {
        if !self.revoked {
            self.parent.remove_child(&self.node);
            self.revoked = true;
        }
    }

    pub(crate) fn rule_count(&self) -> usize {
        self.node.listener_count()
    }
}

impl Drop for ViewerSubscription {
    fn drop(&mut self) {
        self.revoke();
    }
}

pub(crate) struct ViewerEntry {
    pub(crate) player: Arc<Player>,
    pub(crate) subscription: ViewerSubscription,
}
