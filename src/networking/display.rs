use crate::core::player::Player;
use crate::hologram::entity::{
    DisplayEntity, DisplayEntityFactory, EntityIdentity, EntitySpec, RenderContext,
};
use crate::hologram::line::HologramLine;
use crate::networking::connection::TransportError;
use crate::networking::packet::ClientboundPacket;

/// Display entity factory that talks to viewers through their [`Connection`].
///
/// show = spawn + metadata, update = teleport + metadata, hide = destroy.
/// The entity sits at the anchor shifted down by its vertical offset.
///
/// [`Connection`]: crate::networking::connection::Connection
#[derive(Debug, Default, Clone, Copy)]
pub struct PacketDisplayFactory;

impl DisplayEntityFactory for PacketDisplayFactory {
    fn create(&self, spec: EntitySpec) -> Box<dyn DisplayEntity> {
        Box::new(PacketDisplayEntity {
            identity: spec.identity,
            y_offset: spec.y_offset,
            line: spec.line,
        })
    }
}

pub struct PacketDisplayEntity {
    identity: EntityIdentity,
    y_offset: f64,
    line: HologramLine,
}

impl PacketDisplayEntity {
    fn metadata(&self) -> ClientboundPacket {
        ClientboundPacket::EntityMetadata {
            entity_id: self.identity.entity_id,
            line: self.line.clone(),
        }
    }
}

impl DisplayEntity for PacketDisplayEntity {
    fn identity(&self) -> EntityIdentity {
        self.identity
    }

    fn y_offset(&self) -> f64 {
        self.y_offset
    }

    fn line(&self) -> &HologramLine {
        &self.line
    }

    fn set_line(&mut self, line: HologramLine) {
        self.line = line;
    }

    fn show(&self, viewer: &Player, ctx: &RenderContext<'_>) -> Result<(), TransportError> {
        let pos = ctx.anchor.offset(0.0, self.y_offset, 0.0);
        let connection = viewer.connection();
        connection.send(&ClientboundPacket::SpawnEntity {
            entity_id: self.identity.entity_id,
            uuid: self.identity.uuid,
            x: pos.x,
            y: pos.y,
            z: pos.z,
        })?;
        connection.send(&self.metadata())
    }

    fn update(&self, viewer: &Player, ctx: &RenderContext<'_>) -> Result<(), TransportError> {
        let pos = ctx.anchor.offset(0.0, self.y_offset, 0.0);
        let connection = viewer.connection();
        connection.send(&ClientboundPacket::TeleportEntity {
            entity_id: self.identity.entity_id,
            x: pos.x,
            y: pos.y,
            z: pos.z,
        })?;
        connection.send(&self.metadata())
    }

    fn hide(&self, viewer: &Player, _ctx: &RenderContext<'_>) -> Result<(), TransportError> {
        viewer.connection().send(&ClientboundPacket::DestroyEntities {
            entity_ids: vec![self.identity.entity_id],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::position::Position;
    use crate::hologram::entity::{EntityIdCounter, EntityIdentity};
    use crate::networking::connection::ChannelConnection;
    use crate::networking::packet::decode;
    use std::sync::Arc;
    use std::sync::mpsc::Receiver;

    fn drain(rx: &Receiver<Vec<u8>>) -> Vec<ClientboundPacket> {
        rx.try_iter().map(|bytes| decode(&bytes).unwrap()).collect()
    }

    #[test]
    fn show_update_hide_emit_packets_at_offset() {
        let (connection, rx) = ChannelConnection::new();
        let anchor = Position::new("world", 10.0, 70.0, -4.0);
        let viewer = Player::new("alex", anchor.clone(), Arc::new(connection));
        let identity = EntityIdentity::allocate(&EntityIdCounter::new(500));

        let mut entity = PacketDisplayFactory.create(EntitySpec {
            identity,
            y_offset: -0.5,
            line: HologramLine::text("Welcome"),
        });
        let ctx = RenderContext {
            anchor: &anchor,
            attached: None,
        };

        entity.show(&viewer, &ctx).unwrap();
        assert_eq!(
            drain(&rx),
            vec![
                ClientboundPacket::SpawnEntity {
                    entity_id: 500,
                    uuid: identity.uuid,
                    x: 10.0,
                    y: 69.5,
                    z: -4.0,
                },
                ClientboundPacket::EntityMetadata {
                    entity_id: 500,
                    line: HologramLine::text("Welcome"),
                },
            ]
        );

        entity.set_line(HologramLine::item("diamond"));
        entity.update(&viewer, &ctx).unwrap();
        let updated = drain(&rx);
        assert!(matches!(updated[0], ClientboundPacket::TeleportEntity { entity_id: 500, .. }));
        assert_eq!(
            updated[1],
            ClientboundPacket::EntityMetadata {
                entity_id: 500,
                line: HologramLine::item("diamond"),
            }
        );

        entity.hide(&viewer, &ctx).unwrap();
        assert_eq!(
            drain(&rx),
            vec![ClientboundPacket::DestroyEntities {
                entity_ids: vec![500]
            }]
        );
    }
}
