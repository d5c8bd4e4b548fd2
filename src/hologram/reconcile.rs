use std::sync::Arc;

use tracing::warn;

use crate::core::player::Player;
use crate::hologram::entity::{
    DisplayEntity, DisplayEntityFactory, EntityIdCounter, EntityIdentity, EntitySpec, RenderContext,
};
use crate::hologram::line::HologramLine;
use crate::networking::connection::TransportError;

pub(crate) struct ReconcileEnv<'a> {
    pub(crate) factory: &'a dyn DisplayEntityFactory,
    pub(crate) ids: &'a EntityIdCounter,
    pub(crate) vertical_spacing: f64,
    pub(crate) viewers: &'a [Arc<Player>],
    pub(crate) ctx: RenderContext<'a>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

/// Align `entities` with `lines`, index by index.
///
/// Existing entities get the new line and an update; missing ones are created at
/// `-spacing * index` and shown; every entity past the last line is hidden and dropped.
/// Afterwards `entities.len() == lines.len()`.
pub(crate) fn reconcile(
    entities: &mut Vec<Box<dyn DisplayEntity>>,
    lines: &[HologramLine],
    env: &ReconcileEnv<'_>,
) -> ReconcileSummary {
    let mut summary = ReconcileSummary::default();

    for (index, line) in lines.iter().enumerate() {
        if index < entities.len() {
            let entity = &mut entities[index];
            entity.set_line(line.clone());
            broadcast(env.viewers, "update", entity.identity(), |viewer| {
                entity.update(viewer, &env.ctx)
            });
            summary.updated += 1;
        } else {
            let entity = env.factory.create(EntitySpec {
                identity: EntityIdentity::allocate(env.ids),
                y_offset: -env.vertical_spacing * index as f64,
                line: line.clone(),
            });
            broadcast(env.viewers, "show", entity.identity(), |viewer| {
                entity.show(viewer, &env.ctx)
            });
            entities.push(entity);
            summary.created += 1;
        }
    }

    // A single leftover entity is removed as well
    for entity in entities.drain(lines.len()..) {
        broadcast(env.viewers, "hide", entity.identity(), |viewer| {
            entity.hide(viewer, &env.ctx)
        });
        summary.removed += 1;
    }

    summary
}

/// Send to every viewer; a failure is logged and only affects that viewer.
pub(crate) fn broadcast<F>(viewers: &[Arc<Player>], op: &str, identity: EntityIdentity, send: F)
where
    F: Fn(&Player) -> Result<(), TransportError>,
{
    for viewer in viewers {
        if let Err(err) = send(viewer) {
            warn!(
                player = %viewer.name(),
                entity_id = identity.entity_id,
                op,
                "display send failed: {}",
                err
            );
        }
    }
}
