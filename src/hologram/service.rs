use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::config_manager::{HologramConfig, HologramSettings};
use crate::core::position::Position;
use crate::core::world_manager::WorldRegistry;
use crate::error::HologramError;
use crate::hologram::Hologram;
use crate::hologram::entity::{AttachedEntity, DisplayEntityFactory, EntityIdCounter};
use crate::hologram::interaction::InteractionHandler;
use crate::hologram::line::HologramLine;

/// Creates holograms and keeps track of them.
///
/// Owns what every hologram shares: the world registry, the display factory, the entity id
/// counter and the default settings.
pub struct HologramService {
    worlds: Arc<WorldRegistry>,
    factory: Arc<dyn DisplayEntityFactory>,
    ids: Arc<EntityIdCounter>,
    defaults: HologramSettings,
    holograms: DashMap<Uuid, Hologram>,
}

impl HologramService {
    pub fn new(
        worlds: Arc<WorldRegistry>,
        factory: Arc<dyn DisplayEntityFactory>,
        config: &HologramConfig,
    ) -> Self {
        HologramService {
            worlds,
            factory,
            ids: Arc::new(EntityIdCounter::new(config.entity_id_start)),
            defaults: config.hologram.clone(),
            holograms: DashMap::new(),
        }
    }

    pub fn worlds(&self) -> &Arc<WorldRegistry> {
        &self.worlds
    }

    pub fn defaults(&self) -> &HologramSettings {
        &self.defaults
    }

    pub fn builder(&self) -> HologramBuilder<'_> {
        HologramBuilder {
            service: self,
            position: None,
            lines: Vec::new(),
            settings: self.defaults.clone(),
            attached: None,
            attack_handlers: Vec::new(),
            interact_handlers: Vec::new(),
        }
    }

    // Not spawned, no lines, default settings
    pub fn create(&self, position: Position) -> Result<Hologram, HologramError> {
        self.builder().position(position).build()
    }

    pub fn get(&self, id: &Uuid) -> Option<Hologram> {
        self.holograms.get(id).map(|entry| entry.value().clone())
    }

    pub fn holograms(&self) -> Vec<Hologram> {
        self.holograms.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.holograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holograms.is_empty()
    }

    // Removes the hologram from the world as well
    pub fn unregister(&self, id: &Uuid) -> Option<Hologram> {
        let (_, hologram) = self.holograms.remove(id)?;
        hologram.remove();
        debug!(hologram = %id, "hologram unregistered");
        Some(hologram)
    }

    /// Remove every tracked hologram and forget them.
    pub fn shutdown(&self) {
        let ids: Vec<Uuid> = self.holograms.iter().map(|entry| *entry.key()).collect();
        for id in &ids {
            self.unregister(id);
        }
        info!(holograms = ids.len(), "hologram service shut down");
    }
}

pub struct HologramBuilder<'a> {
    service: &'a HologramService,
    position: Option<Position>,
    lines: Vec<HologramLine>,
    settings: HologramSettings,
    attached: Option<AttachedEntity>,
    attack_handlers: Vec<InteractionHandler>,
    interact_handlers: Vec<InteractionHandler>,
}

impl<'a> HologramBuilder<'a> {
    pub fn position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn line(mut self, line: impl Into<HologramLine>) -> Self {
        self.lines.push(line.into());
        self
    }

    pub fn lines<I, L>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<HologramLine>,
    {
        self.lines.extend(lines.into_iter().map(Into::into));
        self
    }

    pub fn auto_viewable(mut self, auto_viewable: bool) -> Self {
        self.settings.auto_viewable = auto_viewable;
        self
    }

    pub fn view_distance(mut self, view_distance: u32) -> Self {
        self.settings.view_distance = view_distance;
        self
    }

    pub fn vertical_spacing(mut self, vertical_spacing: f64) -> Self {
        self.settings.vertical_spacing = vertical_spacing;
        self
    }

    pub fn attach(mut self, entity: AttachedEntity) -> Self {
        self.attached = Some(entity);
        self
    }

    pub fn attack_handler(mut self, handler: InteractionHandler) -> Self {
        self.attack_handlers.push(handler);
        self
    }

    pub fn interact_handler(mut self, handler: InteractionHandler) -> Self {
        self.interact_handlers.push(handler);
        self
    }

    /// Create the hologram (not spawned) and register it with the service.
    pub fn build(self) -> Result<Hologram, HologramError> {
        let position = self.position.ok_or(HologramError::MissingPosition)?;
        let world = self
            .service
            .worlds
            .get(&position.world)
            .ok_or_else(|| HologramError::UnknownWorld(position.world.clone()))?;
        self.settings.validate()?;

        let hologram = Hologram::new(
            world,
            Arc::clone(&self.service.factory),
            Arc::clone(&self.service.ids),
            position,
            self.settings,
        );
        if !self.lines.is_empty() {
            hologram.set_lines(self.lines);
        }
        if self.attached.is_some() {
            hologram.attach(self.attached);
        }
        for handler in self.attack_handlers {
            hologram.attack_handler(handler);
        }
        for handler in self.interact_handlers {
            hologram.interact_handler(handler);
        }

        self.service.holograms.insert(hologram.id(), hologram.clone());
        debug!(hologram = %hologram.id(), world = %hologram.world().id(), "hologram created");
        Ok(hologram)
    }
}
