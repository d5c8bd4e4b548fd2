pub mod entity;
pub mod interaction;
pub mod line;
pub mod proximity;
pub(crate) mod reconcile;
pub mod service;
pub(crate) mod viewer;


use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::config_manager::HologramSettings;
use crate::core::event_bus::{EventListener, EventNode};
use crate::core::events::{PacketReceiveEvent, PlayerJoinEvent, PlayerMoveEvent, different_chunk};
use crate::core::player::Player;
use crate::core::position::Position;
use crate::core::world_manager::World;
use crate::error::HologramError;

use self::entity::{AttachedEntity, DisplayEntity, DisplayEntityFactory, EntityIdCounter, EntityIdentity, RenderContext};
use self::interaction::{HandlerSet, InteractionHandler};
use self::line::HologramLine;
use self::proximity::is_in_range;
use self::reconcile::{ReconcileEnv, broadcast};
use self::viewer::{ViewerEntry, ViewerSubscription};

pub(crate) const NEARBY_NODE_NAME: &str = "hologram:nearby";

/// A multi-line display anchored in a world and shown only to the players subscribed to it.
///
/// `Hologram` is a cheap handle; clones share the same hologram. Every line mutation,
/// lifecycle change, relocation and viewer change is serialised by one lock per hologram, so
/// a viewer never sees traffic for an entity it was not shown and never misses a hide.
///
/// The owner calls [`Hologram::remove`] before dropping the last handle; nothing does it
/// automatically.
#[derive(Clone)]
pub struct Hologram {
    inner: Arc<HologramInner>,
}

pub(crate) struct HologramInner {
    id: Uuid,
    world: Arc<World>,
    factory: Arc<dyn DisplayEntityFactory>,
    ids: Arc<EntityIdCounter>,
    state: Mutex<HologramState>,
    // Mirror of `HologramState::spawned` for lock-free reads
    spawned: AtomicBool,
    settings: RwLock<HologramSettings>,
    viewers: DashMap<Uuid, ViewerEntry>,
    attack_handlers: HandlerSet,
    interact_handlers: HandlerSet,
}

struct HologramState {
    anchor: Position,
    attached: Option<AttachedEntity>,
    lines: Vec<HologramLine>,
    entities: Vec<Box<dyn DisplayEntity>>,
    spawned: bool,
    nearby_node: Option<Arc<EventNode>>,
}

impl HologramState {
    fn ctx(&self) -> RenderContext<'_> {
        RenderContext {
            anchor: &self.anchor,
            attached: self.attached.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Traffic {
    Show,
    Update,
    Hide,
}

impl Hologram {
    pub(crate) fn new(
        world: Arc<World>,
        factory: Arc<dyn DisplayEntityFactory>,
        ids: Arc<EntityIdCounter>,
        anchor: Position,
        settings: HologramSettings,
    ) -> Self {
        Hologram {
            inner: Arc::new(HologramInner {
                id: Uuid::new_v4(),
                world,
                factory,
                ids,
                state: Mutex::new(HologramState {
                    anchor,
                    attached: None,
                    lines: Vec::new(),
                    entities: Vec::new(),
                    spawned: false,
                    nearby_node: None,
                }),
                spawned: AtomicBool::new(false),
                settings: RwLock::new(settings),
                viewers: DashMap::new(),
                attack_handlers: HandlerSet::new(),
                interact_handlers: HandlerSet::new(),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn world(&self) -> &Arc<World> {
        &self.inner.world
    }

    pub fn position(&self) -> Position {
        self.inner.state.lock().anchor.clone()
    }

    pub fn attached(&self) -> Option<AttachedEntity> {
        self.inner.state.lock().attached
    }

    pub fn lines(&self) -> Vec<HologramLine> {
        self.inner.state.lock().lines.clone()
    }

    // Identities of the current display entities, top line first
    pub fn entities(&self) -> Vec<EntityIdentity> {
        self.inner
            .state
            .lock()
            .entities
            .iter()
            .map(|entity| entity.identity())
            .collect()
    }

    pub fn is_spawned(&self) -> bool {
        self.inner.spawned.load(Ordering::SeqCst)
    }

    pub fn settings(&self) -> HologramSettings {
        self.inner.settings.read().clone()
    }

    pub fn is_auto_viewable(&self) -> bool {
        self.inner.settings.read().auto_viewable
    }

    pub fn view_distance(&self) -> u32 {
        self.inner.settings.read().view_distance
    }

    pub fn vertical_spacing(&self) -> f64 {
        self.inner.settings.read().vertical_spacing
    }

    // Read at the next spawn
    pub fn set_auto_viewable(&self, auto_viewable: bool) -> &Self {
        self.inner.settings.write().auto_viewable = auto_viewable;
        self
    }

    // Applies to later range checks; current viewers stay until they move
    pub fn set_view_distance(&self, view_distance: u32) -> &Self {
        self.inner.settings.write().view_distance = view_distance;
        self
    }

    // Applies to entities created from now on
    pub fn set_vertical_spacing(&self, vertical_spacing: f64) -> Result<&Self, HologramError> {
        let mut settings = self.inner.settings.write();
        let candidate = HologramSettings {
            vertical_spacing,
            ..settings.clone()
        };
        candidate.validate()?;
        *settings = candidate;
        Ok(self)
    }

    /// Follow another entity (or stop following with `None`). Every viewer gets an update.
    pub fn attach(&self, entity: Option<AttachedEntity>) -> &Self {
        let mut state = self.inner.state.lock();
        state.attached = entity;
        self.inner.update_all_viewers(&state);
        self
    }

    pub fn attack_handler(&self, handler: InteractionHandler) -> &Self {
        self.inner.attack_handlers.insert(handler);
        self
    }

    pub fn interact_handler(&self, handler: InteractionHandler) -> &Self {
        self.inner.interact_handlers.insert(handler);
        self
    }

    pub fn remove_attack_handler(&self, handler: &InteractionHandler) -> bool {
        self.inner.attack_handlers.remove(handler)
    }

    pub fn remove_interact_handler(&self, handler: &InteractionHandler) -> bool {
        self.inner.interact_handlers.remove(handler)
    }

    pub fn set_lines<I, L>(&self, lines: I) -> &Self
    where
        I: IntoIterator<Item = L>,
        L: Into<HologramLine>,
    {
        let lines: Vec<HologramLine> = lines.into_iter().map(Into::into).collect();
        let mut state = self.inner.state.lock();
        state.lines = lines;
        self.inner.reconcile(&mut state);
        self
    }

    pub fn add_line(&self, line: impl Into<HologramLine>) -> &Self {
        let mut state = self.inner.state.lock();
        state.lines.push(line.into());
        self.inner.reconcile(&mut state);
        self
    }

    pub fn set_line(&self, index: usize, line: impl Into<HologramLine>) -> Result<&Self, HologramError> {
        let mut state = self.inner.state.lock();
        let len = state.lines.len();
        let slot = state
            .lines
            .get_mut(index)
            .ok_or(HologramError::LineIndexOutOfBounds { index, len })?;
        *slot = line.into();
        self.inner.reconcile(&mut state);
        Ok(self)
    }

    pub fn remove_line(&self, index: usize) -> Result<HologramLine, HologramError> {
        let mut state = self.inner.state.lock();
        let len = state.lines.len();
        if index >= len {
            return Err(HologramError::LineIndexOutOfBounds { index, len });
        }
        let removed = state.lines.remove(index);
        self.inner.reconcile(&mut state);
        Ok(removed)
    }

    pub fn clear_lines(&self) -> &Self {
        let mut state = self.inner.state.lock();
        state.lines.clear();
        self.inner.reconcile(&mut state);
        self
    }

    /// Move the anchor inside its world and push the new position to every viewer.
    pub fn set_position(&self, position: Position) -> Result<&Self, HologramError> {
        let world = self.inner.world.id();
        if position.world != *world {
            return Err(HologramError::CrossWorldRelocation {
                expected: world.clone(),
                requested: position.world,
            });
        }
        if !position.is_finite() {
            return Err(invalid_position(&position));
        }

        let mut state = self.inner.state.lock();
        state.anchor = position;
        self.inner.update_all_viewers(&state);
        Ok(self)
    }

    /// Bring the hologram into the world.
    ///
    /// Builds the display entities and, when auto-viewable, subscribes every player in range
    /// and starts watching joins and chunk-crossing moves in the world. No-op when already
    /// spawned.
    pub fn spawn(&self) -> Result<&Self, HologramError> {
        let inner = &self.inner;
        let mut state = inner.state.lock();
        if state.spawned {
            return Ok(self);
        }
        if !state.anchor.is_finite() {
            return Err(invalid_position(&state.anchor));
        }

        state.spawned = true;
        inner.spawned.store(true, Ordering::SeqCst);
        inner.reconcile(&mut state);

        let settings = inner.settings.read().clone();
        if settings.auto_viewable {
            for player in inner.world.players() {
                if is_in_range(&state.anchor, &player.position(), settings.view_distance) {
                    inner.add_viewer_locked(&state, &player);
                }
            }

            let node = inner.nearby_node();
            inner.world.event_node().add_child(Arc::clone(&node));
            state.nearby_node = Some(node);
        }

        info!(
            hologram = %inner.id,
            world = %inner.world.id(),
            lines = state.lines.len(),
            viewers = inner.viewers.len(),
            "hologram spawned"
        );
        Ok(self)
    }

    /// Hide from every viewer, drop all subscriptions and stop watching the world.
    /// No-op when not spawned.
    pub fn remove(&self) {
        let inner = &self.inner;
        let mut state = inner.state.lock();
        if !state.spawned {
            return;
        }

        let viewer_ids: Vec<Uuid> = inner.viewers.iter().map(|entry| *entry.key()).collect();
        for id in &viewer_ids {
            inner.remove_viewer_locked(&state, id);
        }

        state.spawned = false;
        inner.spawned.store(false, Ordering::SeqCst);
        if let Some(node) = state.nearby_node.take() {
            inner.world.event_node().remove_child(&node);
        }

        info!(hologram = %inner.id, viewers = viewer_ids.len(), "hologram removed");
    }

    /// Show the hologram to `player` and subscribe it.
    ///
    /// Returns whether the player already was a viewer; in that case its subscription is
    /// replaced and nothing is shown again.
    pub fn add_viewer(&self, player: &Arc<Player>) -> Result<bool, HologramError> {
        let state = self.inner.state.lock();
        if !state.spawned {
            return Err(HologramError::NotSpawned);
        }
        Ok(self.inner.add_viewer_locked(&state, player))
    }

    // Returns whether the player was a viewer
    pub fn remove_viewer(&self, player: &Player) -> bool {
        let state = self.inner.state.lock();
        self.inner.remove_viewer_locked(&state, &player.id())
    }

    pub fn is_viewer(&self, player: &Player) -> bool {
        self.inner.viewers.contains_key(&player.id())
    }

    pub fn viewers(&self) -> Vec<Arc<Player>> {
        self.inner.viewer_snapshot()
    }

    pub fn viewer_count(&self) -> usize {
        self.inner.viewers.len()
    }
}

impl PartialEq for Hologram {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Hologram {}

impl fmt::Debug for Hologram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hologram")
            .field("id", &self.inner.id)
            .field("world", self.inner.world.id())
            .field("spawned", &self.is_spawned())
            .field("viewers", &self.viewer_count())
            .finish()
    }
}

fn invalid_position(position: &Position) -> HologramError {
    HologramError::InvalidPosition {
        x: position.x,
        y: position.y,
        z: position.z,
    }
}

impl HologramInner {
    fn viewer_snapshot(&self) -> Vec<Arc<Player>> {
        self.viewers
            .iter()
            .map(|entry| Arc::clone(&entry.value().player))
            .collect()
    }

    // Caller holds the state lock
    fn reconcile(&self, state: &mut HologramState) {
        if !state.spawned {
            return;
        }
        let viewers = self.viewer_snapshot();
        let vertical_spacing = self.settings.read().vertical_spacing;

        let HologramState {
            anchor,
            attached,
            lines,
            entities,
            ..
        } = state;
        let env = ReconcileEnv {
            factory: self.factory.as_ref(),
            ids: &self.ids,
            vertical_spacing,
            viewers: &viewers,
            ctx: RenderContext {
                anchor: &*anchor,
                attached: attached.as_ref(),
            },
        };
        let summary = reconcile::reconcile(entities, lines.as_slice(), &env);
        debug!(hologram = %self.id, ?summary, "lines reconciled");
    }

    fn send_all(&self, state: &HologramState, player: &Arc<Player>, traffic: Traffic) {
        let ctx = state.ctx();
        let viewers = std::slice::from_ref(player);
        for entity in &state.entities {
            match traffic {
                Traffic::Show => broadcast(viewers, "show", entity.identity(), |v| entity.show(v, &ctx)),
                Traffic::Update => broadcast(viewers, "update", entity.identity(), |v| entity.update(v, &ctx)),
                Traffic::Hide => broadcast(viewers, "hide", entity.identity(), |v| entity.hide(v, &ctx)),
            }
        }
    }

    fn update_all_viewers(&self, state: &HologramState) {
        if !state.spawned {
            return;
        }
        for viewer in self.viewer_snapshot() {
            self.send_all(state, &viewer, Traffic::Update);
        }
    }

    // Caller holds the state lock and has checked that the hologram is spawned
    fn add_viewer_locked(self: &Arc<Self>, state: &HologramState, player: &Arc<Player>) -> bool {
        let already_viewing = self.viewers.contains_key(&player.id());
        if !already_viewing {
            self.send_all(state, player, Traffic::Show);
        }

        let subscription = ViewerSubscription::subscribe(Arc::downgrade(self), player);
        // A replaced entry is dropped here, which detaches its rules
        let previous = self.viewers.insert(
            player.id(),
            ViewerEntry {
                player: Arc::clone(player),
                subscription,
            },
        );
        drop(previous);

        debug!(hologram = %self.id, player = %player.name(), already_viewing, "viewer added");
        already_viewing
    }

    // Caller holds the state lock
    fn remove_viewer_locked(&self, state: &HologramState, id: &Uuid) -> bool {
        let Some((_, mut entry)) = self.viewers.remove(id) else {
            return false;
        };
        if state.spawned {
            self.send_all(state, &entry.player, Traffic::Hide);
        }
        entry.subscription.revoke();

        debug!(hologram = %self.id, player = %entry.player.name(), "viewer removed");
        true
    }

    fn is_entity(&self, entity_id: i32) -> bool {
        self.state
            .lock()
            .entities
            .iter()
            .any(|entity| entity.identity().entity_id == entity_id)
    }

    // World-wide listeners that pick up players coming into range
    fn nearby_node(self: &Arc<Self>) -> Arc<EventNode> {
        let node = EventNode::new(NEARBY_NODE_NAME);

        let weak = Arc::downgrade(self);
        node.listen(move |event: &PlayerJoinEvent| {
            if let Some(hologram) = weak.upgrade() {
                let position = event.player.position();
                hologram.try_subscribe(&event.player, &position);
            }
            Ok(())
        });

        let weak = Arc::downgrade(self);
        node.add_listener(
            EventListener::<PlayerMoveEvent>::builder()
                .ignore_cancelled(true)
                .filter(different_chunk)
                .handler(move |event| {
                    if let Some(hologram) = weak.upgrade() {
                        hologram.try_subscribe(&event.player, &event.to);
                    }
                    Ok(())
                }),
        );

        node
    }

    fn try_subscribe(self: &Arc<Self>, player: &Arc<Player>, target: &Position) {
        let state = self.state.lock();
        if !state.spawned || self.viewers.contains_key(&player.id()) {
            return;
        }
        let view_distance = self.settings.read().view_distance;
        if is_in_range(&state.anchor, target, view_distance) {
            self.add_viewer_locked(&state, player);
        }
    }

    pub(crate) fn on_viewer_moved(&self, event: &PlayerMoveEvent) {
        let state = self.state.lock();
        if !self.viewers.contains_key(&event.player.id()) {
            return;
        }
        let view_distance = self.settings.read().view_distance;
        if is_in_range(&state.anchor, &event.to, view_distance) {
            return;
        }
        self.remove_viewer_locked(&state, &event.player.id());
    }

    pub(crate) fn on_viewer_left(&self, player: &Arc<Player>) {
        let state = self.state.lock();
        self.remove_viewer_locked(&state, &player.id());
    }

    pub(crate) fn on_viewer_packet(&self, event: &PacketReceiveEvent) -> anyhow::Result<()> {
        // A dispatch already in flight can still reach a revoked rule
        if !self.viewers.contains_key(&event.player.id()) {
            return Ok(());
        }
        let decoded = event.packet.decode_interact_entity().map_err(HologramError::from)?;
        let Some(packet) = decoded else {
            return Ok(());
        };
        // Lock released before any handler runs
        let owned = self.is_entity(packet.entity_id);
        interaction::route(
            &packet,
            owned,
            &event.player,
            &self.attack_handlers,
            &self.interact_handlers,
        )?;
        Ok(())
    }
}
