//! Shared test fixtures: a display factory that records traffic instead of sending it, and a
//! small world with a hologram service.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::config::config_manager::HologramConfig;
use crate::core::player::Player;
use crate::core::position::Position;
use crate::core::world_manager::{World, WorldRegistry};
use crate::hologram::Hologram;
use crate::hologram::entity::{DisplayEntity, DisplayEntityFactory, EntityIdentity, EntitySpec, RenderContext};
use crate::hologram::line::HologramLine;
use crate::hologram::service::HologramService;
use crate::networking::connection::{ChannelConnection, Connection, TransportError};
use crate::networking::packet::{ClientboundPacket, InboundPacket, InteractAction, InteractEntityPacket};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Show,
    Update,
    Hide,
}

#[derive(Debug, Clone)]
pub struct Record {
    pub op: Op,
    pub entity_id: i32,
    pub player: String,
    pub player_id: Uuid,
    pub line: HologramLine,
    pub y: f64,
}

#[derive(Default)]
struct RecorderState {
    records: Vec<Record>,
    failing: HashSet<Uuid>,
}

/// Every show/update/hide in the order it happened.
#[derive(Clone, Default)]
pub struct Recorder {
    state: Arc<Mutex<RecorderState>>,
}

impl Recorder {
    pub fn records(&self) -> Vec<Record> {
        self.state.lock().records.clone()
    }

    pub fn of_op(&self, op: Op) -> Vec<Record> {
        self.state
            .lock()
            .records
            .iter()
            .filter(|record| record.op == op)
            .cloned()
            .collect()
    }

    pub fn count_op(&self, op: Op) -> usize {
        self.state.lock().records.iter().filter(|record| record.op == op).count()
    }

    pub fn for_player(&self, player: &Player) -> Vec<Record> {
        self.state
            .lock()
            .records
            .iter()
            .filter(|record| record.player_id == player.id())
            .cloned()
            .collect()
    }

    pub fn count_for(&self, player: &Player, op: Op) -> usize {
        self.for_player(player).iter().filter(|record| record.op == op).count()
    }

    pub fn clear(&self) {
        self.state.lock().records.clear();
    }

    // Sends to this player fail from now on
    pub fn fail_for(&self, player: &Arc<Player>) {
        self.state.lock().failing.insert(player.id());
    }

    /// Replay the traffic per (viewer, entity) and return the first protocol violation:
    /// anything but show before a show, or a second show without a hide in between.
    pub fn check_protocol(&self) -> Result<(), String> {
        let mut visible: HashMap<(Uuid, i32), bool> = HashMap::new();
        for (index, record) in self.state.lock().records.iter().enumerate() {
            let shown = visible.entry((record.player_id, record.entity_id)).or_insert(false);
            match (record.op, *shown) {
                (Op::Show, false) => *shown = true,
                (Op::Hide, true) => *shown = false,
                (Op::Update, true) => {}
                (op, shown) => {
                    return Err(format!(
                        "record {}: {:?} of entity {} to {} while shown={}",
                        index, op, record.entity_id, record.player, shown
                    ));
                }
            }
        }
        Ok(())
    }

    /// Entities currently visible to each player according to the recorded traffic.
    pub fn visible_to(&self, player: &Player) -> HashSet<i32> {
        let mut visible = HashSet::new();
        for record in self.for_player(player) {
            match record.op {
                Op::Show => {
                    visible.insert(record.entity_id);
                }
                Op::Hide => {
                    visible.remove(&record.entity_id);
                }
                Op::Update => {}
            }
        }
        visible
    }

    fn record(&self, op: Op, entity: &RecordingEntity, viewer: &Player, ctx: &RenderContext<'_>) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.failing.contains(&viewer.id()) {
            return Err(TransportError::Disconnected);
        }
        state.records.push(Record {
            op,
            entity_id: entity.identity.entity_id,
            player: viewer.name().to_string(),
            player_id: viewer.id(),
            line: entity.line.clone(),
            y: ctx.anchor.y + entity.y_offset,
        });
        Ok(())
    }
}

pub struct RecordingFactory {
    recorder: Recorder,
}

impl RecordingFactory {
    pub fn new(recorder: Recorder) -> Self {
        RecordingFactory { recorder }
    }
}

impl DisplayEntityFactory for RecordingFactory {
    fn create(&self, spec: EntitySpec) -> Box<dyn DisplayEntity> {
        Box::new(RecordingEntity {
            identity: spec.identity,
            y_offset: spec.y_offset,
            line: spec.line,
            recorder: self.recorder.clone(),
        })
    }
}

struct RecordingEntity {
    identity: EntityIdentity,
    y_offset: f64,
    line: HologramLine,
    recorder: Recorder,
}

impl DisplayEntity for RecordingEntity {
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
        self.recorder.record(Op::Show, self, viewer, ctx)
    }

    fn update(&self, viewer: &Player, ctx: &RenderContext<'_>) -> Result<(), TransportError> {
        self.recorder.record(Op::Update, self, viewer, ctx)
    }

    fn hide(&self, viewer: &Player, ctx: &RenderContext<'_>) -> Result<(), TransportError> {
        self.recorder.record(Op::Hide, self, viewer, ctx)
    }
}

// Accepts and drops everything
pub struct NullConnection;

impl Connection for NullConnection {
    fn send(&self, _packet: &ClientboundPacket) -> Result<(), TransportError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }
}

pub fn connected_player(name: impl Into<String>, position: Position) -> Arc<Player> {
    Player::new(name, position, Arc::new(NullConnection))
}

pub fn channel_player(
    name: impl Into<String>,
    position: Position,
) -> (Arc<Player>, Arc<ChannelConnection>, std::sync::mpsc::Receiver<Vec<u8>>) {
    let (connection, receiver) = ChannelConnection::new();
    let connection = Arc::new(connection);
    let player = Player::new(name, position, Arc::clone(&connection) as Arc<dyn Connection>);
    (player, connection, receiver)
}

pub const WORLD: &str = "world";

// Centre of chunk (cx, cz) in the default world
pub fn chunk_center(cx: i32, cz: i32) -> Position {
    Position::new(WORLD, f64::from(cx * 16 + 8), 64.0, f64::from(cz * 16 + 8))
}

// Captured per test by the harness
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("hologram=debug"))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// One loaded world, a recording service and helpers to drive players around it.
pub struct Fixture {
    pub registry: Arc<WorldRegistry>,
    pub world: Arc<World>,
    pub recorder: Recorder,
    pub service: HologramService,
}

impl Fixture {
    pub const ENTITY_ID_START: i32 = 500;

    pub fn new() -> Self {
        init_tracing();
        let registry = Arc::new(WorldRegistry::new());
        let world = registry.register(World::new(WORLD));
        let recorder = Recorder::default();
        let config = HologramConfig {
            entity_id_start: Self::ENTITY_ID_START,
            ..HologramConfig::default()
        };
        let service = HologramService::new(
            Arc::clone(&registry),
            Arc::new(RecordingFactory::new(recorder.clone())),
            &config,
        );
        Fixture {
            registry,
            world,
            recorder,
            service,
        }
    }

    pub fn chunk_center(&self, cx: i32, cz: i32) -> Position {
        chunk_center(cx, cz)
    }

    // Joined player standing in the centre of chunk (cx, cz)
    pub fn player_at_chunk(&self, name: &str, cx: i32, cz: i32) -> Arc<Player> {
        let player = connected_player(name, chunk_center(cx, cz));
        self.registry.join(&player).unwrap();
        player
    }

    pub fn move_to_chunk(&self, player: &Arc<Player>, cx: i32, cz: i32) -> bool {
        self.registry.move_player(player, chunk_center(cx, cz)).unwrap()
    }

    // Not spawned, anchored at the centre of chunk (0, 0)
    pub fn hologram(&self, lines: &[&str]) -> Hologram {
        self.service
            .builder()
            .position(chunk_center(0, 0))
            .lines(lines.iter().copied())
            .build()
            .unwrap()
    }

    pub fn interact(&self, player: &Arc<Player>, entity_id: i32, action: InteractAction) -> anyhow::Result<()> {
        let packet = InboundPacket::interact_entity(&InteractEntityPacket::new(entity_id, action))?;
        self.registry.receive_packet(player, packet)
    }
}
