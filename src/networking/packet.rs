use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::hologram::line::HologramLine;

#[derive(Debug, Error)]
pub enum PacketError {
    #[error("malformed packet: {0}")]
    Codec(#[from] bincode::Error),
}

// Serverbound packet kinds the host hands to the event system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketType {
    InteractEntity,
    Other(i32),
}

/// A raw serverbound packet: its kind plus the undecoded body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundPacket {
    pub packet_type: PacketType,
    pub payload: Vec<u8>,
}

impl InboundPacket {
    pub fn new(packet_type: PacketType, payload: Vec<u8>) -> Self {
        InboundPacket {
            packet_type,
            payload,
        }
    }

    pub fn interact_entity(packet: &InteractEntityPacket) -> Result<Self, PacketError> {
        Ok(InboundPacket::new(PacketType::InteractEntity, encode(packet)?))
    }

    /// Decode the body as an interact-entity packet.
    ///
    /// `Ok(None)` for any other packet kind.
    pub fn decode_interact_entity(&self) -> Result<Option<InteractEntityPacket>, PacketError> {
        if self.packet_type != PacketType::InteractEntity {
            return Ok(None);
        }
        decode(&self.payload).map(Some)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractAction {
    Interact,
    Attack,
    InteractAt,
    // Ordinal the protocol does not define
    Unknown(i32),
}

impl InteractAction {
    pub fn from_ordinal(ordinal: i32) -> Self {
        match ordinal {
            0 => InteractAction::Interact,
            1 => InteractAction::Attack,
            2 => InteractAction::InteractAt,
            other => InteractAction::Unknown(other),
        }
    }

    pub fn ordinal(self) -> i32 {
        match self {
            InteractAction::Interact => 0,
            InteractAction::Attack => 1,
            InteractAction::InteractAt => 2,
            InteractAction::Unknown(other) => other,
        }
    }
}

/// Body of an interact-entity packet. The action travels as its wire ordinal so that an
/// undefined value still decodes and can be judged by whoever routes the packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractEntityPacket {
    pub entity_id: i32,
    action: i32,
    pub target: Option<(f32, f32, f32)>,
    pub sneaking: bool,
}

impl InteractEntityPacket {
    pub fn new(entity_id: i32, action: InteractAction) -> Self {
        InteractEntityPacket {
            entity_id,
            action: action.ordinal(),
            target: None,
            sneaking: false,
        }
    }

    pub fn with_target(mut self, x: f32, y: f32, z: f32) -> Self {
        self.target = Some((x, y, z));
        self
    }

    pub fn action(&self) -> InteractAction {
        InteractAction::from_ordinal(self.action)
    }
}

// Clientbound packets the packet display factory emits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientboundPacket {
    SpawnEntity {
        entity_id: i32,
        uuid: Uuid,
        x: f64,
        y: f64,
        z: f64,
    },
    EntityMetadata {
        entity_id: i32,
        line: HologramLine,
    },
    TeleportEntity {
        entity_id: i32,
        x: f64,
        y: f64,
        z: f64,
    },
    DestroyEntities {
        entity_ids: Vec<i32>,
    },
}

impl ClientboundPacket {
    pub fn entity_ids(&self) -> Vec<i32> {
        match self {
            ClientboundPacket::SpawnEntity { entity_id, .. }
            | ClientboundPacket::EntityMetadata { entity_id, .. }
            | ClientboundPacket::TeleportEntity { entity_id, .. } => vec![*entity_id],
            ClientboundPacket::DestroyEntities { entity_ids } => entity_ids.clone(),
        }
    }
}

pub fn encode<T: Serialize>(packet: &T) -> Result<Vec<u8>, PacketError> {
    Ok(bincode::serialize(packet)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PacketError> {
    Ok(bincode::deserialize(bytes)?)
}
