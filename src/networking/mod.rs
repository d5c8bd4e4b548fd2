pub mod connection;
pub mod display;
pub mod packet;

pub use connection::{ChannelConnection, Connection, TransportError};
pub use display::PacketDisplayFactory;
pub use packet::{ClientboundPacket, InboundPacket, InteractAction, InteractEntityPacket, PacketError, PacketType};
