use std::sync::mpsc::{Receiver, Sender, channel};

use parking_lot::Mutex;
use thiserror::Error;

use crate::networking::packet::{ClientboundPacket, encode};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Disconnected,
    #[error("failed to encode packet: {0}")]
    Encode(String),
}

/// Outbound half of a client connection. Sends are fire-and-forget; the core never retries.
pub trait Connection: Send + Sync {
    fn send(&self, packet: &ClientboundPacket) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;
}

/// A connection backed by an mpsc channel of encoded packets.
///
/// The receiving end stands in for the socket writer. Dropping it, or calling
/// [`ChannelConnection::disconnect`], makes every later send fail with `Disconnected`.
pub struct ChannelConnection {
    sender: Mutex<Option<Sender<Vec<u8>>>>,
}

impl ChannelConnection {
    pub fn new() -> (Self, Receiver<Vec<u8>>) {
        let (tx, rx) = channel();
        (
            ChannelConnection {
                sender: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    pub fn disconnect(&self) {
        self.sender.lock().take();
    }
}

impl Connection for ChannelConnection {
    fn send(&self, packet: &ClientboundPacket) -> Result<(), TransportError> {
        let bytes = encode(packet).map_err(|e| TransportError::Encode(e.to_string()))?;
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(tx) => tx.send(bytes).map_err(|_| TransportError::Disconnected),
            None => Err(TransportError::Disconnected),
        }
    }

    fn is_connected(&self) -> bool {
        self.sender.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networking::packet::decode;

    #[test]
    fn sent_packets_arrive_encoded() {
        let (connection, rx) = ChannelConnection::new();
        let packet = ClientboundPacket::DestroyEntities {
            entity_ids: vec![1, 2],
        };
        connection.send(&packet).unwrap();

        let bytes = rx.try_recv().unwrap();
        assert_eq!(decode::<ClientboundPacket>(&bytes).unwrap(), packet);
    }

    #[test]
    fn disconnect_fails_later_sends() {
        let (connection, _rx) = ChannelConnection::new();
        connection.disconnect();
        assert!(!connection.is_connected());
        assert!(matches!(
            connection.send(&ClientboundPacket::DestroyEntities { entity_ids: vec![] }),
            Err(TransportError::Disconnected)
        ));
    }

    #[test]
    fn dropped_receiver_counts_as_disconnected() {
        let (connection, rx) = ChannelConnection::new();
        drop(rx);
        assert!(connection
            .send(&ClientboundPacket::DestroyEntities { entity_ids: vec![3] })
            .is_err());
    }
}
