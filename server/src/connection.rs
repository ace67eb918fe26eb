//! Registry of connected peers and the broadcast fan-out primitive.
//!
//! Peers are held as writer-channel handles, one per connection, so the
//! core loop can push a broadcast without ever awaiting a socket. Delivery
//! is fire-and-forget: a peer whose writer has gone away is dropped from
//! the registry and the remaining peers still receive the message.

use log::{debug, warn};
use shared::Broadcast;
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;

/// Message handed to a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerMessage {
    /// One serialized broadcast line.
    Data(String),
    /// Flush and close the connection.
    Shutdown,
}

/// All currently connected peers, keyed by connection ordinal. Players and
/// passive spectators are indistinguishable here on purpose: broadcasts go
/// to every transport-level connection.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    peers: HashMap<u64, UnboundedSender<PeerMessage>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        ConnectionRegistry::default()
    }

    pub fn insert(&mut self, id: u64, writer: UnboundedSender<PeerMessage>) {
        self.peers.insert(id, writer);
    }

    pub fn remove(&mut self, id: u64) -> bool {
        self.peers.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Sends one broadcast to every registered peer. Peers whose writer is
    /// gone are pruned; everyone else still gets the message.
    pub fn broadcast(&mut self, message: &Broadcast) {
        let mut line = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(err) => {
                warn!("failed to serialize broadcast: {err}");
                return;
            }
        };
        line.push('\n');

        let mut dead = Vec::new();
        for (id, writer) in &self.peers {
            if writer.send(PeerMessage::Data(line.clone())).is_err() {
                dead.push(*id);
            }
        }
        for id in dead {
            warn!("dropping peer {id}: writer gone");
            self.peers.remove(&id);
        }
    }

    /// Terminates every connection and empties the registry. Called once
    /// per match, at teardown, after the final frame and winner event.
    pub fn close_all(&mut self) {
        for (id, writer) in self.peers.drain() {
            let _ = writer.send(PeerMessage::Shutdown);
            debug!("closed connection {id}");
        }
    }
}
