//! Real-time channel management
//! Maps each player to its currently active WebSocket channel

use log::warn;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;
use warp::ws::Message;

/// One live WebSocket channel bound to a player
pub struct Connection {
    pub id: String,
    pub sender: mpsc::UnboundedSender<Message>,
    pub connected_at: Instant,
}

impl Connection {
    pub fn new(sender: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            connected_at: Instant::now(),
        }
    }

    /// Send a text frame through this connection
    pub fn send_text(&self, text: &str) -> bool {
        match self.sender.send(Message::text(text)) {
            Ok(_) => true,
            Err(_) => {
                warn!("Failed to send message on connection {}", self.id);
                false
            }
        }
    }

    pub fn connection_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Volatile registry of player id -> active channel.
///
/// One channel per player: a fresh register silently supersedes the
/// previous binding (last writer wins, no handshake to the displaced
/// side). Losing a channel never touches room state.
pub struct ConnectionDirectory {
    connections: Arc<RwLock<HashMap<i64, Connection>>>,
}

impl ConnectionDirectory {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Bind a channel to a player, superseding any prior one
    pub async fn register(&self, user_id: i64, connection: Connection) {
        let mut connections = self.connections.write().await;
        if connections.insert(user_id, connection).is_some() {
            log::debug!("Superseded existing channel for player {}", user_id);
        }
    }

    /// Remove the binding for a player; no-op if absent. Returns whether a
    /// binding was removed.
    pub async fn unregister(&self, user_id: i64) -> bool {
        self.connections.write().await.remove(&user_id).is_some()
    }

    /// Only the channel registered in this directory may be unregistered
    /// by a closing socket; a superseded handler must not tear down its
    /// replacement.
    pub async fn unregister_exact(&self, user_id: i64, connection_id: &str) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get(&user_id) {
            Some(current) if current.id == connection_id => {
                connections.remove(&user_id);
                true
            }
            _ => false,
        }
    }

    pub async fn is_connected(&self, user_id: i64) -> bool {
        self.connections.read().await.contains_key(&user_id)
    }

    /// Best-effort delivery to one player. Returns false when the player
    /// has no channel or the send failed.
    pub async fn send_to(&self, user_id: i64, text: &str) -> bool {
        let connections = self.connections.read().await;
        match connections.get(&user_id) {
            Some(connection) => connection.send_text(text),
            None => false,
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for ConnectionDirectory {
    fn default() -> Self {
        Self::new()
    }
}
