use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use log::{debug, error, info};
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket};

use crate::core::arena::SharedArenaManager;
use crate::core::directory::Connection;

// Handle a real-time game channel for one player in one room
pub async fn handle_ws_client(
    ws: WebSocket,
    room_id: String,
    user_id: i64,
    arena: SharedArenaManager,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (tx, rx) = mpsc::unbounded_channel();

    // Forward messages from our channel to the WebSocket
    tokio::task::spawn(async move {
        let mut rx = rx;
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_tx.send(message).await {
                debug!("WebSocket send closed: {}", e);
                break;
            }
        }
    });

    // Register the channel; any prior channel for this player is
    // silently superseded
    let connection = Connection::new(tx.clone());
    let connection_id = connection.id.clone();
    arena.register_connection(user_id, connection).await;

    info!(
        "Player {} connected to room {} (connection {})",
        user_id, room_id, connection_id
    );

    // Welcome frame so the client knows the channel is live
    let connected = serde_json::json!({
        "type": "connected",
        "room_id": room_id,
        "user_id": user_id,
    });
    if tx.send(Message::text(connected.to_string())).is_err() {
        error!("Failed to send welcome frame to player {}", user_id);
    }

    // Pump incoming frames into the relay. Payloads are opaque: no
    // parsing, no validation, forwarded verbatim to the rest of the room.
    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(msg) => {
                if msg.is_close() {
                    break;
                }
                if let Ok(payload) = msg.to_str() {
                    let delivered = arena.relay(&room_id, user_id, payload).await;
                    debug!(
                        "Relayed payload from player {} to {} recipients in room {}",
                        user_id, delivered, room_id
                    );
                }
            }
            Err(e) => {
                debug!("WebSocket error for player {}: {}", user_id, e);
                break;
            }
        }
    }

    // Disconnect only removes the directory binding; room membership and
    // settlement are untouched. A superseded channel must not tear down
    // its replacement.
    if arena
        .unregister_connection_exact(user_id, &connection_id)
        .await
    {
        info!("Player {} disconnected from room {}", user_id, room_id);
    }
}
