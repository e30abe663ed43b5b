use std::sync::Arc;
use tokio::sync::mpsc;
use warp::ws::Message;

use orb_arena::core::arena::ArenaManager;
use orb_arena::core::directory::Connection;
use orb_arena::storage::memory::MemoryAccountStore;

struct TestChannel {
    rx: mpsc::UnboundedReceiver<Message>,
}

impl TestChannel {
    fn try_text(&mut self) -> Option<String> {
        self.rx
            .try_recv()
            .ok()
            .and_then(|msg| msg.to_str().map(str::to_string).ok())
    }
}

async fn connect(arena: &ArenaManager, user_id: i64) -> TestChannel {
    let (tx, rx) = mpsc::unbounded_channel();
    arena.register_connection(user_id, Connection::new(tx)).await;
    TestChannel { rx }
}

/// Three funded players seated in one active room
async fn three_player_room(arena: &ArenaManager) -> String {
    for id in 1..=3i64 {
        arena
            .register_player(id, format!("player{}", id), None, 10.0)
            .await
            .unwrap();
    }
    let room = arena.create_room(1, "player1".to_string(), 1.0).await.unwrap();
    arena
        .join_room(&room.id, 2, "player2".to_string(), 1.0)
        .await
        .unwrap();
    arena
        .join_room(&room.id, 3, "player3".to_string(), 1.0)
        .await
        .unwrap();
    room.id
}

#[tokio::test]
async fn test_relay_excludes_sender() {
    let arena = ArenaManager::new(Arc::new(MemoryAccountStore::new()));
    let room_id = three_player_room(&arena).await;

    let mut a = connect(&arena, 1).await;
    let mut b = connect(&arena, 2).await;
    let mut c = connect(&arena, 3).await;

    let payload = r#"{"type":"move","x":4.2,"y":7.7}"#;
    let delivered = arena.relay(&room_id, 1, payload).await;
    assert_eq!(delivered, 2);

    // B and C receive the payload verbatim; A hears nothing back
    assert_eq!(b.try_text().as_deref(), Some(payload));
    assert_eq!(c.try_text().as_deref(), Some(payload));
    assert!(a.try_text().is_none());
}

#[tokio::test]
async fn test_relay_survives_disconnect() {
    let arena = ArenaManager::new(Arc::new(MemoryAccountStore::new()));
    let room_id = three_player_room(&arena).await;

    let _a = connect(&arena, 1).await;
    let _b = connect(&arena, 2).await;
    let mut c = connect(&arena, 3).await;

    // B disconnects; relay from A still reaches C, no error anywhere
    assert!(arena.unregister_connection(2).await);

    let delivered = arena.relay(&room_id, 1, "payload").await;
    assert_eq!(delivered, 1);
    assert_eq!(c.try_text().as_deref(), Some("payload"));
}

#[tokio::test]
async fn test_relay_evicts_broken_channel() {
    let arena = ArenaManager::new(Arc::new(MemoryAccountStore::new()));
    let room_id = three_player_room(&arena).await;

    let _a = connect(&arena, 1).await;
    let mut c = connect(&arena, 3).await;

    // B's receiver half is dropped without unregistering, simulating a
    // broken pipe
    let b = connect(&arena, 2).await;
    drop(b);

    let delivered = arena.relay(&room_id, 1, "first").await;
    assert_eq!(delivered, 1);
    assert_eq!(c.try_text().as_deref(), Some("first"));

    // The dead entry was evicted so the next relay skips it entirely
    assert_eq!(arena.connection_count().await, 2);
    let delivered = arena.relay(&room_id, 1, "second").await;
    assert_eq!(delivered, 1);
    assert_eq!(c.try_text().as_deref(), Some("second"));
}

#[tokio::test]
async fn test_relay_unknown_room_drops_silently() {
    let arena = ArenaManager::new(Arc::new(MemoryAccountStore::new()));
    arena
        .register_player(1, "player1".to_string(), None, 10.0)
        .await
        .unwrap();
    let _a = connect(&arena, 1).await;

    let delivered = arena.relay("room_missing", 1, "payload").await;
    assert_eq!(delivered, 0);
}

#[tokio::test]
async fn test_second_channel_supersedes_first() {
    let arena = ArenaManager::new(Arc::new(MemoryAccountStore::new()));
    let room_id = three_player_room(&arena).await;

    let _a = connect(&arena, 1).await;
    let mut b_old = connect(&arena, 2).await;
    let mut b_new = connect(&arena, 2).await;
    let _c = connect(&arena, 3).await;

    arena.relay(&room_id, 1, "hello").await;

    // Only the most recent registration for player 2 receives
    assert_eq!(b_new.try_text().as_deref(), Some("hello"));
    assert!(b_old.try_text().is_none());
}

#[tokio::test]
async fn test_late_connection_gets_no_replay() {
    let arena = ArenaManager::new(Arc::new(MemoryAccountStore::new()));
    let room_id = three_player_room(&arena).await;

    let _a = connect(&arena, 1).await;
    let _b = connect(&arena, 2).await;

    arena.relay(&room_id, 1, "early").await;

    // C connects after the fact and must not receive the earlier payload
    let mut c = connect(&arena, 3).await;
    assert!(c.try_text().is_none());
}
