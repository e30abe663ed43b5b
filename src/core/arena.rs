//! Integrated arena service that coordinates rooms, channels, accounts
//! and settlement

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::directory::{Connection, ConnectionDirectory};
use crate::core::room::{Room, RoomRegistry};
use crate::core::settlement::{SettlementEngine, SettlementReport};
use crate::error::{OrbArenaError, Result};
use crate::storage::traits::{AccountStore, PlayerRecord, TransactionRecord};

/// The arena service: owns the room registry and connection directory,
/// and brokers every balance mutation through the account store.
///
/// Account-store calls may suspend; none of them happen while a registry
/// or directory lock is held, so a slow store never blocks unrelated
/// rooms.
pub struct ArenaManager {
    registry: RoomRegistry,
    directory: ConnectionDirectory,
    engine: SettlementEngine,
    store: Arc<dyn AccountStore>,
}

impl ArenaManager {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self {
            registry: RoomRegistry::new(),
            directory: ConnectionDirectory::new(),
            engine: SettlementEngine::new(store.clone()),
            store,
        }
    }

    pub fn with_payout_scale(store: Arc<dyn AccountStore>, payout_scale: f64) -> Self {
        Self {
            registry: RoomRegistry::new(),
            directory: ConnectionDirectory::new(),
            engine: SettlementEngine::with_payout_scale(store.clone(), payout_scale),
            store,
        }
    }

    // --- Accounts ---

    /// Upsert a player account
    pub async fn register_player(
        &self,
        user_id: i64,
        username: String,
        wallet_address: Option<String>,
        initial_balance: f64,
    ) -> Result<PlayerRecord> {
        self.store
            .register_player(user_id, username, wallet_address, initial_balance)
            .await
    }

    pub async fn get_player(&self, user_id: i64) -> Result<PlayerRecord> {
        self.store.get_player(user_id).await
    }

    pub async fn connect_wallet(&self, user_id: i64, wallet_address: String) -> Result<()> {
        self.store.connect_wallet(user_id, wallet_address).await
    }

    /// Administrative credit: records the transaction and adjusts the
    /// balance. The reported transaction hash is stored as-is; chain
    /// verification is out of scope.
    pub async fn add_donation(
        &self,
        user_id: i64,
        amount: f64,
        transaction_hash: Option<String>,
    ) -> Result<f64> {
        if amount <= 0.0 {
            return Err(OrbArenaError::ValidationError(
                "Donation amount must be positive".to_string(),
            ));
        }

        self.store
            .record_transaction(TransactionRecord {
                user_id,
                transaction_type: "donation".to_string(),
                amount,
                transaction_hash,
                status: "completed".to_string(),
                created_at: Utc::now(),
            })
            .await?;

        self.store.adjust_balance(user_id, amount).await
    }

    // --- Room lifecycle ---

    /// Create a room after validating the owner can cover the wager.
    /// The balance check runs against the store before the registry is
    /// touched; the stake itself is only debited at settlement.
    pub async fn create_room(&self, owner_id: i64, username: String, wager: f64) -> Result<Room> {
        self.ensure_balance(owner_id, wager).await?;
        self.registry.create(owner_id, username, wager).await
    }

    /// Snapshot of rooms still accepting players
    pub async fn list_rooms(&self) -> Vec<Room> {
        self.registry.list_joinable().await
    }

    pub async fn get_room(&self, room_id: &str) -> Option<Room> {
        self.registry.get(room_id).await
    }

    /// Seat a player in a room. Wager and capacity checks belong to the
    /// registry; the balance check happens first, outside any lock.
    pub async fn join_room(
        &self,
        room_id: &str,
        user_id: i64,
        username: String,
        wager: f64,
    ) -> Result<Room> {
        self.ensure_balance(user_id, wager).await?;
        self.registry.join(room_id, user_id, username, wager).await
    }

    /// Settle a room and retire it. The room leaves the registry strictly
    /// after the engine succeeds, so a failed settlement can be retried
    /// and a second settle of the same id fails with `RoomNotFound`.
    pub async fn settle_room(
        &self,
        room_id: &str,
        winner_id: Option<i64>,
        results: &HashMap<i64, f64>,
    ) -> Result<SettlementReport> {
        let snapshot = self.registry.begin_settlement(room_id).await?;

        match self.engine.settle(&snapshot, results, winner_id).await {
            Ok(report) => {
                self.registry.finish_settlement(room_id).await;
                Ok(report)
            }
            Err(e) => {
                self.registry.abort_settlement(room_id).await;
                Err(e)
            }
        }
    }

    // --- Real-time channels ---

    /// Bind a channel to a player (last writer wins)
    pub async fn register_connection(&self, user_id: i64, connection: Connection) {
        self.directory.register(user_id, connection).await;
    }

    pub async fn unregister_connection(&self, user_id: i64) -> bool {
        self.directory.unregister(user_id).await
    }

    /// Tear down only if the given connection is still the active one
    pub async fn unregister_connection_exact(&self, user_id: i64, connection_id: &str) -> bool {
        self.directory.unregister_exact(user_id, connection_id).await
    }

    /// Forward a payload verbatim to every participant of the room except
    /// the sender. Per-recipient failures are logged and swallowed and the
    /// dead channel is evicted; the sender never sees an error. Returns
    /// the number of successful deliveries.
    pub async fn relay(&self, room_id: &str, sender_id: i64, payload: &str) -> usize {
        let participants = match self.registry.get(room_id).await {
            Some(room) => room.participants,
            None => {
                log::debug!(
                    "Dropping relay payload from {}: room {} not found",
                    sender_id,
                    room_id
                );
                return 0;
            }
        };

        let mut delivered = 0;
        let mut dead = Vec::new();

        for participant in participants {
            if participant.user_id == sender_id {
                continue;
            }
            if self.directory.send_to(participant.user_id, payload).await {
                delivered += 1;
            } else if self.directory.is_connected(participant.user_id).await {
                // Channel exists but the receiver is gone; evict it so we
                // stop retrying a broken pipe
                dead.push(participant.user_id);
            }
        }

        for user_id in dead {
            self.directory.unregister(user_id).await;
            log::warn!("Evicted broken channel for player {}", user_id);
        }

        delivered
    }

    // --- Introspection ---

    pub async fn room_count(&self) -> usize {
        self.registry.len().await
    }

    pub async fn connection_count(&self) -> usize {
        self.directory.connection_count().await
    }

    async fn ensure_balance(&self, user_id: i64, wager: f64) -> Result<()> {
        let balance = self.store.get_balance(user_id).await?;
        if balance < wager {
            return Err(OrbArenaError::InsufficientBalance {
                balance,
                required: wager,
            });
        }
        Ok(())
    }
}

// Shared reference to the arena manager
pub type SharedArenaManager = Arc<ArenaManager>;
