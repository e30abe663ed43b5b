//! Abstract account storage interface for pluggable backends
//!
//! The account store is the single source of truth for balances and
//! player stats. Registry and settlement code issue deltas against it
//! and never compute a derived balance themselves.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::room::Participant;
use crate::error::Result;

/// Durable player account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub user_id: i64,
    pub username: String,
    pub wallet_address: Option<String>,
    pub balance: f64,
    pub total_games: i64,
    pub wins: i64,
    pub created_at: DateTime<Utc>,
}

/// Immutable record of one concluded room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub room_id: String,
    pub wager: f64,
    pub winner_id: Option<i64>,
    pub participants: Vec<Participant>,
    pub results: HashMap<i64, f64>,
    pub completed_at: DateTime<Utc>,
}

/// Append-only ledger entry for credits outside settlement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub user_id: i64,
    pub transaction_type: String,
    pub amount: f64,
    pub transaction_hash: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Player stat counters adjustable through the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    TotalGames,
    Wins,
}

/// A fully buffered settlement, applied against the store as one unit.
/// Deltas are net per participant (payout minus stake) in join order;
/// every listed participant also counts one game played.
#[derive(Debug, Clone)]
pub struct SettlementBatch {
    pub deltas: Vec<(i64, f64)>,
    pub winner_id: Option<i64>,
    pub history: HistoryRecord,
}

/// Account storage interface consumed by the arena core
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Upsert a player: creates the account, or refreshes the username of
    /// an existing one without touching balance or stats
    async fn register_player(
        &self,
        user_id: i64,
        username: String,
        wallet_address: Option<String>,
        initial_balance: f64,
    ) -> Result<PlayerRecord>;

    /// Get a player by id, failing with `PlayerNotFound` if unregistered
    async fn get_player(&self, user_id: i64) -> Result<PlayerRecord>;

    /// Current balance for a player
    async fn get_balance(&self, user_id: i64) -> Result<f64>;

    /// Apply a signed delta to a player's balance, returning the new
    /// balance. Rejects any result that would go negative.
    async fn adjust_balance(&self, user_id: i64, delta: f64) -> Result<f64>;

    /// Increment a stat counter
    async fn increment_stat(&self, user_id: i64, stat: Stat, delta: i64) -> Result<()>;

    /// Apply a buffered settlement in one transactional scope: all
    /// balance deltas, the games-played and win counters, and the
    /// history append succeed together or nothing changes. Fails with
    /// `InsufficientBalance` if any delta would push a balance negative,
    /// `PlayerNotFound` for an unregistered participant. Returns the
    /// resulting balance per participant.
    async fn apply_settlement(&self, batch: SettlementBatch) -> Result<HashMap<i64, f64>>;

    /// Link a wallet address to a player
    async fn connect_wallet(&self, user_id: i64, wallet_address: String) -> Result<()>;

    /// Durable append of a settlement history entry
    async fn record_history(&self, entry: HistoryRecord) -> Result<()>;

    /// Durable append of a transaction ledger entry
    async fn record_transaction(&self, entry: TransactionRecord) -> Result<()>;

    /// History entries for a room id (empty if none)
    async fn history_for_room(&self, room_id: &str) -> Result<Vec<HistoryRecord>>;
}
