//! In-memory account storage implementation
//!
//! Keeps all accounts, history and transactions in process memory.
//! Suitable for development, testing, or small deployments; production
//! backends implement the same trait over a durable store.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::traits::*;
use crate::error::{OrbArenaError, Result};

/// In-memory account store
pub struct MemoryAccountStore {
    players: Arc<RwLock<HashMap<i64, PlayerRecord>>>,
    history: Arc<RwLock<Vec<HistoryRecord>>>,
    transactions: Arc<RwLock<Vec<TransactionRecord>>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self {
            players: Arc::new(RwLock::new(HashMap::new())),
            history: Arc::new(RwLock::new(Vec::new())),
            transactions: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn register_player(
        &self,
        user_id: i64,
        username: String,
        wallet_address: Option<String>,
        initial_balance: f64,
    ) -> Result<PlayerRecord> {
        let mut players = self.players.write().await;

        let record = match players.get_mut(&user_id) {
            Some(existing) => {
                // Re-registration refreshes the display name only
                existing.username = username;
                existing.clone()
            }
            None => {
                let record = PlayerRecord {
                    user_id,
                    username,
                    wallet_address,
                    balance: initial_balance.max(0.0),
                    total_games: 0,
                    wins: 0,
                    created_at: Utc::now(),
                };
                players.insert(user_id, record.clone());
                record
            }
        };

        Ok(record)
    }

    async fn get_player(&self, user_id: i64) -> Result<PlayerRecord> {
        self.players
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or(OrbArenaError::PlayerNotFound(user_id))
    }

    async fn get_balance(&self, user_id: i64) -> Result<f64> {
        Ok(self.get_player(user_id).await?.balance)
    }

    async fn adjust_balance(&self, user_id: i64, delta: f64) -> Result<f64> {
        let mut players = self.players.write().await;
        let player = players
            .get_mut(&user_id)
            .ok_or(OrbArenaError::PlayerNotFound(user_id))?;

        let new_balance = player.balance + delta;
        if new_balance < 0.0 {
            return Err(OrbArenaError::InsufficientBalance {
                balance: player.balance,
                required: -delta,
            });
        }

        player.balance = new_balance;
        Ok(new_balance)
    }

    async fn increment_stat(&self, user_id: i64, stat: Stat, delta: i64) -> Result<()> {
        let mut players = self.players.write().await;
        let player = players
            .get_mut(&user_id)
            .ok_or(OrbArenaError::PlayerNotFound(user_id))?;

        match stat {
            Stat::TotalGames => player.total_games += delta,
            Stat::Wins => player.wins += delta,
        }

        Ok(())
    }

    async fn apply_settlement(&self, batch: SettlementBatch) -> Result<HashMap<i64, f64>> {
        let mut players = self.players.write().await;

        // Validate the whole batch first; nothing below this loop can
        // fail, so a rejected batch leaves every account untouched
        for (user_id, delta) in &batch.deltas {
            let player = players
                .get(user_id)
                .ok_or(OrbArenaError::PlayerNotFound(*user_id))?;
            if player.balance + delta < 0.0 {
                return Err(OrbArenaError::InsufficientBalance {
                    balance: player.balance,
                    required: -delta,
                });
            }
        }
        if let Some(winner) = batch.winner_id {
            if !players.contains_key(&winner) {
                return Err(OrbArenaError::PlayerNotFound(winner));
            }
        }

        let mut balances = HashMap::new();
        for (user_id, delta) in &batch.deltas {
            if let Some(player) = players.get_mut(user_id) {
                player.balance += delta;
                player.total_games += 1;
                balances.insert(*user_id, player.balance);
            }
        }
        if let Some(winner) = batch.winner_id {
            if let Some(player) = players.get_mut(&winner) {
                player.wins += 1;
            }
        }

        // Appended while the players lock is held so no reader observes
        // mutated balances without the matching history entry
        self.history.write().await.push(batch.history);

        Ok(balances)
    }

    async fn connect_wallet(&self, user_id: i64, wallet_address: String) -> Result<()> {
        let mut players = self.players.write().await;
        let player = players
            .get_mut(&user_id)
            .ok_or(OrbArenaError::PlayerNotFound(user_id))?;

        player.wallet_address = Some(wallet_address);
        Ok(())
    }

    async fn record_history(&self, entry: HistoryRecord) -> Result<()> {
        self.history.write().await.push(entry);
        Ok(())
    }

    async fn record_transaction(&self, entry: TransactionRecord) -> Result<()> {
        self.transactions.write().await.push(entry);
        Ok(())
    }

    async fn history_for_room(&self, room_id: &str) -> Result<Vec<HistoryRecord>> {
        Ok(self
            .history
            .read()
            .await
            .iter()
            .filter(|entry| entry.room_id == room_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_is_upsert() {
        let store = MemoryAccountStore::new();

        let first = store
            .register_player(1, "alice".to_string(), None, 50.0)
            .await
            .unwrap();
        assert_eq!(first.balance, 50.0);

        // Re-registering refreshes the name, never resets the balance
        store.adjust_balance(1, -10.0).await.unwrap();
        let second = store
            .register_player(1, "alice2".to_string(), None, 999.0)
            .await
            .unwrap();
        assert_eq!(second.username, "alice2");
        assert_eq!(second.balance, 40.0);
    }

    #[tokio::test]
    async fn test_adjust_balance_floor() {
        let store = MemoryAccountStore::new();
        store
            .register_player(1, "alice".to_string(), None, 5.0)
            .await
            .unwrap();

        let result = store.adjust_balance(1, -10.0).await;
        assert!(matches!(
            result,
            Err(OrbArenaError::InsufficientBalance { .. })
        ));
        // Failed adjustment leaves the balance untouched
        assert_eq!(store.get_balance(1).await.unwrap(), 5.0);
    }

    #[tokio::test]
    async fn test_settlement_batch_all_or_nothing() {
        use crate::core::room::Participant;
        use chrono::Utc;

        let store = MemoryAccountStore::new();
        store
            .register_player(1, "alice".to_string(), None, 20.0)
            .await
            .unwrap();
        store
            .register_player(2, "bob".to_string(), None, 2.0)
            .await
            .unwrap();

        let history = HistoryRecord {
            room_id: "room_t".to_string(),
            wager: 5.0,
            winner_id: Some(1),
            participants: vec![
                Participant {
                    user_id: 1,
                    username: "alice".to_string(),
                    ready: true,
                },
                Participant {
                    user_id: 2,
                    username: "bob".to_string(),
                    ready: true,
                },
            ],
            results: HashMap::new(),
            completed_at: Utc::now(),
        };

        // Bob cannot absorb his debit; Alice's debit, which the store
        // would apply first, must not land either
        let result = store
            .apply_settlement(SettlementBatch {
                deltas: vec![(1, -5.0), (2, -5.0)],
                winner_id: Some(1),
                history,
            })
            .await;
        assert!(matches!(
            result,
            Err(OrbArenaError::InsufficientBalance { .. })
        ));

        let alice = store.get_player(1).await.unwrap();
        let bob = store.get_player(2).await.unwrap();
        assert_eq!(alice.balance, 20.0);
        assert_eq!(bob.balance, 2.0);
        assert_eq!(alice.total_games, 0);
        assert_eq!(alice.wins, 0);
        assert!(store.history_for_room("room_t").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_player() {
        let store = MemoryAccountStore::new();
        assert!(matches!(
            store.get_balance(42).await,
            Err(OrbArenaError::PlayerNotFound(42))
        ));
    }
}
