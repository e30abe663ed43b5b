//! Settlement: converts reported results into balance deltas and retires
//! the stake.
//!
//! The engine buffers every delta and hands the whole batch to the
//! account store, which applies it in one transactional scope: a failed
//! settlement leaves every balance, stat counter and history entry
//! untouched. The caller keeps the room registered and may retry.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::constants::DEFAULT_PAYOUT_SCALE;
use crate::core::room::Room;
use crate::error::{OrbArenaError, Result};
use crate::storage::traits::{AccountStore, HistoryRecord, SettlementBatch};

/// Outcome of one settled room
#[derive(Debug, Clone, Serialize)]
pub struct SettlementReport {
    pub room_id: String,
    pub wager: f64,
    pub winner_id: Option<i64>,
    /// Net balance change per participant (payout minus stake)
    pub deltas: HashMap<i64, f64>,
    /// Balance of each participant after the settlement
    pub balances: HashMap<i64, f64>,
    pub settled_at: DateTime<Utc>,
}

pub struct SettlementEngine {
    store: Arc<dyn AccountStore>,
    /// Divisor applied to reported orb counts before scaling by the pot
    payout_scale: f64,
}

impl SettlementEngine {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self::with_payout_scale(store, DEFAULT_PAYOUT_SCALE)
    }

    pub fn with_payout_scale(store: Arc<dyn AccountStore>, payout_scale: f64) -> Self {
        Self {
            store,
            payout_scale,
        }
    }

    /// Settles a room: every participant stakes the wager and counts a
    /// game played; participants with a positive orb count earn a share
    /// of the pot; the winner's win counter increments. The room snapshot
    /// must come from `RoomRegistry::begin_settlement`.
    pub async fn settle(
        &self,
        room: &Room,
        results: &HashMap<i64, f64>,
        winner_id: Option<i64>,
    ) -> Result<SettlementReport> {
        let wager = room.wager;
        let pot = wager * room.participant_count() as f64;

        for (user_id, orbs) in results {
            if *orbs < 0.0 {
                return Err(OrbArenaError::ValidationError(format!(
                    "Negative orb count {} for player {}",
                    orbs, user_id
                )));
            }
            if !room.has_participant(*user_id) {
                return Err(OrbArenaError::ValidationError(format!(
                    "Result reported for player {} who is not in room {}",
                    user_id, room.id
                )));
            }
        }
        if let Some(winner) = winner_id {
            if !room.has_participant(winner) {
                return Err(OrbArenaError::ValidationError(format!(
                    "Winner {} is not in room {}",
                    winner, room.id
                )));
            }
        }

        // Buffer net deltas in join order: stake out for everyone,
        // payout in for anyone who collected orbs
        let mut buffered: Vec<(i64, f64)> = Vec::with_capacity(room.participant_count());
        for participant in &room.participants {
            let orbs = results.get(&participant.user_id).copied().unwrap_or(0.0);
            let payout = if orbs > 0.0 {
                (orbs / self.payout_scale) * pot
            } else {
                0.0
            };
            buffered.push((participant.user_id, payout - wager));
        }

        // Hand the whole batch to the store: deltas, counters and the
        // history entry apply together or not at all, so a failure here
        // leaves no partial debits and the caller keeps the room for a
        // retry
        let settled_at = Utc::now();
        let balances = self
            .store
            .apply_settlement(SettlementBatch {
                deltas: buffered.clone(),
                winner_id,
                history: HistoryRecord {
                    room_id: room.id.clone(),
                    wager,
                    winner_id,
                    participants: room.participants.clone(),
                    results: results.clone(),
                    completed_at: settled_at,
                },
            })
            .await
            .map_err(|e| OrbArenaError::SettlementFailed(e.to_string()))?;

        let deltas: HashMap<i64, f64> = buffered.into_iter().collect();

        log::info!(
            "Room {} settled: wager {}, pot {}, winner {:?}",
            room.id,
            wager,
            pot,
            winner_id
        );

        Ok(SettlementReport {
            room_id: room.id.clone(),
            wager,
            winner_id,
            deltas,
            balances,
            settled_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::room::Participant;
    use crate::storage::memory::MemoryAccountStore;

    fn two_player_room(wager: f64) -> Room {
        let mut room = Room::new("room_t".to_string(), wager, 1, "alice".to_string());
        room.participants.push(Participant {
            user_id: 2,
            username: "bob".to_string(),
            ready: true,
        });
        room
    }

    async fn store_with_players(balance: f64) -> Arc<MemoryAccountStore> {
        let store = Arc::new(MemoryAccountStore::new());
        store
            .register_player(1, "alice".to_string(), None, balance)
            .await
            .unwrap();
        store
            .register_player(2, "bob".to_string(), None, balance)
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_payout_arithmetic() {
        // wager 5, two players, results {A: 60, B: 0}, winner A:
        // A nets -5 + (60/100)*10 = +1, B nets -5
        let store = store_with_players(20.0).await;
        let engine = SettlementEngine::new(store.clone());
        let room = two_player_room(5.0);

        let mut results = HashMap::new();
        results.insert(1, 60.0);
        results.insert(2, 0.0);

        let report = engine.settle(&room, &results, Some(1)).await.unwrap();

        assert!((report.deltas[&1] - 1.0).abs() < 1e-9);
        assert!((report.deltas[&2] + 5.0).abs() < 1e-9);
        assert!((store.get_balance(1).await.unwrap() - 21.0).abs() < 1e-9);
        assert!((store.get_balance(2).await.unwrap() - 15.0).abs() < 1e-9);

        let alice = store.get_player(1).await.unwrap();
        let bob = store.get_player(2).await.unwrap();
        assert_eq!(alice.wins, 1);
        assert_eq!(bob.wins, 0);
        assert_eq!(alice.total_games, 1);
        assert_eq!(bob.total_games, 1);
    }

    #[tokio::test]
    async fn test_history_recorded() {
        let store = store_with_players(20.0).await;
        let engine = SettlementEngine::new(store.clone());
        let room = two_player_room(1.0);

        engine
            .settle(&room, &HashMap::new(), None)
            .await
            .unwrap();

        let history = store.history_for_room("room_t").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].wager, 1.0);
        assert_eq!(history[0].winner_id, None);
        assert_eq!(history[0].participants.len(), 2);
    }

    #[tokio::test]
    async fn test_insufficient_balance_aborts_before_apply() {
        // Bob holds less than the wager, so the whole settlement must
        // fail with no balance touched
        let store = Arc::new(MemoryAccountStore::new());
        store
            .register_player(1, "alice".to_string(), None, 20.0)
            .await
            .unwrap();
        store
            .register_player(2, "bob".to_string(), None, 2.0)
            .await
            .unwrap();
        let engine = SettlementEngine::new(store.clone());
        let room = two_player_room(5.0);

        let result = engine.settle(&room, &HashMap::new(), None).await;
        assert!(matches!(result, Err(OrbArenaError::SettlementFailed(_))));

        assert_eq!(store.get_balance(1).await.unwrap(), 20.0);
        assert_eq!(store.get_balance(2).await.unwrap(), 2.0);
        assert_eq!(store.get_player(1).await.unwrap().total_games, 0);
        assert!(store.history_for_room("room_t").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_outage_leaves_no_partial_debits() {
        use crate::storage::traits::{PlayerRecord, Stat, TransactionRecord};

        // Store whose settlement apply is down; everything else works.
        // No participant may be left debited when it fails.
        struct OutageStore {
            inner: MemoryAccountStore,
        }

        #[async_trait::async_trait]
        impl AccountStore for OutageStore {
            async fn register_player(
                &self,
                user_id: i64,
                username: String,
                wallet_address: Option<String>,
                initial_balance: f64,
            ) -> crate::error::Result<PlayerRecord> {
                self.inner
                    .register_player(user_id, username, wallet_address, initial_balance)
                    .await
            }
            async fn get_player(&self, user_id: i64) -> crate::error::Result<PlayerRecord> {
                self.inner.get_player(user_id).await
            }
            async fn get_balance(&self, user_id: i64) -> crate::error::Result<f64> {
                self.inner.get_balance(user_id).await
            }
            async fn adjust_balance(&self, user_id: i64, delta: f64) -> crate::error::Result<f64> {
                self.inner.adjust_balance(user_id, delta).await
            }
            async fn increment_stat(
                &self,
                user_id: i64,
                stat: Stat,
                delta: i64,
            ) -> crate::error::Result<()> {
                self.inner.increment_stat(user_id, stat, delta).await
            }
            async fn apply_settlement(
                &self,
                _batch: SettlementBatch,
            ) -> crate::error::Result<HashMap<i64, f64>> {
                Err(OrbArenaError::SettlementFailed(
                    "store unavailable".to_string(),
                ))
            }
            async fn connect_wallet(
                &self,
                user_id: i64,
                wallet_address: String,
            ) -> crate::error::Result<()> {
                self.inner.connect_wallet(user_id, wallet_address).await
            }
            async fn record_history(&self, entry: HistoryRecord) -> crate::error::Result<()> {
                self.inner.record_history(entry).await
            }
            async fn record_transaction(
                &self,
                entry: TransactionRecord,
            ) -> crate::error::Result<()> {
                self.inner.record_transaction(entry).await
            }
            async fn history_for_room(
                &self,
                room_id: &str,
            ) -> crate::error::Result<Vec<HistoryRecord>> {
                self.inner.history_for_room(room_id).await
            }
        }

        let store = Arc::new(OutageStore {
            inner: MemoryAccountStore::new(),
        });
        store
            .register_player(1, "alice".to_string(), None, 20.0)
            .await
            .unwrap();
        store
            .register_player(2, "bob".to_string(), None, 20.0)
            .await
            .unwrap();

        let engine = SettlementEngine::new(store.clone());
        let room = two_player_room(5.0);

        let mut results = HashMap::new();
        results.insert(1, 60.0);

        let outcome = engine.settle(&room, &results, Some(1)).await;
        assert!(matches!(outcome, Err(OrbArenaError::SettlementFailed(_))));

        // Neither balance nor any counter moved
        let alice = store.get_player(1).await.unwrap();
        let bob = store.get_player(2).await.unwrap();
        assert_eq!(alice.balance, 20.0);
        assert_eq!(bob.balance, 20.0);
        assert_eq!(alice.total_games, 0);
        assert_eq!(alice.wins, 0);
        assert!(store.history_for_room("room_t").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_result_for_stranger_rejected() {
        let store = store_with_players(20.0).await;
        let engine = SettlementEngine::new(store);
        let room = two_player_room(1.0);

        let mut results = HashMap::new();
        results.insert(99, 50.0);

        let result = engine.settle(&room, &results, None).await;
        assert!(matches!(result, Err(OrbArenaError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_custom_payout_scale() {
        let store = store_with_players(20.0).await;
        let engine = SettlementEngine::with_payout_scale(store.clone(), 200.0);
        let room = two_player_room(5.0);

        let mut results = HashMap::new();
        results.insert(1, 60.0);

        let report = engine.settle(&room, &results, None).await.unwrap();
        // (60/200) * 10 - 5 = -2
        assert!((report.deltas[&1] + 2.0).abs() < 1e-9);
    }
}
