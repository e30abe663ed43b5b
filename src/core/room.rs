use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::constants::{ACTIVATION_THRESHOLD, ALLOWED_WAGERS, MAX_PLAYERS};
use crate::error::{OrbArenaError, Result};

/// Lifecycle of a wagered session. Transitions are strictly forward:
/// Waiting -> Active -> Finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Active,
    Finished,
}

/// A player seated in a room, in join order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: i64,
    pub username: String,
    pub ready: bool,
}

/// A wagered multiplayer session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Unique identifier for the room
    pub id: String,
    /// Stake every participant commits; immutable after creation
    pub wager: f64,
    /// Seated players in join order
    pub participants: Vec<Participant>,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
    /// Set while a settlement is in flight; a marked room is invisible
    /// to further settle calls
    #[serde(skip)]
    settling: bool,
}

impl Room {
    pub fn new(id: String, wager: f64, owner_id: i64, owner_name: String) -> Self {
        Self {
            id,
            wager,
            participants: vec![Participant {
                user_id: owner_id,
                username: owner_name,
                ready: true,
            }],
            status: RoomStatus::Waiting,
            created_at: Utc::now(),
            settling: false,
        }
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn has_participant(&self, user_id: i64) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }

    /// Joinable means accepting more players: still waiting, below
    /// capacity, and not snapshotted for settlement
    pub fn is_joinable(&self) -> bool {
        self.status == RoomStatus::Waiting
            && self.participant_count() < MAX_PLAYERS
            && !self.settling
    }

    /// Seats a player. Capacity, wager and duplicate checks happen here so
    /// that the registry can run them inside a single critical section.
    fn add_participant(&mut self, user_id: i64, username: String, wager: f64) -> Result<()> {
        if wager != self.wager {
            return Err(OrbArenaError::WagerMismatch {
                expected: self.wager,
                got: wager,
            });
        }
        if self.participant_count() >= MAX_PLAYERS {
            return Err(OrbArenaError::RoomFull);
        }
        if self.has_participant(user_id) {
            return Err(OrbArenaError::ValidationError(format!(
                "Player {} already in room {}",
                user_id, self.id
            )));
        }

        self.participants.push(Participant {
            user_id,
            username,
            ready: true,
        });

        // One-way flip; a room never reverts to Waiting
        if self.status == RoomStatus::Waiting && self.participant_count() >= ACTIVATION_THRESHOLD {
            self.status = RoomStatus::Active;
        }

        Ok(())
    }
}

/// Authoritative in-memory table of active sessions.
///
/// Every read-then-write sequence on a room (join capacity check plus
/// append, settlement begin/finish) runs under one write lock, so
/// concurrent calls targeting the same room serialize. No account-store
/// call ever happens while the lock is held.
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<String, Room>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a room with the owner as sole participant and returns a
    /// snapshot. Fails with `InvalidWager` for stakes outside the
    /// enumerated set. Balance validation is the caller's job.
    pub async fn create(&self, owner_id: i64, owner_name: String, wager: f64) -> Result<Room> {
        if !ALLOWED_WAGERS.contains(&wager) {
            return Err(OrbArenaError::InvalidWager(wager));
        }

        let mut rooms = self.rooms.write().await;

        // Timestamp plus random suffix; loop covers the same-instant case
        let id = loop {
            let candidate = format!(
                "room_{}_{}_{:04x}",
                owner_id,
                Utc::now().timestamp(),
                rand::thread_rng().gen_range(0u16..=0xffff)
            );
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        let room = Room::new(id.clone(), wager, owner_id, owner_name);
        rooms.insert(id, room.clone());

        log::info!(
            "Room {} created by player {} with wager {}",
            room.id,
            owner_id,
            wager
        );
        Ok(room)
    }

    /// Snapshot of rooms still accepting players
    pub async fn list_joinable(&self) -> Vec<Room> {
        self.rooms
            .read()
            .await
            .values()
            .filter(|room| room.is_joinable())
            .cloned()
            .collect()
    }

    /// Seats a player in a room and returns the updated snapshot.
    /// Capacity check and append run under one write lock, so two joins
    /// racing for the last slot cannot both succeed.
    pub async fn join(
        &self,
        room_id: &str,
        user_id: i64,
        username: String,
        wager: f64,
    ) -> Result<Room> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(room_id).ok_or(OrbArenaError::RoomNotFound)?;

        // A settling room is already snapshotted for payout; a seat added
        // now would vanish unsettled when the room is retired
        if room.settling {
            return Err(OrbArenaError::RoomNotFound);
        }

        room.add_participant(user_id, username, wager)?;

        log::info!(
            "Player {} joined room {} ({}/{} seats, status {:?})",
            user_id,
            room_id,
            room.participant_count(),
            MAX_PLAYERS,
            room.status
        );
        Ok(room.clone())
    }

    /// Snapshot of a single room, if present
    pub async fn get(&self, room_id: &str) -> Option<Room> {
        self.rooms.read().await.get(room_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }

    /// Atomically marks a room as settling and returns a snapshot of it.
    /// A room already marked, or absent, fails with `RoomNotFound`; that
    /// makes a second settle attempt fail cleanly even while the first is
    /// still in flight.
    pub async fn begin_settlement(&self, room_id: &str) -> Result<Room> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(room_id).ok_or(OrbArenaError::RoomNotFound)?;

        if room.settling {
            return Err(OrbArenaError::RoomNotFound);
        }
        room.settling = true;

        Ok(room.clone())
    }

    /// Clears the settling mark after an engine failure so the caller can
    /// retry the settlement
    pub async fn abort_settlement(&self, room_id: &str) {
        if let Some(room) = self.rooms.write().await.get_mut(room_id) {
            room.settling = false;
            log::warn!("Settlement of room {} aborted, room kept for retry", room_id);
        }
    }

    /// Terminal step: removes the room. Only called after the settlement
    /// engine reports success.
    pub async fn finish_settlement(&self, room_id: &str) {
        if self.rooms.write().await.remove(room_id).is_some() {
            log::info!("Room {} settled and retired", room_id);
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
