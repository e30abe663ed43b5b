//! Core functionality for the arena server

pub mod arena;
pub mod directory;
pub mod room;
pub mod settlement;

// Re-export main components for convenience
pub use arena::{ArenaManager, SharedArenaManager};
pub use directory::{Connection, ConnectionDirectory};
pub use room::{Participant, Room, RoomRegistry, RoomStatus};
pub use settlement::{SettlementEngine, SettlementReport};
