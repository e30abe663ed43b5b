//! Orb Arena - a wagered real-time multiplayer session server
//!
//! This library provides the room lifecycle, real-time relay and
//! settlement core for short-lived skill contests with a staked wager.

pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;
pub mod storage;

// Re-export main components
pub use config::*;
pub use constants::*;
