//! Server configuration module
//! Handles dynamic configuration parameters for the arena server

use crate::constants::{DEFAULT_HOST, DEFAULT_PAYOUT_SCALE, DEFAULT_PORT};
use crate::error::{OrbArenaError, Result};
use std::env;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Divisor applied to reported orb counts during settlement
    pub payout_scale: f64,
}

impl ServerConfig {
    /// Create a test configuration
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            payout_scale: DEFAULT_PAYOUT_SCALE,
        }
    }

    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let host = env::var("ORB_ARENA_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let port = env::var("ORB_ARENA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let payout_scale = match env::var("ORB_ARENA_PAYOUT_SCALE") {
            Ok(raw) => raw.parse().map_err(|_| {
                OrbArenaError::ConfigError(format!(
                    "ORB_ARENA_PAYOUT_SCALE must be a number, got '{}'",
                    raw
                ))
            })?,
            Err(_) => DEFAULT_PAYOUT_SCALE,
        };

        if payout_scale <= 0.0 {
            return Err(OrbArenaError::ConfigError(
                "ORB_ARENA_PAYOUT_SCALE must be positive".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            payout_scale,
        })
    }
}
