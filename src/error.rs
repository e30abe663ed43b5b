use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum OrbArenaError {
    // Room lifecycle errors
    RoomNotFound,
    RoomFull,
    InvalidWager(f64),
    WagerMismatch { expected: f64, got: f64 },

    // Account errors
    PlayerNotFound(i64),
    InsufficientBalance { balance: f64, required: f64 },

    // Settlement errors
    SettlementFailed(String),

    // Validation errors
    ValidationError(String),

    // Configuration errors
    ConfigError(String),
}

impl fmt::Display for OrbArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoomNotFound => write!(f, "Room not found"),
            Self::RoomFull => write!(f, "Room is full"),
            Self::InvalidWager(amount) => {
                write!(f, "Invalid wager amount: {}. Choose 1, 3, 5, or 10", amount)
            }
            Self::WagerMismatch { expected, got } => {
                write!(f, "Wager mismatch: room stake is {}, got {}", expected, got)
            }
            Self::PlayerNotFound(id) => write!(f, "Player not found: {}", id),
            Self::InsufficientBalance { balance, required } => {
                write!(f, "Insufficient balance: has {}, needs {}", balance, required)
            }
            Self::SettlementFailed(msg) => write!(f, "Settlement failed: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for OrbArenaError {}

impl OrbArenaError {
    /// HTTP status code this error maps to at the API boundary
    pub fn status_code(&self) -> warp::http::StatusCode {
        use warp::http::StatusCode;
        match self {
            Self::RoomNotFound | Self::PlayerNotFound(_) => StatusCode::NOT_FOUND,
            Self::RoomFull
            | Self::InvalidWager(_)
            | Self::WagerMismatch { .. }
            | Self::InsufficientBalance { .. }
            | Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::SettlementFailed(_) | Self::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Generic result type for the crate
pub type Result<T> = std::result::Result<T, OrbArenaError>;
