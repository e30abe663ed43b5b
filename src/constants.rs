// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3030;

// Room economics
pub const ALLOWED_WAGERS: [f64; 4] = [1.0, 3.0, 5.0, 10.0];
pub const MAX_PLAYERS: usize = 10;
/// A room flips from Waiting to Active the first time it holds this many players
pub const ACTIVATION_THRESHOLD: usize = 2;

/// Divisor applied to reported orb counts before scaling by the pot.
/// Inherited from the source economy where counts arrive pre-normalized
/// to a percentage-like scale. Overridable via ORB_ARENA_PAYOUT_SCALE.
pub const DEFAULT_PAYOUT_SCALE: f64 = 100.0;
