//! Account storage: the durable side of balances, stats and history

pub mod memory;
pub mod traits;

pub use memory::MemoryAccountStore;
pub use traits::{AccountStore, HistoryRecord, PlayerRecord, Stat, TransactionRecord};
