//! Escrow lifecycle and the internal token ledger it settles through.

pub mod error;
pub mod ledger;
pub mod manager;

pub use error::EscrowError;
pub use ledger::Ledger;
pub use manager::{EscrowHistoryEntry, EscrowManager, EscrowStatistics};
