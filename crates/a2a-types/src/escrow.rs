//! Escrow data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    Created,
    Locked,
    Completed,
    Released,
    Cancelled,
    Disputed,
    Expired,
}

impl EscrowStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Released | Self::Cancelled | Self::Expired)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Pending,
    ClientWins,
    ProviderWins,
    Split,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escrow {
    pub escrow_id: String,
    pub task_id: String,
    pub client_id: String,
    pub provider_id: String,
    pub amount: u64,
    pub status: EscrowStatus,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispute_reason: Option<String>,
    pub resolution: Resolution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_amount: Option<u64>,
}

impl Escrow {
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}
