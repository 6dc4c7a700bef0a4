//! Governance data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalType {
    ParameterChange,
    Upgrade,
    TokenAllocation,
    Emergency,
}

impl ProposalType {
    pub fn is_emergency(self) -> bool {
        matches!(self, Self::Emergency)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Active,
    Canceled,
    Defeated,
    Succeeded,
    Queued,
    Expired,
    Executed,
}

impl ProposalStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Executed | Self::Expired | Self::Canceled | Self::Defeated)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub target_namespace: String,
    pub function_name: String,
    pub parameters: BTreeMap<String, serde_json::Value>,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tallies {
    pub for_votes: f64,
    pub against: f64,
    pub abstain: f64,
}

impl Tallies {
    pub fn total(&self) -> f64 {
        self.for_votes + self.against + self.abstain
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub proposer: String,
    pub title: String,
    pub description: String,
    pub proposal_type: ProposalType,
    pub actions: Vec<Action>,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub discussion_end: DateTime<Utc>,
    pub voting_start: DateTime<Utc>,
    pub voting_end: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queued_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
    pub tallies: Tallies,
    pub voters: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    For,
    Against,
    Abstain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub voter: String,
    pub proposal_id: String,
    pub choice: VoteChoice,
    pub voting_power: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelockStatus {
    Pending,
    Executable,
    Executed,
    Expired,
    Canceled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedTransaction {
    pub id: String,
    pub proposal_id: String,
    pub queued_at: DateTime<Utc>,
    pub executable_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: TimelockStatus,
    pub is_emergency: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
}
