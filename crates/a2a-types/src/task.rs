//! Task delegation data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A closed enumeration of task kinds, with a `Custom` escape hatch so the
/// field stays string-compatible at the wire boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Code,
    Review,
    Research,
    Analysis,
    Test,
    Document,
    Deploy,
    Monitor,
    Maintenance,
    Custom(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum TaskPriority {
    Low = 1,
    Normal = 2,
    High = 3,
    Critical = 4,
    Emergency = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Timeout,
    Rejected,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Timeout | Self::Rejected
        )
    }

    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deliverable {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub criteria: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDelegation {
    pub task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
    pub delegator_id: String,
    pub delegatee_id: String,
    pub task_type: TaskType,
    pub title: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub deliverables: Vec<Deliverable>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub reward_amount: u64,
    pub reward_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escrow_id: Option<String>,
    pub context: serde_json::Value,
    pub dependencies: Vec<String>,
    pub required_capabilities: BTreeSet<String>,
}

/// A recorded state transition in a task's lifecycle, used for audit
/// history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskHistoryEntry {
    pub from: TaskStatus,
    pub to: TaskStatus,
    pub at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// The full set of verification rule kinds, closed apart from the
/// `Custom(name)` escape hatch for caller-registered handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationRuleType {
    FileExists,
    FileContent,
    CodeQuality,
    TestCoverage,
    Documentation,
    SecurityCheck,
    Performance,
    Custom(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRule {
    pub id: String,
    #[serde(rename = "type")]
    pub rule_type: VerificationRuleType,
    pub criteria: serde_json::Value,
    /// Weight in `[0, 1]`.
    pub weight: f64,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Passed,
    Failed,
    Partial,
    Skipped,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub status: VerificationStatus,
    /// Score in `[0, 100]`.
    pub score: f64,
    pub details: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityLevel {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

impl QualityLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::Excellent
        } else if score >= 75.0 {
            Self::Good
        } else if score >= 60.0 {
            Self::Acceptable
        } else {
            Self::Poor
        }
    }
}

/// The overall verdict for a delegation's deliverables, computed from its
/// rule results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerificationStatus,
    pub weighted_score: f64,
    pub quality: QualityLevel,
    pub rule_results: Vec<(String, VerificationResult)>,
}
