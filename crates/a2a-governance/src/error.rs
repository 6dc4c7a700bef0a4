//! Local error type for the `a2a-governance` crate.

use a2a_types::error::{A2aError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("proposal {0} not found")]
    ProposalNotFound(String),
    #[error("proposer balance {balance} below minimum {minimum} to propose")]
    InsufficientTokensToPropose { balance: u64, minimum: u64 },
    #[error("voter balance {balance} below minimum {minimum} to vote")]
    InsufficientTokensToVote { balance: u64, minimum: u64 },
    #[error("invalid proposal transition: {from:?} -> {attempted}")]
    InvalidTransition {
        from: a2a_types::governance::ProposalStatus,
        attempted: String,
    },
    #[error("voting is not open for proposal {0}")]
    VotingClosed(String),
    #[error("voter {voter} already voted on proposal {proposal_id}")]
    AlreadyVoted { voter: String, proposal_id: String },
    #[error("only the proposer may cancel, and only before voting starts")]
    CancelNotPermitted,
    #[error("proposal {0} has not succeeded and cannot be queued")]
    NotSucceeded(String),
    #[error("queued transaction {0} not found")]
    QueuedTransactionNotFound(String),
    #[error("timelock is paused")]
    TimelockPaused,
    #[error("timelock delay has not elapsed, executable at {0}")]
    TimelockNotElapsed(chrono::DateTime<chrono::Utc>),
    #[error("queued transaction {0} has expired")]
    TimelockExpired(String),
    #[error("{0} is not a recognized guardian")]
    NotGuardian(String),
    #[error("guardian action requires {needed} distinct signers, got {got}")]
    GuardianThresholdNotMet { needed: usize, got: usize },
    #[error("no execution handler registered for namespace {0}")]
    NoHandlerForNamespace(String),
    #[error("action execution failed: {0}")]
    ActionFailed(String),
}

impl ErrorCode for GovernanceError {
    fn code(&self) -> &'static str {
        match self {
            Self::ProposalNotFound(_) => "GOVERNANCE_PROPOSAL_NOT_FOUND",
            Self::InsufficientTokensToPropose { .. } => "GOVERNANCE_INSUFFICIENT_TOKENS_TO_PROPOSE",
            Self::InsufficientTokensToVote { .. } => "GOVERNANCE_INSUFFICIENT_TOKENS_TO_VOTE",
            Self::InvalidTransition { .. } => "GOVERNANCE_INVALID_TRANSITION",
            Self::VotingClosed(_) => "GOVERNANCE_VOTING_CLOSED",
            Self::AlreadyVoted { .. } => "GOVERNANCE_ALREADY_VOTED",
            Self::CancelNotPermitted => "GOVERNANCE_CANCEL_NOT_PERMITTED",
            Self::NotSucceeded(_) => "GOVERNANCE_NOT_SUCCEEDED",
            Self::QueuedTransactionNotFound(_) => "GOVERNANCE_QUEUED_TX_NOT_FOUND",
            Self::TimelockPaused => "GOVERNANCE_TIMELOCK_PAUSED",
            Self::TimelockNotElapsed(_) => "GOVERNANCE_TIMELOCK_NOT_ELAPSED",
            Self::TimelockExpired(_) => "GOVERNANCE_TIMELOCK_EXPIRED",
            Self::NotGuardian(_) => "GOVERNANCE_NOT_GUARDIAN",
            Self::GuardianThresholdNotMet { .. } => "GOVERNANCE_GUARDIAN_THRESHOLD_NOT_MET",
            Self::NoHandlerForNamespace(_) => "GOVERNANCE_NO_HANDLER",
            Self::ActionFailed(_) => "GOVERNANCE_ACTION_FAILED",
        }
    }
}

impl From<GovernanceError> for A2aError {
    fn from(err: GovernanceError) -> Self {
        match err {
            GovernanceError::ProposalNotFound(id) => A2aError::ProposalNotFound(id),
            GovernanceError::QueuedTransactionNotFound(id) => A2aError::NotFound(id),
            GovernanceError::TimelockPaused => A2aError::TimelockPaused,
            GovernanceError::TimelockNotElapsed(at) => A2aError::TimelockNotElapsed(at.to_rfc3339()),
            GovernanceError::TimelockExpired(id) => A2aError::Expired(id),
            GovernanceError::VotingClosed(id) => A2aError::VotingClosed { proposal_id: id },
            GovernanceError::InvalidTransition { from, attempted } => {
                A2aError::PreconditionFailed(format!("{from:?} -> {attempted}"))
            }
            other => A2aError::InvalidArgument(other.to_string()),
        }
    }
}
