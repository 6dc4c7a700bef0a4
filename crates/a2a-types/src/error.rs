//! Error taxonomy for the A2A coordination fabric.
//!
//! Every crate in the workspace defines its own domain error enum and
//! converts it into [`A2aError`] at the boundary. `A2aError` is the type
//! public APIs return to callers; it never leaks implementation-internal
//! variants (see [`A2aError::Internal`]).

use thiserror::Error;

/// Assigns a stable, machine-readable string code to an error so that
/// callers across process/language boundaries can match on it without
/// string-matching the human-readable message.
pub trait ErrorCode {
    /// The unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// The top-level error taxonomy shared across the workspace.
#[derive(Debug, Error)]
pub enum A2aError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("replay detected for sender {sender_id}")]
    ReplayDetected { sender_id: String },

    #[error("session {session_id} expired")]
    SessionExpired { session_id: String },

    #[error("session {session_id} not found")]
    SessionNotFound { session_id: String },

    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: i128, requested: i128 },

    #[error("quorum not reached: {participating} of {required} required")]
    QuorumNotReached { participating: f64, required: f64 },

    #[error("voting is closed for proposal {proposal_id}")]
    VotingClosed { proposal_id: String },

    #[error("proposal {0} not found")]
    ProposalNotFound(String),

    #[error("timelock for {0} has not elapsed")]
    TimelockNotElapsed(String),

    #[error("timelock is paused")]
    TimelockPaused,

    #[error("{0} expired")]
    Expired(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error")]
    Internal,
}

impl ErrorCode for A2aError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::AuthenticationFailed(_) => "AUTHENTICATION_FAILED",
            Self::ReplayDetected { .. } => "REPLAY_DETECTED",
            Self::SessionExpired { .. } => "SESSION_EXPIRED",
            Self::SessionNotFound { .. } => "SESSION_NOT_FOUND",
            Self::HandshakeFailed(_) => "HANDSHAKE_FAILED",
            Self::PreconditionFailed(_) => "PRECONDITION_FAILED",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::QuorumNotReached { .. } => "QUORUM_NOT_REACHED",
            Self::VotingClosed { .. } => "VOTING_CLOSED",
            Self::ProposalNotFound(_) => "PROPOSAL_NOT_FOUND",
            Self::TimelockNotElapsed(_) => "TIMELOCK_NOT_ELAPSED",
            Self::TimelockPaused => "TIMELOCK_PAUSED",
            Self::Expired(_) => "EXPIRED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Unavailable(_) => "UNAVAILABLE",
            Self::Cancelled => "CANCELLED",
            Self::Internal => "INTERNAL",
        }
    }
}

impl A2aError {
    /// True for errors a caller may retry with bounded exponential backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Unavailable(_) | Self::TimelockPaused
        )
    }

    /// Wraps an unexpected invariant violation, logging full context and
    /// returning the opaque, caller-facing variant so internals never leak.
    pub fn internal<E: std::fmt::Debug>(context: &str, err: E) -> Self {
        tracing::error!(context, error = ?err, "internal invariant violation");
        Self::Internal
    }
}

pub type Result<T> = std::result::Result<T, A2aError>;
