//! Local error type for the `a2a-session` crate.

use a2a_types::error::{A2aError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(String),
    #[error("session {0} expired")]
    Expired(String),
    #[error("peer mismatch on session {0}")]
    PeerMismatch(String),
    #[error("sequence number rejected: {0}")]
    SequenceRejected(String),
    #[error("replay detected: {0}")]
    ReplayDetected(String),
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),
    #[error("invalid handshake state transition: {from:?} -> {attempted}")]
    InvalidTransition { from: String, attempted: String },
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("operation cancelled")]
    Cancelled,
}

impl ErrorCode for SessionError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "SESSION_NOT_FOUND",
            Self::Expired(_) => "SESSION_EXPIRED",
            Self::PeerMismatch(_) => "SESSION_PEER_MISMATCH",
            Self::SequenceRejected(_) => "SESSION_SEQUENCE_REJECTED",
            Self::ReplayDetected(_) => "SESSION_REPLAY_DETECTED",
            Self::HandshakeFailed(_) => "SESSION_HANDSHAKE_FAILED",
            Self::InvalidTransition { .. } => "SESSION_INVALID_TRANSITION",
            Self::RateLimited { .. } => "SESSION_RATE_LIMITED",
            Self::Cancelled => "SESSION_CANCELLED",
        }
    }
}

impl From<SessionError> for A2aError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(session_id) => A2aError::SessionNotFound { session_id },
            SessionError::Expired(session_id) => A2aError::SessionExpired { session_id },
            SessionError::ReplayDetected(sender_id) => A2aError::ReplayDetected { sender_id },
            SessionError::RateLimited { retry_after_ms } => A2aError::RateLimited { retry_after_ms },
            SessionError::Cancelled => A2aError::Cancelled,
            other => A2aError::HandshakeFailed(other.to_string()),
        }
    }
}
