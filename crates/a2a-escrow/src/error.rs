//! Local error type for the `a2a-escrow` crate.

use a2a_types::error::{A2aError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EscrowError {
    #[error("escrow {0} not found")]
    NotFound(String),
    #[error("escrow already exists for task {0}")]
    DuplicateForTask(String),
    #[error("invalid escrow amount: {0}")]
    InvalidAmount(i128),
    #[error("missing client or provider id")]
    MissingParty,
    #[error("invalid escrow transition: {from:?} -> {attempted}")]
    InvalidTransition {
        from: a2a_types::escrow::EscrowStatus,
        attempted: String,
    },
    #[error("wallet not registered: {0}")]
    WalletNotRegistered(String),
    #[error("insufficient balance: {held} available, {requested} requested")]
    InsufficientBalance { held: i128, requested: i128 },
    #[error("resolution amount {resolution} exceeds escrow amount {amount}")]
    ResolutionExceedsAmount { resolution: u64, amount: u64 },
}

impl ErrorCode for EscrowError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "ESCROW_NOT_FOUND",
            Self::DuplicateForTask(_) => "ESCROW_DUPLICATE_FOR_TASK",
            Self::InvalidAmount(_) => "ESCROW_INVALID_AMOUNT",
            Self::MissingParty => "ESCROW_MISSING_PARTY",
            Self::InvalidTransition { .. } => "ESCROW_INVALID_TRANSITION",
            Self::WalletNotRegistered(_) => "ESCROW_WALLET_NOT_REGISTERED",
            Self::InsufficientBalance { .. } => "ESCROW_INSUFFICIENT_BALANCE",
            Self::ResolutionExceedsAmount { .. } => "ESCROW_RESOLUTION_EXCEEDS_AMOUNT",
        }
    }
}

impl From<EscrowError> for A2aError {
    fn from(err: EscrowError) -> Self {
        match err {
            EscrowError::NotFound(id) => A2aError::NotFound(id),
            EscrowError::InsufficientBalance { held, requested } => {
                A2aError::InsufficientFunds { balance: held, requested }
            }
            EscrowError::InvalidTransition { from, attempted } => {
                A2aError::PreconditionFailed(format!("{from:?} -> {attempted}"))
            }
            other => A2aError::InvalidArgument(other.to_string()),
        }
    }
}
