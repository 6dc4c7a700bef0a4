//! Local error type for the `a2a-registry` crate.

use a2a_types::error::{A2aError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("entity {0} not found")]
    NotFound(String),
    #[error("gossip peer unavailable: {0}")]
    PeerUnavailable(String),
    #[error("malformed registry entry: {0}")]
    Malformed(String),
}

impl ErrorCode for RegistryError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "REGISTRY_NOT_FOUND",
            Self::PeerUnavailable(_) => "REGISTRY_PEER_UNAVAILABLE",
            Self::Malformed(_) => "REGISTRY_MALFORMED_ENTRY",
        }
    }
}

impl From<RegistryError> for A2aError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(entity_id) => A2aError::NotFound(entity_id),
            RegistryError::PeerUnavailable(reason) => A2aError::Unavailable(reason),
            RegistryError::Malformed(reason) => A2aError::InvalidArgument(reason),
        }
    }
}
