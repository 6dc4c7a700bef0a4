//! External interfaces consumed by the core: `#[async_trait]` traits owned
//! by a `Send + Sync` implementor, so components can depend on the trait
//! object rather than a concrete storage/transport backend.

use async_trait::async_trait;

use crate::error::A2aError;

/// Minimal key-value interface the registry, session manager, escrow, and
/// governance persist state through. Real persistence backends are
/// explicitly out of scope; this crate only defines the contract, and
/// `a2a-node` supplies an in-memory reference implementation.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), A2aError>;
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, A2aError>;
    async fn delete(&self, key: &[u8]) -> Result<(), A2aError>;
    async fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, A2aError>;

    /// Atomic compare-and-swap, required by the token ledger.
    async fn put_if(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new_value: &[u8],
    ) -> Result<bool, A2aError>;
}

/// Any reliable bidirectional message transport. Duplicate delivery is
/// tolerated by the replay/sequence layer, so the transport need not
/// dedupe.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, recipient_endpoint: &str, bytes: Vec<u8>) -> Result<(), A2aError>;
}
