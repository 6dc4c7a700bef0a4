//! Agent identity and key material.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The public, directory-visible description of an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentIdentity {
    /// Stable string identifying the agent across sessions and restarts.
    pub agent_id: String,
    pub display_name: String,
    /// Raw 32-byte Ed25519 public key.
    #[serde(with = "serde_bytes")]
    pub ed25519_public_key: Vec<u8>,
    pub endpoint: String,
    pub capabilities: BTreeSet<String>,
    /// Reputation score in `[0, 1]`.
    pub reputation: f64,
}

impl AgentIdentity {
    pub fn new(
        agent_id: impl Into<String>,
        display_name: impl Into<String>,
        ed25519_public_key: [u8; 32],
        endpoint: impl Into<String>,
        capabilities: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            display_name: display_name.into(),
            ed25519_public_key: ed25519_public_key.to_vec(),
            endpoint: endpoint.into(),
            capabilities: capabilities.into_iter().collect(),
            reputation: 0.5,
        }
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reputation_defaults_within_bounds() {
        let id = AgentIdentity::new("alpha", "Alpha", [0u8; 32], "tcp://a", ["store".into()]);
        assert!(id.reputation >= 0.0 && id.reputation <= 1.0);
        assert!(id.has_capability("store"));
        assert!(!id.has_capability("search"));
    }
}
