//! Adapts a remote node's [`Registry`] directly into a
//! [`GossipPeer`], the in-process stand-in for a real network hop.

use std::sync::Arc;

use async_trait::async_trait;

use a2a_registry::gossip::{Digest, GossipPeer};
use a2a_registry::GossipRunner;
use a2a_registry::RegistryError;
use a2a_types::registry::RegistryEntry;

pub struct DirectRegistryPeer {
    id: String,
    runner: Arc<GossipRunner>,
}

impl DirectRegistryPeer {
    pub fn new(id: impl Into<String>, runner: Arc<GossipRunner>) -> Self {
        Self { id: id.into(), runner }
    }
}

#[async_trait]
impl GossipPeer for DirectRegistryPeer {
    fn peer_id(&self) -> &str {
        &self.id
    }

    async fn exchange(&self, digest: Digest) -> Result<Vec<RegistryEntry>, RegistryError> {
        Ok(self.runner.respond_to_digest(&digest))
    }
}
