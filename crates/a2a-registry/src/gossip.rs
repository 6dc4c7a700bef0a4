//! Push-pull gossip dissemination.
//!
//! The registry itself stays transport-agnostic: a gossip round talks to
//! peers through the [`GossipPeer`] trait, so `a2a-node` can back it with
//! whatever `Transport` it wires up (an in-process channel for tests, a real
//! socket for production) without this crate depending on either.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use rand::seq::SliceRandom;

use a2a_types::registry::RegistryEntry;

use crate::entry_store::Registry;
use crate::error::RegistryError;

pub type Digest = BTreeMap<String, u64>;

/// One gossip peer, addressed however the caller likes (a node id, an
/// endpoint string). A round trip is a push-pull exchange: send a digest,
/// get back the entries the peer judges newer.
#[async_trait]
pub trait GossipPeer: Send + Sync {
    fn peer_id(&self) -> &str;
    async fn exchange(&self, digest: Digest) -> Result<Vec<RegistryEntry>, RegistryError>;
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Small per-peer token bucket so a single chatty peer can't monopolize a
/// gossip round.
struct PeerLimiter {
    rate: f64,
    burst: f64,
    buckets: DashMap<String, Bucket>,
}

impl PeerLimiter {
    fn new(rate: f64, burst: f64) -> Self {
        Self {
            rate,
            burst,
            buckets: DashMap::new(),
        }
    }

    fn try_acquire(&self, peer_id: &str) -> bool {
        let mut bucket = self.buckets.entry(peer_id.to_string()).or_insert_with(|| Bucket {
            tokens: self.burst,
            last_refill: Instant::now(),
        });
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.burst);
        bucket.last_refill = now;
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Drives one gossip round against a fixed peer set: picks up to
/// `max_gossip_peers` random peers, exchanges digests, merges whatever each
/// peer returns. A single unresponsive peer never aborts the round.
pub struct GossipRunner {
    registry: Arc<Registry>,
    max_gossip_peers: usize,
    limiter: PeerLimiter,
}

impl GossipRunner {
    pub fn new(registry: Arc<Registry>, max_gossip_peers: usize) -> Self {
        Self {
            registry,
            max_gossip_peers,
            limiter: PeerLimiter::new(10.0, 10.0),
        }
    }

    /// Runs one round against a subset of `peers`, returns the number of
    /// entries merged in.
    pub async fn run_round(&self, peers: &[Arc<dyn GossipPeer>]) -> usize {
        let mut rng = rand::thread_rng();
        let mut chosen: Vec<Arc<dyn GossipPeer>> = peers.to_vec();
        chosen.shuffle(&mut rng);
        chosen.truncate(self.max_gossip_peers);

        let digest = self.registry.digest();
        let mut merged = 0;
        for peer in chosen {
            if !self.limiter.try_acquire(peer.peer_id()) {
                tracing::debug!(peer = peer.peer_id(), "gossip peer rate limited, skipping this round");
                continue;
            }
            match peer.exchange(digest.clone()).await {
                Ok(entries) => {
                    for entry in entries {
                        self.registry.merge_entry(entry);
                        merged += 1;
                    }
                }
                Err(err) => {
                    tracing::warn!(peer = peer.peer_id(), error = %err, "gossip exchange failed");
                }
            }
        }
        merged
    }

    /// The handler side of an exchange: given a peer's digest, returns the
    /// entries this node judges newer.
    pub fn respond_to_digest(&self, peer_digest: &Digest) -> Vec<RegistryEntry> {
        self.registry.entries_newer_than(peer_digest)
    }
}
