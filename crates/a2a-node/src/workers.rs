//! Background workers: gossip, escrow expiry sweeper, governance execution
//! queue processor.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use tokio_util::sync::CancellationToken;

use crate::gossip_peer::DirectRegistryPeer;
use crate::node::Node;

/// Runs gossip rounds against `peers` every `gossip_interval_seconds` until
/// cancelled.
pub fn spawn_gossip_worker(
    node: Arc<Node>,
    peers: Vec<Arc<DirectRegistryPeer>>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let peers: Vec<Arc<dyn a2a_registry::gossip::GossipPeer>> =
        peers.into_iter().map(|p| p as Arc<dyn a2a_registry::gossip::GossipPeer>).collect();
    let interval = StdDuration::from_secs(node.config.gossip_interval_seconds);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let merged = node.gossip.run_round(&peers).await;
                    tracing::debug!(merged, "gossip round complete");
                }
            }
        }
    })
}

/// Sweeps expired escrows every `escrow_expiry_poll_seconds`.
pub fn spawn_escrow_sweeper(node: Arc<Node>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    let interval = StdDuration::from_secs(node.config.escrow_expiry_poll_seconds);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let expired = node.escrow.check_expired_escrows();
                    if !expired.is_empty() {
                        tracing::info!(count = expired.len(), "swept expired escrows");
                    }
                }
            }
        }
    })
}

/// Polls the timelock queue for executable transactions and runs them.
/// A single failing proposal never halts the loop.
pub fn spawn_execution_worker(node: Arc<Node>, executor_id: String, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    let interval = StdDuration::from_secs(1);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    for tx in node.governance.timelock.get_executable_transactions() {
                        match node.governance.execute_queued(&tx.id, &executor_id) {
                            Ok(outcome) => tracing::info!(tx_id = %tx.id, ?outcome, "executed queued transaction"),
                            Err(err) => tracing::warn!(tx_id = %tx.id, error = %err, "queued transaction execution failed"),
                        }
                    }
                }
            }
        }
    })
}
