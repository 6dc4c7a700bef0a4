//! Top-level wiring: every manager constructed explicitly, no implicit
//! singletons.

use std::sync::Arc;

use chrono::Duration;

use a2a_escrow::{EscrowManager, Ledger};
use a2a_governance::GovernanceEngine;
use a2a_registry::{GossipRunner, Registry};
use a2a_session::SessionManager;
use a2a_tasks::TaskTracker;
use a2a_types::config::Config;
use a2a_types::interfaces::{Storage, Transport};

pub struct Node {
    pub node_id: String,
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub transport: Arc<dyn Transport>,
    pub sessions: Arc<SessionManager>,
    pub registry: Arc<Registry>,
    pub gossip: Arc<GossipRunner>,
    pub tasks: Arc<TaskTracker>,
    pub ledger: Arc<Ledger>,
    pub escrow: Arc<EscrowManager>,
    pub governance: Arc<GovernanceEngine>,
}

impl Node {
    pub fn new(
        node_id: impl Into<String>,
        config: Config,
        storage: Arc<dyn Storage>,
        transport: Arc<dyn Transport>,
        total_token_supply: f64,
    ) -> Self {
        let node_id = node_id.into();
        let registry = Arc::new(Registry::new(node_id.clone()));
        let ledger = Arc::new(Ledger::new());
        Self {
            sessions: Arc::new(SessionManager::new(
                Duration::seconds(config.session_ttl_seconds as i64),
                Duration::seconds(config.replay_window_seconds as i64),
                config.sequence_window,
                Duration::seconds(config.timestamp_tolerance_seconds as i64),
            )),
            gossip: Arc::new(GossipRunner::new(registry.clone(), config.max_gossip_peers)),
            registry,
            tasks: Arc::new(TaskTracker::new()),
            escrow: Arc::new(EscrowManager::new(ledger.clone())),
            ledger,
            governance: Arc::new(GovernanceEngine::new(config.clone(), total_token_supply)),
            node_id,
            config,
            storage,
            transport,
        }
    }
}
