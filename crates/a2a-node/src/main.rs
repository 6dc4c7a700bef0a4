//! Minimal single-process demo binary wiring one node with in-memory
//! storage and in-process transport.

use std::sync::Arc;

use a2a_node::{InMemoryStorage, InProcessTransport, Node, RouteTable};
use a2a_types::config::Config;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let config = Config::default();
    let routes: RouteTable = Arc::new(DashMap::new());
    let storage = Arc::new(InMemoryStorage::new());
    let transport = Arc::new(InProcessTransport::new(routes.clone()));

    let node = Arc::new(Node::new("demo-node", config, storage, transport, 1_000_000.0));
    tracing::info!(node_id = %node.node_id, "node started");

    let cancel = CancellationToken::new();
    let escrow_worker = a2a_node::workers::spawn_escrow_sweeper(node.clone(), cancel.clone());
    let execution_worker = a2a_node::workers::spawn_execution_worker(node.clone(), "demo-executor".to_string(), cancel.clone());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    cancel.cancel();
    let _ = tokio::join!(escrow_worker, execution_worker);
    Ok(())
}
