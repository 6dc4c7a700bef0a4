//! In-process channel transport standing in for a real network socket.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;

use a2a_types::error::A2aError;
use a2a_types::interfaces::Transport;

pub type RouteTable = Arc<DashMap<String, mpsc::UnboundedSender<Vec<u8>>>>;

/// Registers `endpoint` in `routes` and returns the receiver a node should
/// poll for inbound bytes addressed to it.
pub fn register_endpoint(routes: &RouteTable, endpoint: impl Into<String>) -> mpsc::UnboundedReceiver<Vec<u8>> {
    let (tx, rx) = mpsc::unbounded_channel();
    routes.insert(endpoint.into(), tx);
    rx
}

/// Delivers bytes to whichever endpoint is registered in the shared route
/// table. Several `InProcessTransport`s sharing one `RouteTable` model a
/// single-process multi-node test topology.
pub struct InProcessTransport {
    routes: RouteTable,
}

impl InProcessTransport {
    pub fn new(routes: RouteTable) -> Self {
        Self { routes }
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn send(&self, recipient_endpoint: &str, bytes: Vec<u8>) -> Result<(), A2aError> {
        let sender = self
            .routes
            .get(recipient_endpoint)
            .ok_or_else(|| A2aError::Unavailable(format!("no route to {recipient_endpoint}")))?;
        sender
            .send(bytes)
            .map_err(|_| A2aError::Unavailable(format!("endpoint {recipient_endpoint} closed")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_registered_endpoint() {
        let routes: RouteTable = Arc::new(DashMap::new());
        let mut rx = register_endpoint(&routes, "node-a");
        let transport = InProcessTransport::new(routes);
        transport.send("node-a", b"hello".to_vec()).await.unwrap();
        assert_eq!(rx.recv().await, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn send_to_unknown_endpoint_fails() {
        let routes: RouteTable = Arc::new(DashMap::new());
        let transport = InProcessTransport::new(routes);
        assert!(transport.send("ghost", b"x".to_vec()).await.is_err());
    }
}
