//! Wiring crate: in-memory `Storage`/`Transport`, the top-level `Node`, and
//! its background workers.

pub mod gossip_peer;
pub mod node;
pub mod storage;
pub mod transport;
pub mod workers;

pub use gossip_peer::DirectRegistryPeer;
pub use node::Node;
pub use storage::InMemoryStorage;
pub use transport::{InProcessTransport, RouteTable};
