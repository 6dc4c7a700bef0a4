//! Eventually-consistent distributed agent directory: CRDT merge over
//! vector clocks and hybrid logical clocks, push-pull gossip dissemination,
//! tombstone garbage collection, capability-based lookup.

pub mod entry_store;
pub mod error;
pub mod gossip;

pub use entry_store::Registry;
pub use error::RegistryError;
pub use gossip::{Digest, GossipPeer, GossipRunner};
