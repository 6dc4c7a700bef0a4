//! Session lifecycle, six-step handshake protocol, chunked transfer, and
//! per-endpoint rate limiting.

pub mod chunking;
pub mod error;
pub mod handshake;
pub mod manager;
pub mod rate_limiter;

pub use error::SessionError;
pub use handshake::{HandshakeDriver, HandshakeEnvelope};
pub use manager::SessionManager;
pub use rate_limiter::RateLimiter;
