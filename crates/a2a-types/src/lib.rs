//! Shared data model, error taxonomy, configuration, and external
//! interface contracts for the A2A coordination fabric.

pub mod config;
pub mod error;
pub mod escrow;
pub mod governance;
pub mod identity;
pub mod interfaces;
pub mod message;
pub mod registry;
pub mod session;
pub mod task;

pub use error::{A2aError, ErrorCode, Result};
