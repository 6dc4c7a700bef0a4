//! Task delegation state machine, pluggable verification rule engine, and
//! reward scoring.

pub mod error;
pub mod reward;
pub mod tracker;
pub mod verification;

pub use error::TaskError;
pub use tracker::{ResponseKind, TaskTracker};
pub use verification::{compute_verdict_weighted, DeliverableContext, FsDeliverableContext, VerificationRuleEngine};
