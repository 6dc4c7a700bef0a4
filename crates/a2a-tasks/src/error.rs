//! Local error type for the `a2a-tasks` crate.

use a2a_types::error::{A2aError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task {0} not found")]
    NotFound(String),
    #[error("invalid task transition: {from} -> {attempted}")]
    InvalidTransition { from: String, attempted: String },
    #[error("task {0} already registered")]
    AlreadyRegistered(String),
    #[error("verification rule {0} is malformed: {1}")]
    MalformedRule(String, String),
    #[error("io error evaluating rule {rule_id}: {source}")]
    Io {
        rule_id: String,
        #[source]
        source: std::io::Error,
    },
}

impl ErrorCode for TaskError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "TASK_NOT_FOUND",
            Self::InvalidTransition { .. } => "TASK_INVALID_TRANSITION",
            Self::AlreadyRegistered(_) => "TASK_ALREADY_REGISTERED",
            Self::MalformedRule(..) => "TASK_MALFORMED_RULE",
            Self::Io { .. } => "TASK_VERIFICATION_IO_ERROR",
        }
    }
}

impl From<TaskError> for A2aError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::NotFound(task_id) => A2aError::NotFound(task_id),
            TaskError::InvalidTransition { from, attempted } => {
                A2aError::PreconditionFailed(format!("{from} -> {attempted}"))
            }
            TaskError::AlreadyRegistered(task_id) => {
                A2aError::PreconditionFailed(format!("task {task_id} already registered"))
            }
            other => A2aError::InvalidArgument(other.to_string()),
        }
    }
}
