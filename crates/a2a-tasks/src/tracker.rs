//! Task delegation state machine and audit history.
//!
//! A map of in-flight delegations plus a per-task history of status
//! changes, driven by the permitted-transition graph rather than arbitrary
//! status writes.

use chrono::Utc;
use dashmap::DashMap;

use a2a_types::task::{TaskDelegation, TaskHistoryEntry, TaskStatus};

use crate::error::TaskError;

/// The five response kinds a delegatee can send back, each driving exactly
/// one permitted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Accept,
    Reject,
    Progress,
    Complete,
    Fail,
}

fn transition_for(current: TaskStatus, response: ResponseKind) -> Option<TaskStatus> {
    match (current, response) {
        (TaskStatus::Pending, ResponseKind::Accept) => Some(TaskStatus::Assigned),
        (TaskStatus::Pending, ResponseKind::Reject) => Some(TaskStatus::Rejected),
        (TaskStatus::Assigned, ResponseKind::Progress) => Some(TaskStatus::InProgress),
        (TaskStatus::InProgress, ResponseKind::Complete) => Some(TaskStatus::Completed),
        (current, ResponseKind::Fail) if current.is_active() => Some(TaskStatus::Failed),
        _ => None,
    }
}

pub struct TaskTracker {
    tasks: DashMap<String, TaskDelegation>,
    history: DashMap<String, Vec<TaskHistoryEntry>>,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self {
            tasks: DashMap::new(),
            history: DashMap::new(),
        }
    }

    pub fn register_task(&self, task: TaskDelegation) -> Result<(), TaskError> {
        if self.tasks.contains_key(&task.task_id) {
            return Err(TaskError::AlreadyRegistered(task.task_id));
        }
        let task_id = task.task_id.clone();
        let status = task.status;
        self.tasks.insert(task_id.clone(), task);
        self.history.insert(
            task_id,
            vec![TaskHistoryEntry {
                from: status,
                to: status,
                at: Utc::now(),
                reason: Some("task registered".to_string()),
            }],
        );
        Ok(())
    }

    pub fn get_task(&self, task_id: &str) -> Option<TaskDelegation> {
        self.tasks.get(task_id).map(|t| t.clone())
    }

    /// Applies a delegatee response, advancing status along the permitted
    /// transition graph. Returns the new status.
    pub fn apply_response(
        &self,
        task_id: &str,
        response: ResponseKind,
        reason: Option<String>,
    ) -> Result<TaskStatus, TaskError> {
        let mut entry = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;
        let from = entry.status;
        let to = transition_for(from, response).ok_or_else(|| TaskError::InvalidTransition {
            from: format!("{from:?}"),
            attempted: format!("{response:?}"),
        })?;
        entry.status = to;
        drop(entry);
        self.record(task_id, from, to, reason);
        Ok(to)
    }

    /// Cancels a task from any non-terminal state, by explicit request or
    /// by a caller-detected timeout.
    pub fn cancel(&self, task_id: &str, reason: Option<String>) -> Result<(), TaskError> {
        let mut entry = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;
        let from = entry.status;
        if from.is_terminal() {
            return Err(TaskError::InvalidTransition {
                from: format!("{from:?}"),
                attempted: "Cancelled".to_string(),
            });
        }
        entry.status = TaskStatus::Cancelled;
        drop(entry);
        self.record(task_id, from, TaskStatus::Cancelled, reason);
        Ok(())
    }

    pub fn timeout(&self, task_id: &str) -> Result<(), TaskError> {
        let mut entry = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;
        let from = entry.status;
        if from.is_terminal() {
            return Err(TaskError::InvalidTransition {
                from: format!("{from:?}"),
                attempted: "Timeout".to_string(),
            });
        }
        entry.status = TaskStatus::Timeout;
        drop(entry);
        self.record(task_id, from, TaskStatus::Timeout, Some("deadline elapsed".to_string()));
        Ok(())
    }

    fn record(&self, task_id: &str, from: TaskStatus, to: TaskStatus, reason: Option<String>) {
        self.history
            .entry(task_id.to_string())
            .or_default()
            .push(TaskHistoryEntry {
                from,
                to,
                at: Utc::now(),
                reason,
            });
        tracing::info!(task_id, ?from, ?to, "task status transition");
    }

    pub fn history(&self, task_id: &str) -> Vec<TaskHistoryEntry> {
        self.history.get(task_id).map(|h| h.clone()).unwrap_or_default()
    }

    pub fn tasks_by_status(&self, status: TaskStatus) -> Vec<TaskDelegation> {
        self.tasks
            .iter()
            .filter(|t| t.status == status)
            .map(|t| t.clone())
            .collect()
    }

    pub fn tasks_by_delegator(&self, delegator_id: &str) -> Vec<TaskDelegation> {
        self.tasks
            .iter()
            .filter(|t| t.delegator_id == delegator_id)
            .map(|t| t.clone())
            .collect()
    }

    pub fn tasks_by_delegatee(&self, delegatee_id: &str) -> Vec<TaskDelegation> {
        self.tasks
            .iter()
            .filter(|t| t.delegatee_id == delegatee_id)
            .map(|t| t.clone())
            .collect()
    }

    pub fn list_all(&self) -> Vec<TaskDelegation> {
        self.tasks.iter().map(|t| t.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Default for TaskTracker {
    fn default() -> Self {
        Self::new()
    }
}
