//! Action execution engine: runs a proposal's actions through per-namespace
//! handlers, and when a later action fails, compensates the already-applied
//! ones in reverse order.

use std::collections::HashMap;
use std::sync::Arc;

use a2a_types::governance::Action;

use crate::error::GovernanceError;

/// A namespace handler executes one action and, if asked, compensates for
/// an action it previously executed successfully.
pub trait ActionHandler: Send + Sync {
    fn execute(&self, action: &Action) -> Result<(), GovernanceError>;
    fn compensate(&self, action: &Action) -> Result<(), GovernanceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Succeeded,
    /// All actions were rolled back cleanly; the proposal did not apply.
    RolledBack { failed_action_index: usize, reason: String },
    /// Compensation itself failed partway; some actions remain applied.
    /// Marked for operator attention rather than silently dropped.
    PartialFailure {
        failed_action_index: usize,
        reason: String,
        compensation_error: String,
    },
}

pub struct ExecutionEngine {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ExecutionEngine {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register_handler(&mut self, namespace: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(namespace.into(), handler);
    }

    fn handler_for(&self, action: &Action) -> Result<&Arc<dyn ActionHandler>, GovernanceError> {
        self.handlers
            .get(&action.target_namespace)
            .ok_or_else(|| GovernanceError::NoHandlerForNamespace(action.target_namespace.clone()))
    }

    /// Executes `actions` in order. On the first failure, compensates
    /// already-executed actions in reverse order.
    pub fn execute_actions(&self, actions: &[Action]) -> ExecutionOutcome {
        let mut executed_indices = Vec::new();
        for (index, action) in actions.iter().enumerate() {
            let handler = match self.handler_for(action) {
                Ok(h) => h,
                Err(e) => return self.roll_back(actions, &executed_indices, index, e.to_string()),
            };
            if let Err(e) = handler.execute(action) {
                return self.roll_back(actions, &executed_indices, index, e.to_string());
            }
            executed_indices.push(index);
        }
        ExecutionOutcome::Succeeded
    }

    fn roll_back(
        &self,
        actions: &[Action],
        executed_indices: &[usize],
        failed_action_index: usize,
        reason: String,
    ) -> ExecutionOutcome {
        for &index in executed_indices.iter().rev() {
            let action = &actions[index];
            // handler_for cannot fail here: it already succeeded for this
            // action during the forward pass.
            let handler = self.handler_for(action).expect("handler vanished mid-rollback");
            if let Err(compensation_err) = handler.compensate(action) {
                return ExecutionOutcome::PartialFailure {
                    failed_action_index,
                    reason,
                    compensation_error: compensation_err.to_string(),
                };
            }
        }
        ExecutionOutcome::RolledBack {
            failed_action_index,
            reason,
        }
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;

    struct RecordingHandler {
        log: Arc<Mutex<Vec<String>>>,
        fail_on: Option<String>,
    }

    impl ActionHandler for RecordingHandler {
        fn execute(&self, action: &Action) -> Result<(), GovernanceError> {
            if self.fail_on.as_deref() == Some(action.function_name.as_str()) {
                return Err(GovernanceError::ActionFailed(action.function_name.clone()));
            }
            self.log.lock().push(format!("execute:{}", action.function_name));
            Ok(())
        }

        fn compensate(&self, action: &Action) -> Result<(), GovernanceError> {
            self.log.lock().push(format!("compensate:{}", action.function_name));
            Ok(())
        }
    }

    fn action(namespace: &str, function: &str) -> Action {
        Action {
            target_namespace: namespace.to_string(),
            function_name: function.to_string(),
            parameters: BTreeMap::new(),
            value: 0.0,
        }
    }

    #[test]
    fn successful_sequence_runs_all_actions() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut engine = ExecutionEngine::new();
        engine.register_handler(
            "ledger",
            Arc::new(RecordingHandler { log: log.clone(), fail_on: None }),
        );
        let outcome = engine.execute_actions(&[action("ledger", "credit"), action("ledger", "debit")]);
        assert_eq!(outcome, ExecutionOutcome::Succeeded);
        assert_eq!(*log.lock(), vec!["execute:credit", "execute:debit"]);
    }

    #[test]
    fn failure_compensates_prior_actions_in_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut engine = ExecutionEngine::new();
        engine.register_handler(
            "ledger",
            Arc::new(RecordingHandler {
                log: log.clone(),
                fail_on: Some("bad".to_string()),
            }),
        );
        let outcome = engine.execute_actions(&[
            action("ledger", "first"),
            action("ledger", "second"),
            action("ledger", "bad"),
        ]);
        assert_eq!(
            outcome,
            ExecutionOutcome::RolledBack {
                failed_action_index: 2,
                reason: GovernanceError::ActionFailed("bad".to_string()).to_string(),
            }
        );
        assert_eq!(*log.lock(), vec!["execute:first", "execute:second", "compensate:second", "compensate:first"]);
    }

    #[test]
    fn unregistered_namespace_rolls_back_cleanly() {
        let engine = ExecutionEngine::new();
        let outcome = engine.execute_actions(&[action("unknown", "noop")]);
        assert!(matches!(outcome, ExecutionOutcome::RolledBack { failed_action_index: 0, .. }));
    }
}
