//! Proposal lifecycle, token-weighted voting, guardian timelock, and action
//! execution.

pub mod error;
pub mod execution;
pub mod proposal;
pub mod timelock;
pub mod voting;

pub use error::GovernanceError;
pub use execution::{ActionHandler, ExecutionEngine, ExecutionOutcome};
pub use proposal::ProposalManager;
pub use timelock::Timelock;
pub use voting::VotingManager;

use chrono::Utc;

use a2a_types::config::Config;
use a2a_types::governance::{Action, Proposal, ProposalStatus, ProposalType, QueuedTransaction, Tallies, VoteChoice};

/// Facade wiring the four governance stages together: a caller drives a
/// proposal through `create -> vote -> queue -> execute` without juggling
/// the four managers directly.
pub struct GovernanceEngine {
    pub proposals: ProposalManager,
    pub voting: VotingManager,
    pub timelock: Timelock,
    pub execution: ExecutionEngine,
    total_supply: f64,
}

impl GovernanceEngine {
    pub fn new(config: Config, total_supply: f64) -> Self {
        Self {
            proposals: ProposalManager::new(config.clone()),
            voting: VotingManager::new(config.clone()),
            timelock: Timelock::new(config),
            execution: ExecutionEngine::new(),
            total_supply,
        }
    }

    pub fn create_proposal(
        &self,
        proposer: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        proposal_type: ProposalType,
        actions: Vec<Action>,
        proposer_balance: u64,
    ) -> Result<Proposal, GovernanceError> {
        self.proposals
            .create_proposal(proposer, title, description, proposal_type, actions, proposer_balance)
    }

    pub fn cast_vote(
        &self,
        proposal_id: &str,
        voter: &str,
        choice: VoteChoice,
        voter_balance: u64,
    ) -> Result<Tallies, GovernanceError> {
        let voting_power = self.voting.voting_power_for(voter_balance);
        // The eligibility check, duplicate-vote guard, and tally update all
        // happen under one lock inside `proposals.cast_vote` so two
        // concurrent casts from the same voter can't both be accepted.
        let tallies = self.proposals.cast_vote(
            proposal_id,
            voter,
            choice,
            voter_balance,
            self.voting.min_tokens_to_vote(),
            voting_power,
        )?;
        self.voting.record_vote(proposal_id, voter, choice, voting_power);
        Ok(tallies)
    }

    /// Advances a proposal's status driven by wall time, using this
    /// engine's voting/quorum rules to decide `SUCCEEDED` vs `DEFEATED`.
    pub fn refresh_status(&self, proposal_id: &str) -> Result<ProposalStatus, GovernanceError> {
        let voting = &self.voting;
        let total_supply = self.total_supply;
        self.proposals
            .update_status(proposal_id, |proposal| voting.check_passed(&proposal.tallies, total_supply))
    }

    pub fn queue_for_execution(&self, proposal_id: &str) -> Result<QueuedTransaction, GovernanceError> {
        let proposal = self
            .proposals
            .get(proposal_id)
            .ok_or_else(|| GovernanceError::ProposalNotFound(proposal_id.to_string()))?;
        if proposal.status != ProposalStatus::Succeeded {
            return Err(GovernanceError::NotSucceeded(proposal_id.to_string()));
        }
        let tx = self
            .timelock
            .queue_transaction(proposal_id, proposal.proposal_type.is_emergency());
        self.proposals.mark_queued(proposal_id, tx.queued_at)?;
        Ok(tx)
    }

    /// Executes a queued transaction's proposal actions if the timelock
    /// allows it right now.
    pub fn execute_queued(&self, tx_id: &str, executor: &str) -> Result<ExecutionOutcome, GovernanceError> {
        let tx = match self.timelock.check_executable(tx_id) {
            Ok(tx) => tx,
            Err(GovernanceError::TimelockExpired(_)) => {
                self.timelock.mark_expired(tx_id)?;
                if let Some(tx) = self.timelock.get(tx_id) {
                    self.proposals.mark_expired(&tx.proposal_id)?;
                }
                return Err(GovernanceError::TimelockExpired(tx_id.to_string()));
            }
            Err(e) => return Err(e),
        };
        let proposal = self
            .proposals
            .get(&tx.proposal_id)
            .ok_or_else(|| GovernanceError::ProposalNotFound(tx.proposal_id.clone()))?;

        let outcome = self.execution.execute_actions(&proposal.actions);
        match &outcome {
            ExecutionOutcome::Succeeded | ExecutionOutcome::PartialFailure { .. } => {
                self.timelock.mark_executed(tx_id, executor)?;
                self.proposals.mark_executed(&tx.proposal_id, Utc::now())?;
            }
            ExecutionOutcome::RolledBack { .. } => {}
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    struct LedgerHandler {
        applied: Arc<Mutex<Vec<String>>>,
    }

    impl ActionHandler for LedgerHandler {
        fn execute(&self, action: &Action) -> Result<(), GovernanceError> {
            self.applied.lock().push(action.function_name.clone());
            Ok(())
        }
        fn compensate(&self, action: &Action) -> Result<(), GovernanceError> {
            self.applied.lock().retain(|f| f != &action.function_name);
            Ok(())
        }
    }

    /// Drives a proposal through the whole pipeline with near-zero voting
    /// and timelock delays so the test doesn't have to sleep for days.
    fn fast_config() -> Config {
        let mut config = Config::default();
        config.min_tokens_to_propose = 1000;
        config.voting_period_seconds = 0;
        config.emergency_delay_seconds = 0;
        config.grace_period_seconds = 3600;
        config
    }

    #[test]
    fn full_emergency_pipeline_executes_actions() {
        let applied = Arc::new(Mutex::new(Vec::new()));
        let engine = GovernanceEngine::new(fast_config(), 10_000.0);
        engine
            .execution
            .register_handler("ledger", Arc::new(LedgerHandler { applied: applied.clone() }) as Arc<dyn ActionHandler>);

        let actions = vec![Action {
            target_namespace: "ledger".to_string(),
            function_name: "adjust_reward_rate".to_string(),
            parameters: BTreeMap::new(),
            value: 0.0,
        }];
        let proposal = engine
            .create_proposal("alice", "Adjust reward rate", "desc", ProposalType::Emergency, actions, 1500)
            .unwrap();

        assert_eq!(engine.refresh_status(&proposal.id).unwrap(), ProposalStatus::Active);
        engine.cast_vote(&proposal.id, "bob", VoteChoice::For, 8000).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let status = engine.refresh_status(&proposal.id).unwrap();
        assert_eq!(status, ProposalStatus::Succeeded);

        let tx = engine.queue_for_execution(&proposal.id).unwrap();
        let outcome = engine.execute_queued(&tx.id, "relayer-1").unwrap();
        assert_eq!(outcome, ExecutionOutcome::Succeeded);
        assert_eq!(*applied.lock(), vec!["adjust_reward_rate"]);
        assert_eq!(
            engine.proposals.get(&proposal.id).unwrap().status,
            ProposalStatus::Executed
        );
    }
}
