//! Token-weighted voting manager.

use chrono::Utc;
use dashmap::DashMap;

use a2a_types::config::Config;
use a2a_types::governance::{Proposal, Tallies, Vote, VoteChoice};

pub struct VotingManager {
    config: Config,
    votes: DashMap<String, Vec<Vote>>,
}

impl VotingManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            votes: DashMap::new(),
        }
    }

    /// Caps `voter_balance` at `max_voting_power`, yielding the voting
    /// power a cast of that balance would carry.
    pub fn voting_power_for(&self, voter_balance: u64) -> f64 {
        (voter_balance as f64).min(self.config.max_voting_power as f64)
    }

    pub fn min_tokens_to_vote(&self) -> u64 {
        self.config.min_tokens_to_vote
    }

    /// Appends a cast vote to the per-proposal history log. Called only
    /// after the proposal manager's own atomic check has confirmed the
    /// vote is accepted, so this never needs to re-check duplicates.
    pub fn record_vote(&self, proposal_id: &str, voter: &str, choice: VoteChoice, voting_power: f64) {
        let vote = Vote {
            voter: voter.to_string(),
            proposal_id: proposal_id.to_string(),
            choice,
            voting_power,
            timestamp: Utc::now(),
        };
        self.votes.entry(proposal_id.to_string()).or_default().push(vote);
    }

    /// `for + against + abstain >= quorum_percentage * total_supply`.
    pub fn check_quorum(&self, tallies: &Tallies, total_supply: f64) -> bool {
        tallies.total() >= (self.config.quorum_percentage / 100.0) * total_supply
    }

    /// Quorum reached, `for > against`, and
    /// `for / (for + against + abstain) >= approval_threshold_percentage`.
    pub fn check_passed(&self, tallies: &Tallies, total_supply: f64) -> bool {
        if !self.check_quorum(tallies, total_supply) {
            return false;
        }
        if tallies.for_votes <= tallies.against {
            return false;
        }
        let total = tallies.total();
        if total <= 0.0 {
            return false;
        }
        tallies.for_votes / total >= self.config.approval_threshold_percentage / 100.0
    }

    pub fn get_proposal_votes(&self, proposal_id: &str) -> Vec<Vote> {
        self.votes.get(proposal_id).map(|v| v.clone()).unwrap_or_default()
    }

    pub fn get_voter_history(&self, voter: &str) -> Vec<Vote> {
        self.votes
            .iter()
            .flat_map(|entry| entry.value().clone())
            .filter(|vote| vote.voter == voter)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2a_types::governance::{ProposalStatus, ProposalType};
    use chrono::Duration;

    fn active_proposal() -> Proposal {
        let now = Utc::now();
        Proposal {
            id: "p1".to_string(),
            proposer: "alice".to_string(),
            title: "t".to_string(),
            description: "d".to_string(),
            proposal_type: ProposalType::ParameterChange,
            actions: vec![],
            status: ProposalStatus::Active,
            created_at: now - Duration::days(2),
            discussion_end: now - Duration::days(1),
            voting_start: now - Duration::hours(1),
            voting_end: now + Duration::days(1),
            queued_at: None,
            executed_at: None,
            tallies: Tallies::default(),
            voters: Default::default(),
        }
    }

    #[test]
    fn voting_power_capped_at_max() {
        let mut config = Config::default();
        config.max_voting_power = 1000;
        let manager = VotingManager::new(config);
        assert_eq!(manager.voting_power_for(1_000_000), 1000.0);
    }

    #[test]
    fn voting_power_uncapped_below_max() {
        let manager = VotingManager::new(Config::default());
        assert_eq!(manager.voting_power_for(500), 500.0);
    }

    #[test]
    fn record_vote_appends_to_history() {
        let manager = VotingManager::new(Config::default());
        let proposal = active_proposal();
        manager.record_vote(&proposal.id, "bob", VoteChoice::For, 500.0);
        manager.record_vote(&proposal.id, "carol", VoteChoice::Against, 300.0);
        let votes = manager.get_proposal_votes(&proposal.id);
        assert_eq!(votes.len(), 2);
        assert_eq!(manager.get_voter_history("bob").len(), 1);
    }

    #[test]
    fn scenario_matches_spec_example() {
        let manager = VotingManager::new(Config::default());
        let tallies = Tallies {
            for_votes: 6000.0,
            against: 2000.0,
            abstain: 1000.0,
        };
        assert!(manager.check_quorum(&tallies, 50_000.0));
        assert!(manager.check_passed(&tallies, 50_000.0));
    }

    #[test]
    fn quorum_not_reached_fails_even_with_unanimous_support() {
        let manager = VotingManager::new(Config::default());
        let tallies = Tallies {
            for_votes: 100.0,
            against: 0.0,
            abstain: 0.0,
        };
        assert!(!manager.check_quorum(&tallies, 50_000.0));
        assert!(!manager.check_passed(&tallies, 50_000.0));
    }
}
