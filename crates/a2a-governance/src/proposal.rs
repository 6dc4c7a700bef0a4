//! Proposal lifecycle manager.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use a2a_types::config::Config;
use a2a_types::governance::{Action, Proposal, ProposalStatus, ProposalType, Tallies, VoteChoice};

use crate::error::GovernanceError;

pub struct ProposalManager {
    config: Config,
    proposals: DashMap<String, Proposal>,
}

fn new_proposal_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl ProposalManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            proposals: DashMap::new(),
        }
    }

    /// Creates a `PENDING` proposal. Emergency proposals skip the
    /// discussion period and run a voting period cut to one third of the
    /// standard period.
    pub fn create_proposal(
        &self,
        proposer: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        proposal_type: ProposalType,
        actions: Vec<Action>,
        proposer_balance: u64,
    ) -> Result<Proposal, GovernanceError> {
        if proposer_balance < self.config.min_tokens_to_propose {
            return Err(GovernanceError::InsufficientTokensToPropose {
                balance: proposer_balance,
                minimum: self.config.min_tokens_to_propose,
            });
        }

        let now = Utc::now();
        let discussion_period = Duration::seconds(self.config.discussion_period_seconds as i64);
        let voting_period = Duration::seconds(self.config.voting_period_seconds as i64);

        let (discussion_end, voting_start, voting_end) = if proposal_type.is_emergency() {
            let voting_end = now + voting_period / 3;
            (now, now, voting_end)
        } else {
            let discussion_end = now + discussion_period;
            let voting_end = discussion_end + voting_period;
            (discussion_end, discussion_end, voting_end)
        };

        let proposal = Proposal {
            id: new_proposal_id(),
            proposer: proposer.into(),
            title: title.into(),
            description: description.into(),
            proposal_type,
            actions,
            status: ProposalStatus::Pending,
            created_at: now,
            discussion_end,
            voting_start,
            voting_end,
            queued_at: None,
            executed_at: None,
            tallies: Tallies::default(),
            voters: Default::default(),
        };
        self.proposals.insert(proposal.id.clone(), proposal.clone());
        Ok(proposal)
    }

    /// Only the proposer may cancel, and only before `voting_start` (spec
    /// §4.7.1).
    pub fn cancel_proposal(&self, proposal_id: &str, caller: &str) -> Result<(), GovernanceError> {
        let mut entry = self
            .proposals
            .get_mut(proposal_id)
            .ok_or_else(|| GovernanceError::ProposalNotFound(proposal_id.to_string()))?;
        if entry.proposer != caller || Utc::now() >= entry.voting_start {
            return Err(GovernanceError::CancelNotPermitted);
        }
        entry.status = ProposalStatus::Canceled;
        Ok(())
    }

    /// Advances `status` driven by wall time: `PENDING -> ACTIVE` once voting
    /// opens, `ACTIVE -> SUCCEEDED|DEFEATED` once voting closes, decided by
    /// the supplied quorum/approval check.
    pub fn update_status(&self, proposal_id: &str, passed: impl FnOnce(&Proposal) -> bool) -> Result<ProposalStatus, GovernanceError> {
        let mut entry = self
            .proposals
            .get_mut(proposal_id)
            .ok_or_else(|| GovernanceError::ProposalNotFound(proposal_id.to_string()))?;
        let now = Utc::now();
        match entry.status {
            ProposalStatus::Pending if now >= entry.voting_start => {
                entry.status = ProposalStatus::Active;
            }
            ProposalStatus::Active if now >= entry.voting_end => {
                entry.status = if passed(&entry) {
                    ProposalStatus::Succeeded
                } else {
                    ProposalStatus::Defeated
                };
            }
            _ => {}
        }
        Ok(entry.status)
    }

    /// Atomically checks voting-window timing, the minimum-balance floor,
    /// and the one-vote-per-voter guarantee against the proposal, then
    /// applies the tally update for `voting_power` — all under the single
    /// `get_mut` guard below. Checking and recording the vote as two
    /// separate lock acquisitions (as an earlier version of this did) lets
    /// two concurrent casts from the same voter both observe "not yet
    /// voted" and both get applied, so the whole sequence has to happen
    /// while one guard is held.
    pub fn cast_vote(
        &self,
        proposal_id: &str,
        voter: &str,
        choice: VoteChoice,
        voter_balance: u64,
        min_tokens_to_vote: u64,
        voting_power: f64,
    ) -> Result<Tallies, GovernanceError> {
        let mut entry = self
            .proposals
            .get_mut(proposal_id)
            .ok_or_else(|| GovernanceError::ProposalNotFound(proposal_id.to_string()))?;
        let now = Utc::now();
        if now < entry.voting_start || now > entry.voting_end {
            return Err(GovernanceError::VotingClosed(entry.id.clone()));
        }
        if voter_balance < min_tokens_to_vote {
            return Err(GovernanceError::InsufficientTokensToVote {
                balance: voter_balance,
                minimum: min_tokens_to_vote,
            });
        }
        if entry.voters.contains(voter) {
            return Err(GovernanceError::AlreadyVoted {
                voter: voter.to_string(),
                proposal_id: proposal_id.to_string(),
            });
        }
        match choice {
            VoteChoice::For => entry.tallies.for_votes += voting_power,
            VoteChoice::Against => entry.tallies.against += voting_power,
            VoteChoice::Abstain => entry.tallies.abstain += voting_power,
        }
        entry.voters.insert(voter.to_string());
        Ok(entry.tallies.clone())
    }

    pub fn mark_queued(&self, proposal_id: &str, at: DateTime<Utc>) -> Result<(), GovernanceError> {
        let mut entry = self
            .proposals
            .get_mut(proposal_id)
            .ok_or_else(|| GovernanceError::ProposalNotFound(proposal_id.to_string()))?;
        if entry.status != ProposalStatus::Succeeded {
            return Err(GovernanceError::NotSucceeded(proposal_id.to_string()));
        }
        entry.status = ProposalStatus::Queued;
        entry.queued_at = Some(at);
        Ok(())
    }

    pub fn mark_executed(&self, proposal_id: &str, at: DateTime<Utc>) -> Result<(), GovernanceError> {
        let mut entry = self
            .proposals
            .get_mut(proposal_id)
            .ok_or_else(|| GovernanceError::ProposalNotFound(proposal_id.to_string()))?;
        entry.status = ProposalStatus::Executed;
        entry.executed_at = Some(at);
        Ok(())
    }

    pub fn mark_expired(&self, proposal_id: &str) -> Result<(), GovernanceError> {
        let mut entry = self
            .proposals
            .get_mut(proposal_id)
            .ok_or_else(|| GovernanceError::ProposalNotFound(proposal_id.to_string()))?;
        entry.status = ProposalStatus::Expired;
        Ok(())
    }

    pub fn get(&self, proposal_id: &str) -> Option<Proposal> {
        self.proposals.get(proposal_id).map(|p| p.clone())
    }

    pub fn list(&self) -> Vec<Proposal> {
        self.proposals.iter().map(|p| p.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ProposalManager {
        ProposalManager::new(Config::default())
    }

    #[test]
    fn insufficient_balance_rejected() {
        let manager = manager();
        let err = manager.create_proposal(
            "alice",
            "title",
            "desc",
            ProposalType::ParameterChange,
            vec![],
            500,
        );
        assert!(err.is_err());
    }

    #[test]
    fn emergency_proposal_skips_discussion_period() {
        let manager = manager();
        let proposal = manager
            .create_proposal("alice", "t", "d", ProposalType::Emergency, vec![], 5000)
            .unwrap();
        assert_eq!(proposal.voting_start, proposal.created_at);
        assert!(proposal.voting_end < proposal.created_at + Duration::days(1));
    }

    #[test]
    fn cancel_only_before_voting_start_by_proposer() {
        let manager = manager();
        let proposal = manager
            .create_proposal("alice", "t", "d", ProposalType::ParameterChange, vec![], 5000)
            .unwrap();
        assert!(manager.cancel_proposal(&proposal.id, "bob").is_err());
        assert!(manager.cancel_proposal(&proposal.id, "alice").is_ok());
        assert_eq!(manager.get(&proposal.id).unwrap().status, ProposalStatus::Canceled);
    }

    #[test]
    fn cast_vote_rejects_duplicate_voter() {
        let manager = manager();
        let proposal = manager
            .create_proposal("alice", "t", "d", ProposalType::Emergency, vec![], 5000)
            .unwrap();
        manager.cast_vote(&proposal.id, "bob", VoteChoice::For, 500, 100, 500.0).unwrap();
        let err = manager.cast_vote(&proposal.id, "bob", VoteChoice::For, 500, 100, 500.0);
        assert!(matches!(err, Err(GovernanceError::AlreadyVoted { .. })));
    }

    #[test]
    fn cast_vote_accumulates_tallies_across_voters() {
        let manager = manager();
        let proposal = manager
            .create_proposal("alice", "t", "d", ProposalType::Emergency, vec![], 5000)
            .unwrap();
        let tallies = manager.cast_vote(&proposal.id, "bob", VoteChoice::For, 500, 100, 500.0).unwrap();
        assert_eq!(tallies.for_votes, 500.0);
        let tallies = manager.cast_vote(&proposal.id, "carol", VoteChoice::Against, 300, 100, 300.0).unwrap();
        assert_eq!(tallies.against, 300.0);
        assert_eq!(tallies.for_votes, 500.0);
    }

    #[test]
    fn cast_vote_rejects_below_minimum_balance() {
        let manager = manager();
        let proposal = manager
            .create_proposal("alice", "t", "d", ProposalType::Emergency, vec![], 5000)
            .unwrap();
        let err = manager.cast_vote(&proposal.id, "bob", VoteChoice::For, 50, 100, 50.0);
        assert!(matches!(err, Err(GovernanceError::InsufficientTokensToVote { .. })));
    }
}
