//! Runtime configuration, read once at startup. Hot reload is out of scope;
//! a new process picks up config changes.

use serde::{Deserialize, Serialize};

fn default_session_ttl_seconds() -> u64 {
    3600
}
fn default_handshake_timeout_seconds() -> u64 {
    60
}
fn default_challenge_timeout_seconds() -> u64 {
    30
}
fn default_replay_window_seconds() -> u64 {
    300
}
fn default_timestamp_tolerance_seconds() -> u64 {
    30
}
fn default_sequence_window() -> u64 {
    64
}
fn default_gossip_interval_seconds() -> u64 {
    30
}
fn default_max_gossip_peers() -> usize {
    3
}
fn default_liveness_timeout_seconds() -> u64 {
    120
}
fn default_tombstone_ttl_seconds() -> u64 {
    86_400
}
fn default_min_tokens_to_propose() -> u64 {
    1000
}
fn default_min_tokens_to_vote() -> u64 {
    100
}
fn default_discussion_period_seconds() -> u64 {
    2 * 24 * 3600
}
fn default_voting_period_seconds() -> u64 {
    3 * 24 * 3600
}
fn default_timelock_delay_seconds() -> u64 {
    2 * 24 * 3600
}
fn default_emergency_delay_seconds() -> u64 {
    4 * 3600
}
fn default_grace_period_seconds() -> u64 {
    14 * 24 * 3600
}
fn default_quorum_percentage() -> f64 {
    10.0
}
fn default_approval_threshold_percentage() -> f64 {
    51.0
}
fn default_max_voting_power() -> u64 {
    1_000_000
}
fn default_guardian_threshold() -> usize {
    2
}
fn default_escrow_expiry_poll_seconds() -> u64 {
    60
}
fn default_rate_limit_steady() -> u32 {
    5
}
fn default_rate_limit_burst() -> u32 {
    10
}

/// All options recognized by the system. Each field has a sensible default
/// so a caller may deserialize a partial file and still get a
/// fully-populated config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(default = "default_session_ttl_seconds")]
    pub session_ttl_seconds: u64,
    #[serde(default = "default_handshake_timeout_seconds")]
    pub handshake_timeout_seconds: u64,
    #[serde(default = "default_challenge_timeout_seconds")]
    pub challenge_timeout_seconds: u64,
    #[serde(default = "default_replay_window_seconds")]
    pub replay_window_seconds: u64,
    #[serde(default = "default_timestamp_tolerance_seconds")]
    pub timestamp_tolerance_seconds: u64,
    #[serde(default = "default_sequence_window")]
    pub sequence_window: u64,

    #[serde(default = "default_gossip_interval_seconds")]
    pub gossip_interval_seconds: u64,
    #[serde(default = "default_max_gossip_peers")]
    pub max_gossip_peers: usize,
    #[serde(default = "default_liveness_timeout_seconds")]
    pub liveness_timeout_seconds: u64,
    #[serde(default = "default_tombstone_ttl_seconds")]
    pub tombstone_ttl_seconds: u64,

    #[serde(default = "default_min_tokens_to_propose")]
    pub min_tokens_to_propose: u64,
    #[serde(default = "default_min_tokens_to_vote")]
    pub min_tokens_to_vote: u64,
    #[serde(default = "default_discussion_period_seconds")]
    pub discussion_period_seconds: u64,
    #[serde(default = "default_voting_period_seconds")]
    pub voting_period_seconds: u64,
    #[serde(default = "default_timelock_delay_seconds")]
    pub timelock_delay_seconds: u64,
    #[serde(default = "default_emergency_delay_seconds")]
    pub emergency_delay_seconds: u64,
    #[serde(default = "default_grace_period_seconds")]
    pub grace_period_seconds: u64,
    #[serde(default = "default_quorum_percentage")]
    pub quorum_percentage: f64,
    #[serde(default = "default_approval_threshold_percentage")]
    pub approval_threshold_percentage: f64,
    #[serde(default = "default_max_voting_power")]
    pub max_voting_power: u64,
    #[serde(default)]
    pub guardian_addresses: Vec<String>,
    #[serde(default = "default_guardian_threshold")]
    pub guardian_threshold: usize,

    #[serde(default = "default_escrow_expiry_poll_seconds")]
    pub escrow_expiry_poll_seconds: u64,
    #[serde(default = "default_rate_limit_steady")]
    pub rate_limit_steady: u32,
    #[serde(default = "default_rate_limit_burst")]
    pub rate_limit_burst: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_ttl_seconds: default_session_ttl_seconds(),
            handshake_timeout_seconds: default_handshake_timeout_seconds(),
            challenge_timeout_seconds: default_challenge_timeout_seconds(),
            replay_window_seconds: default_replay_window_seconds(),
            timestamp_tolerance_seconds: default_timestamp_tolerance_seconds(),
            sequence_window: default_sequence_window(),
            gossip_interval_seconds: default_gossip_interval_seconds(),
            max_gossip_peers: default_max_gossip_peers(),
            liveness_timeout_seconds: default_liveness_timeout_seconds(),
            tombstone_ttl_seconds: default_tombstone_ttl_seconds(),
            min_tokens_to_propose: default_min_tokens_to_propose(),
            min_tokens_to_vote: default_min_tokens_to_vote(),
            discussion_period_seconds: default_discussion_period_seconds(),
            voting_period_seconds: default_voting_period_seconds(),
            timelock_delay_seconds: default_timelock_delay_seconds(),
            emergency_delay_seconds: default_emergency_delay_seconds(),
            grace_period_seconds: default_grace_period_seconds(),
            quorum_percentage: default_quorum_percentage(),
            approval_threshold_percentage: default_approval_threshold_percentage(),
            max_voting_power: default_max_voting_power(),
            guardian_addresses: Vec::new(),
            guardian_threshold: default_guardian_threshold(),
            escrow_expiry_poll_seconds: default_escrow_expiry_poll_seconds(),
            rate_limit_steady: default_rate_limit_steady(),
            rate_limit_burst: default_rate_limit_burst(),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file, falling back to defaults for
    /// any option the file omits.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.session_ttl_seconds, 3600);
        assert_eq!(cfg.sequence_window, 64);
        assert_eq!(cfg.quorum_percentage, 10.0);
        assert_eq!(cfg.approval_threshold_percentage, 51.0);
        assert_eq!(cfg.guardian_threshold, 2);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg = Config::from_toml_str("min_tokens_to_propose = 5000\n").unwrap();
        assert_eq!(cfg.min_tokens_to_propose, 5000);
        assert_eq!(cfg.min_tokens_to_vote, 100);
    }
}
