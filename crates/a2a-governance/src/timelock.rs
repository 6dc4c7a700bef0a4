//! Timelock queue with guardian pause/cancel.
//!
//! Guardian actions (`pause`, `unpause`, `cancel`) require
//! `guardian_threshold` distinct configured guardians to signal the same
//! action. Signals for a given action are collected in a short window (10
//! minutes) before they're discarded, so a stale lone signer can't combine
//! with a fresh one days later.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use a2a_types::config::Config;
use a2a_types::governance::{QueuedTransaction, TimelockStatus};

use crate::error::GovernanceError;

const GUARDIAN_SIGNAL_WINDOW_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum GuardianOp {
    Pause,
    Unpause,
}

struct PendingSignal {
    signers: HashSet<String>,
    first_seen: DateTime<Utc>,
}

pub struct Timelock {
    config: Config,
    queue: DashMap<String, QueuedTransaction>,
    paused: std::sync::atomic::AtomicBool,
    pending_pause: DashMap<GuardianOp, PendingSignal>,
    pending_cancel: DashMap<String, PendingSignal>,
}

fn new_tx_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Timelock {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            queue: DashMap::new(),
            paused: std::sync::atomic::AtomicBool::new(false),
            pending_pause: DashMap::new(),
            pending_cancel: DashMap::new(),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn queue_transaction(&self, proposal_id: impl Into<String>, is_emergency: bool) -> QueuedTransaction {
        let now = Utc::now();
        let delay = if is_emergency {
            Duration::seconds(self.config.emergency_delay_seconds as i64)
        } else {
            Duration::seconds(self.config.timelock_delay_seconds as i64)
        };
        let executable_at = now + delay;
        let expires_at = executable_at + Duration::seconds(self.config.grace_period_seconds as i64);
        let tx = QueuedTransaction {
            id: new_tx_id(),
            proposal_id: proposal_id.into(),
            queued_at: now,
            executable_at,
            expires_at,
            status: TimelockStatus::Pending,
            is_emergency,
            executor: None,
            executed_at: None,
            cancel_reason: None,
        };
        self.queue.insert(tx.id.clone(), tx.clone());
        tx
    }

    fn require_guardian(&self, guardian_id: &str) -> Result<(), GovernanceError> {
        if !self.config.guardian_addresses.iter().any(|g| g == guardian_id) {
            return Err(GovernanceError::NotGuardian(guardian_id.to_string()));
        }
        Ok(())
    }

    /// Records a guardian's signal for `op`. Returns `true` once
    /// `guardian_threshold` distinct guardians have signaled within the
    /// window, applying the effect as a side effect of that call.
    fn signal_pause_op(&self, op: GuardianOp, guardian_id: &str) -> Result<bool, GovernanceError> {
        self.require_guardian(guardian_id)?;
        let now = Utc::now();
        let mut entry = self.pending_pause.entry(op).or_insert_with(|| PendingSignal {
            signers: HashSet::new(),
            first_seen: now,
        });
        if now - entry.first_seen > Duration::minutes(GUARDIAN_SIGNAL_WINDOW_MINUTES) {
            entry.signers.clear();
            entry.first_seen = now;
        }
        entry.signers.insert(guardian_id.to_string());
        let met = entry.signers.len() >= self.config.guardian_threshold;
        if met {
            drop(entry);
            self.pending_pause.remove(&op);
        }
        Ok(met)
    }

    /// `guardian_threshold`-of-`guardian_addresses` signers must call this
    /// before the timelock actually pauses.
    pub fn pause(&self, guardian_id: &str) -> Result<bool, GovernanceError> {
        let applied = self.signal_pause_op(GuardianOp::Pause, guardian_id)?;
        if applied {
            self.paused.store(true, std::sync::atomic::Ordering::SeqCst);
        }
        Ok(applied)
    }

    pub fn unpause(&self, guardian_id: &str) -> Result<bool, GovernanceError> {
        let applied = self.signal_pause_op(GuardianOp::Unpause, guardian_id)?;
        if applied {
            self.paused.store(false, std::sync::atomic::Ordering::SeqCst);
        }
        Ok(applied)
    }

    /// Same threshold rule, scoped per queued transaction id.
    pub fn cancel_transaction(
        &self,
        tx_id: &str,
        guardian_id: &str,
        reason: impl Into<String>,
    ) -> Result<bool, GovernanceError> {
        self.require_guardian(guardian_id)?;
        if !self.queue.contains_key(tx_id) {
            return Err(GovernanceError::QueuedTransactionNotFound(tx_id.to_string()));
        }
        let now = Utc::now();
        let met = {
            let mut entry = self.pending_cancel.entry(tx_id.to_string()).or_insert_with(|| PendingSignal {
                signers: HashSet::new(),
                first_seen: now,
            });
            if now - entry.first_seen > Duration::minutes(GUARDIAN_SIGNAL_WINDOW_MINUTES) {
                entry.signers.clear();
                entry.first_seen = now;
            }
            entry.signers.insert(guardian_id.to_string());
            entry.signers.len() >= self.config.guardian_threshold
        };
        if met {
            self.pending_cancel.remove(tx_id);
            let mut tx = self.queue.get_mut(tx_id).unwrap();
            tx.status = TimelockStatus::Canceled;
            tx.cancel_reason = Some(reason.into());
        }
        Ok(met)
    }

    /// Validates a transaction is ready to execute without mutating it:
    /// not paused, not expired, delay elapsed.
    pub fn check_executable(&self, tx_id: &str) -> Result<QueuedTransaction, GovernanceError> {
        let tx = self
            .queue
            .get(tx_id)
            .ok_or_else(|| GovernanceError::QueuedTransactionNotFound(tx_id.to_string()))?
            .clone();
        let now = Utc::now();
        if now > tx.expires_at {
            return Err(GovernanceError::TimelockExpired(tx_id.to_string()));
        }
        if self.is_paused() {
            return Err(GovernanceError::TimelockPaused);
        }
        if now < tx.executable_at {
            return Err(GovernanceError::TimelockNotElapsed(tx.executable_at));
        }
        Ok(tx)
    }

    pub fn mark_executed(&self, tx_id: &str, executor: impl Into<String>) -> Result<(), GovernanceError> {
        let mut tx = self
            .queue
            .get_mut(tx_id)
            .ok_or_else(|| GovernanceError::QueuedTransactionNotFound(tx_id.to_string()))?;
        tx.status = TimelockStatus::Executed;
        tx.executor = Some(executor.into());
        tx.executed_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_expired(&self, tx_id: &str) -> Result<(), GovernanceError> {
        let mut tx = self
            .queue
            .get_mut(tx_id)
            .ok_or_else(|| GovernanceError::QueuedTransactionNotFound(tx_id.to_string()))?;
        tx.status = TimelockStatus::Expired;
        Ok(())
    }

    pub fn get_executable_transactions(&self) -> Vec<QueuedTransaction> {
        let now = Utc::now();
        self.queue
            .iter()
            .filter(|tx| tx.status == TimelockStatus::Pending && now >= tx.executable_at && now <= tx.expires_at)
            .map(|tx| tx.clone())
            .collect()
    }

    pub fn get(&self, tx_id: &str) -> Option<QueuedTransaction> {
        self.queue.get(tx_id).map(|tx| tx.clone())
    }
}
