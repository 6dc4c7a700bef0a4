//! Escrow lifecycle manager: a `DashMap`-backed store of escrows keyed by
//! id, indexed by task, coupled to the shared [`Ledger`] so every balance
//! change stays in lockstep with the escrow's status transition.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use a2a_types::escrow::{Escrow, EscrowStatus, Resolution};

use crate::error::EscrowError;
use crate::ledger::Ledger;

#[derive(Debug, Clone)]
pub struct EscrowHistoryEntry {
    pub status: EscrowStatus,
    pub at: DateTime<Utc>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EscrowStatistics {
    pub total_escrows: usize,
    pub active_escrows: usize,
    pub disputed_escrows: usize,
    pub total_released_amount: u64,
}

pub struct EscrowManager {
    ledger: Arc<Ledger>,
    escrows: DashMap<String, Escrow>,
    by_task: DashMap<String, String>,
    history: DashMap<String, Vec<EscrowHistoryEntry>>,
}

fn new_escrow_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl EscrowManager {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self {
            ledger,
            escrows: DashMap::new(),
            by_task: DashMap::new(),
            history: DashMap::new(),
        }
    }

    fn record(&self, escrow_id: &str, status: EscrowStatus, note: Option<String>) {
        self.history
            .entry(escrow_id.to_string())
            .or_default()
            .push(EscrowHistoryEntry { status, at: Utc::now(), note });
        tracing::info!(escrow_id, ?status, "escrow status transition");
    }

    /// Creates a `CREATED` escrow. Rejects a task that already has an
    /// active (non-terminal) escrow.
    pub fn create_escrow(
        &self,
        task_id: impl Into<String>,
        client_id: impl Into<String>,
        provider_id: impl Into<String>,
        amount: u64,
        deadline: DateTime<Utc>,
    ) -> Result<Escrow, EscrowError> {
        let task_id = task_id.into();
        let client_id = client_id.into();
        let provider_id = provider_id.into();

        if amount == 0 {
            return Err(EscrowError::InvalidAmount(0));
        }
        if client_id.is_empty() || provider_id.is_empty() {
            return Err(EscrowError::MissingParty);
        }
        if let Some(existing) = self.by_task.get(&task_id) {
            if let Some(e) = self.escrows.get(existing.value()) {
                if e.is_active() {
                    return Err(EscrowError::DuplicateForTask(task_id));
                }
            }
        }

        let escrow = Escrow {
            escrow_id: new_escrow_id(),
            task_id: task_id.clone(),
            client_id,
            provider_id,
            amount,
            status: EscrowStatus::Created,
            created_at: Utc::now(),
            deadline,
            released_at: None,
            dispute_reason: None,
            resolution: Resolution::Pending,
            resolution_amount: None,
        };

        self.by_task.insert(task_id, escrow.escrow_id.clone());
        self.record(&escrow.escrow_id, EscrowStatus::Created, None);
        self.escrows.insert(escrow.escrow_id.clone(), escrow.clone());
        Ok(escrow)
    }

    /// `CREATED -> LOCKED`: debits the client. Tokens leave the client's
    /// balance exactly at this transition, never before.
    ///
    /// The status check, the ledger debit, and the status write all happen
    /// while the single `get_mut` guard below is held, so two concurrent
    /// callers can't both observe `Created` and both debit the client.
    pub fn lock_funds(&self, escrow_id: &str) -> Result<(), EscrowError> {
        let mut entry = self.escrows.get_mut(escrow_id).ok_or_else(|| EscrowError::NotFound(escrow_id.to_string()))?;
        if entry.status != EscrowStatus::Created {
            return Err(EscrowError::InvalidTransition {
                from: entry.status,
                attempted: "Locked".to_string(),
            });
        }
        self.ledger.debit(&entry.client_id, entry.amount)?;
        entry.status = EscrowStatus::Locked;
        drop(entry);
        self.record(escrow_id, EscrowStatus::Locked, None);
        Ok(())
    }

    /// `LOCKED -> COMPLETED`: provider marks the deliverable done; no funds
    /// move until [`Self::release_funds`].
    pub fn mark_completed(&self, escrow_id: &str) -> Result<(), EscrowError> {
        let mut entry = self.escrows.get_mut(escrow_id).ok_or_else(|| EscrowError::NotFound(escrow_id.to_string()))?;
        if entry.status != EscrowStatus::Locked {
            return Err(EscrowError::InvalidTransition {
                from: entry.status,
                attempted: "Completed".to_string(),
            });
        }
        entry.status = EscrowStatus::Completed;
        drop(entry);
        self.record(escrow_id, EscrowStatus::Completed, None);
        Ok(())
    }

    /// `COMPLETED -> RELEASED` if `verified`, else stays `COMPLETED` so a
    /// failed verification can be retried or escalated to a dispute. Tokens
    /// enter the provider's balance only at this transition.
    pub fn release_funds(&self, escrow_id: &str, verified: bool) -> Result<(), EscrowError> {
        let mut entry = self.escrows.get_mut(escrow_id).ok_or_else(|| EscrowError::NotFound(escrow_id.to_string()))?;
        if entry.status != EscrowStatus::Completed {
            return Err(EscrowError::InvalidTransition {
                from: entry.status,
                attempted: "Released".to_string(),
            });
        }
        if entry.resolution != Resolution::Pending {
            return Err(EscrowError::InvalidTransition {
                from: entry.status,
                attempted: "Released".to_string(),
            });
        }
        if !verified {
            return Err(EscrowError::InvalidTransition {
                from: entry.status,
                attempted: "Released (verification failed)".to_string(),
            });
        }
        self.ledger.credit(&entry.provider_id, entry.amount);
        entry.status = EscrowStatus::Released;
        entry.released_at = Some(Utc::now());
        drop(entry);
        self.record(escrow_id, EscrowStatus::Released, None);
        Ok(())
    }

    /// `CREATED|LOCKED -> CANCELLED`; refunds the client if funds were
    /// already locked.
    pub fn cancel_escrow(&self, escrow_id: &str, reason: impl Into<String>) -> Result<(), EscrowError> {
        let mut entry = self.escrows.get_mut(escrow_id).ok_or_else(|| EscrowError::NotFound(escrow_id.to_string()))?;
        if !matches!(entry.status, EscrowStatus::Created | EscrowStatus::Locked) {
            return Err(EscrowError::InvalidTransition {
                from: entry.status,
                attempted: "Cancelled".to_string(),
            });
        }
        if entry.status == EscrowStatus::Locked {
            self.ledger.credit(&entry.client_id, entry.amount);
        }
        entry.status = EscrowStatus::Cancelled;
        drop(entry);
        self.record(escrow_id, EscrowStatus::Cancelled, Some(reason.into()));
        Ok(())
    }

    /// `LOCKED -> DISPUTED`.
    pub fn open_dispute(&self, escrow_id: &str, reason: impl Into<String>) -> Result<(), EscrowError> {
        let reason = reason.into();
        let mut entry = self.escrows.get_mut(escrow_id).ok_or_else(|| EscrowError::NotFound(escrow_id.to_string()))?;
        if entry.status != EscrowStatus::Locked {
            return Err(EscrowError::InvalidTransition {
                from: entry.status,
                attempted: "Disputed".to_string(),
            });
        }
        entry.status = EscrowStatus::Disputed;
        entry.dispute_reason = Some(reason.clone());
        drop(entry);
        self.record(escrow_id, EscrowStatus::Disputed, Some(reason));
        Ok(())
    }

    /// `DISPUTED -> COMPLETED`: settles funds immediately according to the
    /// resolution. `resolution_amount` is required, and only meaningful,
    /// for [`Resolution::Split`].
    pub fn resolve_dispute(
        &self,
        escrow_id: &str,
        resolution: Resolution,
        resolution_amount: Option<u64>,
    ) -> Result<(), EscrowError> {
        let mut entry = self.escrows.get_mut(escrow_id).ok_or_else(|| EscrowError::NotFound(escrow_id.to_string()))?;
        if entry.status != EscrowStatus::Disputed {
            return Err(EscrowError::InvalidTransition {
                from: entry.status,
                attempted: "Completed".to_string(),
            });
        }

        let provider_amount = match resolution {
            Resolution::ClientWins => 0,
            Resolution::ProviderWins => entry.amount,
            Resolution::Split => {
                let amount = resolution_amount.unwrap_or(0);
                if amount > entry.amount {
                    return Err(EscrowError::ResolutionExceedsAmount {
                        resolution: amount,
                        amount: entry.amount,
                    });
                }
                amount
            }
            Resolution::Pending => {
                return Err(EscrowError::InvalidTransition {
                    from: entry.status,
                    attempted: "Completed (no resolution chosen)".to_string(),
                })
            }
        };
        let refund_amount = entry.amount - provider_amount;

        if provider_amount > 0 {
            self.ledger.credit(&entry.provider_id, provider_amount);
        }
        if refund_amount > 0 {
            self.ledger.credit(&entry.client_id, refund_amount);
        }

        entry.status = EscrowStatus::Completed;
        entry.resolution = resolution;
        entry.resolution_amount = Some(provider_amount);
        drop(entry);
        self.record(escrow_id, EscrowStatus::Completed, Some(format!("{resolution:?}")));
        Ok(())
    }

    /// Sweeps all non-terminal escrows past their deadline, refunding any
    /// locked funds. Idempotent, and a single bad entry never aborts the
    /// rest of the sweep.
    ///
    /// Candidates are gathered with a read-only scan, then each one is
    /// re-checked under its own `get_mut` guard before being mutated, so a
    /// transition made by another caller between the scan and the sweep
    /// (e.g. a release) isn't clobbered.
    pub fn check_expired_escrows(&self) -> Vec<String> {
        let now = Utc::now();
        let candidates: Vec<String> = self
            .escrows
            .iter()
            .filter(|e| matches!(e.status, EscrowStatus::Created | EscrowStatus::Locked) && now > e.deadline)
            .map(|e| e.escrow_id.clone())
            .collect();

        let mut expired = Vec::new();
        for escrow_id in candidates {
            let Some(mut entry) = self.escrows.get_mut(&escrow_id) else {
                continue;
            };
            if !matches!(entry.status, EscrowStatus::Created | EscrowStatus::Locked) || now <= entry.deadline {
                continue;
            }
            if entry.status == EscrowStatus::Locked {
                self.ledger.credit(&entry.client_id, entry.amount);
            }
            entry.status = EscrowStatus::Expired;
            drop(entry);
            self.record(&escrow_id, EscrowStatus::Expired, None);
            expired.push(escrow_id);
        }
        expired
    }

    pub fn get_escrow(&self, escrow_id: &str) -> Option<Escrow> {
        self.escrows.get(escrow_id).map(|e| e.clone())
    }

    pub fn get_escrow_by_task(&self, task_id: &str) -> Option<Escrow> {
        let escrow_id = self.by_task.get(task_id)?;
        self.get_escrow(&escrow_id)
    }

    pub fn list_active_escrows(&self) -> Vec<Escrow> {
        self.escrows.iter().filter(|e| e.is_active()).map(|e| e.clone()).collect()
    }

    pub fn get_status_history(&self, escrow_id: &str) -> Vec<EscrowHistoryEntry> {
        self.history.get(escrow_id).map(|h| h.clone()).unwrap_or_default()
    }

    pub fn get_statistics(&self) -> EscrowStatistics {
        let mut stats = EscrowStatistics {
            total_escrows: self.escrows.len(),
            ..Default::default()
        };
        for escrow in self.escrows.iter() {
            if escrow.is_active() {
                stats.active_escrows += 1;
            }
            if escrow.status == EscrowStatus::Disputed {
                stats.disputed_escrows += 1;
            }
            if escrow.status == EscrowStatus::Released {
                stats.total_released_amount += escrow.amount;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn manager_with_funded(client: &str, balance: u64) -> EscrowManager {
        let ledger = Arc::new(Ledger::new());
        ledger.set_balance(client, balance);
        EscrowManager::new(ledger)
    }

    #[test]
    fn full_happy_path_conserves_tokens() {
        let manager = manager_with_funded("client-1", 1000);
        let escrow = manager
            .create_escrow("task-1", "client-1", "provider-1", 100, Utc::now() + Duration::hours(24))
            .unwrap();

        manager.lock_funds(&escrow.escrow_id).unwrap();
        assert_eq!(manager.ledger.balance("client-1"), 900);

        manager.mark_completed(&escrow.escrow_id).unwrap();
        manager.release_funds(&escrow.escrow_id, true).unwrap();

        assert_eq!(manager.ledger.balance("client-1"), 900);
        assert_eq!(manager.ledger.balance("provider-1"), 100);
        assert_eq!(manager.get_escrow(&escrow.escrow_id).unwrap().status, EscrowStatus::Released);
        assert_eq!(manager.get_status_history(&escrow.escrow_id).len(), 4);
    }

    #[test]
    fn release_rejected_when_verification_fails() {
        let manager = manager_with_funded("client-1", 1000);
        let escrow = manager
            .create_escrow("task-1", "client-1", "provider-1", 100, Utc::now() + Duration::hours(24))
            .unwrap();
        manager.lock_funds(&escrow.escrow_id).unwrap();
        manager.mark_completed(&escrow.escrow_id).unwrap();
        assert!(manager.release_funds(&escrow.escrow_id, false).is_err());
        assert_eq!(manager.ledger.balance("provider-1"), 0);
    }

    #[test]
    fn cancel_after_lock_refunds_client() {
        let manager = manager_with_funded("client-1", 1000);
        let escrow = manager
            .create_escrow("task-1", "client-1", "provider-1", 100, Utc::now() + Duration::hours(24))
            .unwrap();
        manager.lock_funds(&escrow.escrow_id).unwrap();
        manager.cancel_escrow(&escrow.escrow_id, "client request").unwrap();
        assert_eq!(manager.ledger.balance("client-1"), 1000);
    }

    #[test]
    fn dispute_split_pays_both_sides() {
        let manager = manager_with_funded("client-1", 1000);
        let escrow = manager
            .create_escrow("task-1", "client-1", "provider-1", 100, Utc::now() + Duration::hours(24))
            .unwrap();
        manager.lock_funds(&escrow.escrow_id).unwrap();
        manager.open_dispute(&escrow.escrow_id, "quality issue").unwrap();
        manager.resolve_dispute(&escrow.escrow_id, Resolution::Split, Some(50)).unwrap();

        assert_eq!(manager.ledger.balance("client-1"), 950);
        assert_eq!(manager.ledger.balance("provider-1"), 50);
        assert_eq!(manager.get_escrow(&escrow.escrow_id).unwrap().status, EscrowStatus::Completed);
    }

    #[test]
    fn expiry_sweeper_refunds_locked_funds() {
        let manager = manager_with_funded("client-1", 1000);
        let escrow = manager
            .create_escrow("task-1", "client-1", "provider-1", 100, Utc::now() - Duration::hours(1))
            .unwrap();
        manager.lock_funds(&escrow.escrow_id).unwrap();
        let expired = manager.check_expired_escrows();
        assert_eq!(expired, vec![escrow.escrow_id.clone()]);
        assert_eq!(manager.ledger.balance("client-1"), 1000);
        assert_eq!(manager.get_escrow(&escrow.escrow_id).unwrap().status, EscrowStatus::Expired);
    }

    #[test]
    fn duplicate_active_escrow_for_same_task_rejected() {
        let manager = manager_with_funded("client-1", 1000);
        manager
            .create_escrow("task-1", "client-1", "provider-1", 100, Utc::now() + Duration::hours(24))
            .unwrap();
        assert!(manager
            .create_escrow("task-1", "client-1", "provider-1", 50, Utc::now() + Duration::hours(24))
            .is_err());
    }
}
