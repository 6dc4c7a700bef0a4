//! Session lifecycle manager.
//!
//! A sharded map of `Arc<Mutex<...>>`-guarded sessions, so unrelated
//! sessions never contend on the same lock.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use a2a_types::session::Session;

use crate::error::SessionError;

/// Tracks nonces seen within the replay window so a repeated nonce from an
/// otherwise-valid sender is rejected even outside the sequence window.
struct NonceLedger {
    window: Duration,
    seen: VecDeque<(String, chrono::DateTime<Utc>)>,
}

impl NonceLedger {
    fn new(window: Duration) -> Self {
        Self {
            window,
            seen: VecDeque::new(),
        }
    }

    fn accept(&mut self, nonce: &str, now: chrono::DateTime<Utc>) -> bool {
        self.evict(now);
        if self.seen.iter().any(|(n, _)| n == nonce) {
            return false;
        }
        self.seen.push_back((nonce.to_string(), now));
        true
    }

    fn evict(&mut self, now: chrono::DateTime<Utc>) {
        while let Some((_, seen_at)) = self.seen.front() {
            if now - *seen_at > self.window {
                self.seen.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Owns the full set of established sessions plus the shared nonce ledger.
/// Each session lives behind its own `tokio::sync::Mutex`; the nonce ledger
/// is a single small shared resource protected separately, so no operation
/// ever needs to hold two session locks at once.
pub struct SessionManager {
    sessions: DashMap<String, Arc<Mutex<Session>>>,
    nonces: Mutex<NonceLedger>,
    default_ttl: Duration,
    sequence_window: u64,
    timestamp_tolerance: Duration,
}

impl SessionManager {
    pub fn new(default_ttl: Duration, replay_window: Duration, sequence_window: u64, timestamp_tolerance: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            nonces: Mutex::new(NonceLedger::new(replay_window)),
            default_ttl,
            sequence_window,
            timestamp_tolerance,
        }
    }

    /// Inserts a `READY` session with the manager's configured TTL.
    pub fn create_session(&self, session_id: impl Into<String>, local_id: impl Into<String>, peer_id: impl Into<String>, session_key: [u8; 32]) -> String {
        let session_id = session_id.into();
        let session = Session::new(session_id.clone(), local_id, peer_id, session_key, self.default_ttl, self.sequence_window);
        self.sessions.insert(session_id.clone(), Arc::new(Mutex::new(session)));
        session_id
    }

    fn handle(&self, session_id: &str) -> Result<Arc<Mutex<Session>>, SessionError> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    /// True iff the session exists, is unexpired, and `peer_id` matches.
    pub async fn validate(&self, session_id: &str, peer_id: &str) -> Result<bool, SessionError> {
        let handle = self.handle(session_id)?;
        let session = handle.lock().await;
        if session.is_expired(Utc::now()) {
            return Ok(false);
        }
        Ok(session.peer_id == peer_id)
    }

    /// Rejects timestamps outside tolerance, rejects previously-seen
    /// nonces, then applies the sliding sequence window.
    pub async fn validate_message(&self, session_id: &str, seq: u64, nonce: &str, timestamp: chrono::DateTime<Utc>) -> Result<bool, SessionError> {
        let now = Utc::now();
        if (now - timestamp).abs() > self.timestamp_tolerance {
            return Ok(false);
        }
        {
            let mut nonces = self.nonces.lock().await;
            if !nonces.accept(nonce, now) {
                return Err(SessionError::ReplayDetected(nonce.to_string()));
            }
        }
        self.validate_sequence(session_id, seq).await
    }

    /// True iff `seq` is not a duplicate and not more than the configured
    /// window behind the highest received sequence; records on success.
    pub async fn validate_sequence(&self, session_id: &str, seq: u64) -> Result<bool, SessionError> {
        let handle = self.handle(session_id)?;
        let mut session = handle.lock().await;
        Ok(session.recv_window.accept(seq))
    }

    /// Returns the next monotonic send sequence number for `session_id`.
    pub async fn next_sequence(&self, session_id: &str) -> Result<u64, SessionError> {
        let handle = self.handle(session_id)?;
        let mut session = handle.lock().await;
        Ok(session.next_sequence())
    }

    pub async fn touch(&self, session_id: &str) -> Result<(), SessionError> {
        let handle = self.handle(session_id)?;
        let mut session = handle.lock().await;
        session.touch(Utc::now());
        Ok(())
    }

    /// Removes expired sessions. Idempotent; safe to call periodically from
    /// a background worker.
    pub fn reap(&self) -> usize {
        let now = Utc::now();
        let mut removed = 0;
        self.sessions.retain(|_, handle| {
            let expired = handle
                .try_lock()
                .map(|s| s.is_expired(now))
                .unwrap_or(false);
            if expired {
                removed += 1;
            }
            !expired
        });
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        SessionManager::new(Duration::hours(1), Duration::minutes(5), 64, Duration::seconds(30))
    }

    #[tokio::test]
    async fn create_and_validate_round_trips() {
        let mgr = manager();
        let id = mgr.create_session("s1", "alpha", "beta", [1u8; 32]);
        assert!(mgr.validate(&id, "beta").await.unwrap());
        assert!(!mgr.validate(&id, "gamma").await.unwrap());
    }

    #[tokio::test]
    async fn sequence_and_nonce_replay_are_rejected() {
        let mgr = manager();
        let id = mgr.create_session("s1", "alpha", "beta", [1u8; 32]);
        let now = Utc::now();
        assert!(mgr.validate_message(&id, 1, "n1", now).await.unwrap());
        assert!(mgr.validate_message(&id, 1, "n1", now).await.is_err());
    }

    #[tokio::test]
    async fn reap_removes_only_expired() {
        let mgr = SessionManager::new(Duration::seconds(-1), Duration::minutes(5), 64, Duration::seconds(30));
        mgr.create_session("s1", "alpha", "beta", [1u8; 32]);
        assert_eq!(mgr.reap(), 1);
        assert_eq!(mgr.session_count(), 0);
    }

    #[tokio::test]
    async fn unknown_session_not_found() {
        let mgr = manager();
        assert!(matches!(mgr.validate("missing", "beta").await, Err(SessionError::NotFound(_))));
    }
}
