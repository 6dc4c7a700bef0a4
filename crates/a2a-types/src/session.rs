//! Session data model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Initial,
    InitSent,
    AckReceived,
    ChallengeSent,
    Established,
    Confirmed,
    Ready,
    Error,
    Expired,
}

impl SessionState {
    /// `ERROR` is absorbing: once entered, no further transition is valid.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Error | Self::Expired)
    }
}

/// A bounded window of recently-accepted receive sequence numbers, used to
/// reject replays while tolerating benign reordering within the window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceWindow {
    window: u64,
    highest: u64,
    seen: VecDeque<u64>,
}

impl SequenceWindow {
    pub fn new(window: u64) -> Self {
        Self {
            window,
            highest: 0,
            seen: VecDeque::new(),
        }
    }

    pub fn highest(&self) -> u64 {
        self.highest
    }

    /// Returns `true` and records `seq` iff it hasn't been seen, isn't more
    /// than `window` behind the highest received sequence, and doesn't jump
    /// more than `window` ahead of it.
    pub fn accept(&mut self, seq: u64) -> bool {
        if seq == 0 {
            return false;
        }
        if seq + self.window <= self.highest {
            return false; // too far behind, out of window
        }
        if seq > self.highest + self.window {
            return false; // too far ahead, out of window
        }
        if self.seen.contains(&seq) {
            return false; // duplicate
        }
        self.seen.push_back(seq);
        if seq > self.highest {
            self.highest = seq;
        }
        // Evict entries that have fallen out of the window to bound memory.
        while let Some(&front) = self.seen.front() {
            if front + self.window <= self.highest {
                self.seen.pop_front();
            } else {
                break;
            }
        }
        true
    }
}

/// An established, authenticated channel between two peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub local_id: String,
    pub peer_id: String,
    pub state: SessionState,
    #[serde(with = "serde_bytes")]
    pub session_key: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub next_send_seq: u64,
    pub recv_window: SequenceWindow,
}

impl Session {
    pub fn new(
        session_id: impl Into<String>,
        local_id: impl Into<String>,
        peer_id: impl Into<String>,
        session_key: [u8; 32],
        ttl: Duration,
        sequence_window: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            local_id: local_id.into(),
            peer_id: peer_id.into(),
            state: SessionState::Ready,
            session_key: session_key.to_vec(),
            created_at: now,
            expires_at: now + ttl,
            last_activity: now,
            next_send_seq: 0,
            recv_window: SequenceWindow::new(sequence_window),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    /// Returns the next strictly-increasing send sequence number.
    pub fn next_sequence(&mut self) -> u64 {
        self.next_send_seq += 1;
        self.next_send_seq
    }
}
