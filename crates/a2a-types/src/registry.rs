//! Distributed registry data model: vector clocks, hybrid logical clocks,
//! and `RegistryEntry`.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Per-node monotonic counter map used to determine causal ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorClock(pub BTreeMap<String, u64>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CausalOrder {
    Before,
    After,
    Equal,
    Concurrent,
}

impl VectorClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, node_id: &str) {
        *self.0.entry(node_id.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, node_id: &str) -> u64 {
        self.0.get(node_id).copied().unwrap_or(0)
    }

    /// Pointwise maximum of two clocks, used when merging concurrent
    /// updates.
    pub fn join(&self, other: &Self) -> Self {
        let mut merged = self.0.clone();
        for (node, &value) in &other.0 {
            let entry = merged.entry(node.clone()).or_insert(0);
            if value > *entry {
                *entry = value;
            }
        }
        Self(merged)
    }

    /// Determines the causal relationship of `self` with respect to
    /// `other`: `self.compare(other) == After` means self happens-after
    /// other (self dominates).
    pub fn compare(&self, other: &Self) -> CausalOrder {
        let mut self_greater = false;
        let mut other_greater = false;
        let mut nodes: BTreeSet<&String> = self.0.keys().collect();
        nodes.extend(other.0.keys());
        for node in nodes {
            let a = self.get(node);
            let b = other.get(node);
            match a.cmp(&b) {
                CmpOrdering::Greater => self_greater = true,
                CmpOrdering::Less => other_greater = true,
                CmpOrdering::Equal => {}
            }
        }
        match (self_greater, other_greater) {
            (false, false) => CausalOrder::Equal,
            (true, false) => CausalOrder::After,
            (false, true) => CausalOrder::Before,
            (true, true) => CausalOrder::Concurrent,
        }
    }
}

/// A physical timestamp paired with a logical counter for tie-breaking
/// concurrent events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hlc {
    pub wall_ms: u64,
    pub logical_counter: u64,
}

impl Hlc {
    pub fn zero() -> Self {
        Self {
            wall_ms: 0,
            logical_counter: 0,
        }
    }

    /// Advances the clock given the current wall time, per the HLC update
    /// rule: `wall_ms >= max(physical_now, self.wall_ms)`, logical counter
    /// resets to 0 on a forward jump in wall time and increments on a tie.
    pub fn tick(&mut self, physical_now_ms: u64) {
        if physical_now_ms > self.wall_ms {
            self.wall_ms = physical_now_ms;
            self.logical_counter = 0;
        } else {
            self.logical_counter += 1;
        }
    }

    /// Merges with a received HLC, as in the standard HLC receive rule.
    pub fn merge(&mut self, physical_now_ms: u64, received: Hlc) {
        let max_wall = physical_now_ms.max(self.wall_ms).max(received.wall_ms);
        if max_wall == self.wall_ms && max_wall == received.wall_ms {
            self.logical_counter = self.logical_counter.max(received.logical_counter) + 1;
        } else if max_wall == self.wall_ms {
            self.logical_counter += 1;
        } else if max_wall == received.wall_ms {
            self.logical_counter = received.logical_counter + 1;
        } else {
            self.logical_counter = 0;
        }
        self.wall_ms = max_wall;
    }
}

impl PartialOrd for Hlc {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Hlc {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (self.wall_ms, self.logical_counter).cmp(&(other.wall_ms, other.logical_counter))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    Active,
    Suspended,
    Tombstone,
}

/// A replicated directory entry for one agent, as seen by one registry
/// node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub entity_id: String,
    pub display_name: String,
    pub endpoint: String,
    pub capabilities: BTreeSet<String>,
    pub registered_at: u64,
    pub last_heartbeat: u64,
    /// Monotonic per-origin-node version, bumped on every local mutation.
    pub version: u64,
    pub origin_node_id: String,
    pub vector_clock: VectorClock,
    pub hlc: Hlc,
    pub status: EntryStatus,
}

impl RegistryEntry {
    pub fn is_tombstone(&self) -> bool {
        matches!(self.status, EntryStatus::Tombstone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_clock_join_is_commutative_and_idempotent() {
        let mut a = VectorClock::new();
        a.increment("n1");
        let mut b = VectorClock::new();
        b.increment("n2");
        b.increment("n2");

        let ab = a.join(&b);
        let ba = b.join(&a);
        assert_eq!(ab, ba);
        assert_eq!(ab.join(&ab), ab); // idempotent
    }

    #[test]
    fn vector_clock_detects_concurrency() {
        let mut a = VectorClock::new();
        a.increment("n1");
        let mut b = VectorClock::new();
        b.increment("n2");
        assert_eq!(a.compare(&b), CausalOrder::Concurrent);

        let mut c = a.clone();
        c.increment("n1");
        assert_eq!(c.compare(&a), CausalOrder::After);
        assert_eq!(a.compare(&c), CausalOrder::Before);
    }

    #[test]
    fn hlc_logical_counter_increments_on_tie() {
        let mut h = Hlc::zero();
        h.tick(100);
        h.tick(100);
        assert_eq!(h.wall_ms, 100);
        assert_eq!(h.logical_counter, 1);
    }
}
