//! CRDT-merged agent directory.
//!
//! A thin `DashMap`-backed store wrapped around `a2a_types::registry`'s
//! `VectorClock`/`Hlc` primitives.

use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

use a2a_types::registry::{CausalOrder, EntryStatus, Hlc, RegistryEntry, VectorClock};

use crate::error::RegistryError;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// One node's view of the distributed directory. Local mutations bump this
/// node's own vector-clock slot and hybrid logical clock; remote entries are
/// folded in via [`Registry::merge_entry`], which never blocks on another
/// entity's lock (each entry lives behind its own `DashMap` shard).
pub struct Registry {
    node_id: String,
    entries: DashMap<String, RegistryEntry>,
    clock: std::sync::Mutex<Hlc>,
}

impl Registry {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            entries: DashMap::new(),
            clock: std::sync::Mutex::new(Hlc::zero()),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    fn tick(&self) -> Hlc {
        let mut clock = self.clock.lock().unwrap_or_else(|e| e.into_inner());
        clock.tick(now_ms());
        *clock
    }

    /// Creates or refreshes an ACTIVE entry under this node's identity,
    /// bumping `vector_clock[node_id]` and the local HLC.
    pub fn register_local(
        &self,
        entity_id: impl Into<String>,
        display_name: impl Into<String>,
        endpoint: impl Into<String>,
        capabilities: impl IntoIterator<Item = String>,
    ) -> RegistryEntry {
        let entity_id = entity_id.into();
        let hlc = self.tick();
        let now = now_ms();

        let mut entry = self
            .entries
            .get(&entity_id)
            .map(|e| e.clone())
            .unwrap_or_else(|| RegistryEntry {
                entity_id: entity_id.clone(),
                display_name: String::new(),
                endpoint: String::new(),
                capabilities: Default::default(),
                registered_at: now,
                last_heartbeat: now,
                version: 0,
                origin_node_id: self.node_id.clone(),
                vector_clock: VectorClock::new(),
                hlc,
                status: EntryStatus::Active,
            });

        entry.display_name = display_name.into();
        entry.endpoint = endpoint.into();
        entry.capabilities = capabilities.into_iter().collect();
        entry.last_heartbeat = now;
        entry.origin_node_id = self.node_id.clone();
        entry.status = EntryStatus::Active;
        entry.vector_clock.increment(&self.node_id);
        entry.version += 1;
        entry.hlc = hlc;

        self.entries.insert(entity_id, entry.clone());
        entry
    }

    /// Refreshes `last_heartbeat` without bumping the version or vector
    /// clock.
    pub fn update_heartbeat(&self, entity_id: &str) -> Result<(), RegistryError> {
        let mut entry = self
            .entries
            .get_mut(entity_id)
            .ok_or_else(|| RegistryError::NotFound(entity_id.to_string()))?;
        entry.last_heartbeat = now_ms();
        Ok(())
    }

    /// Marks the entry as a tombstone; bumps the clock as a normal mutation
    /// would. Tombstones are retained until `tombstone_ttl` elapses.
    pub fn unregister_local(&self, entity_id: &str) -> Result<RegistryEntry, RegistryError> {
        let hlc = self.tick();
        let mut entry = self
            .entries
            .get_mut(entity_id)
            .ok_or_else(|| RegistryError::NotFound(entity_id.to_string()))?;
        entry.vector_clock.increment(&self.node_id);
        entry.version += 1;
        entry.hlc = hlc;
        entry.status = EntryStatus::Tombstone;
        entry.origin_node_id = self.node_id.clone();
        Ok(entry.clone())
    }

    /// Folds a remote entry into local state: adopt an entry this node has
    /// never seen; adopt a causally-newer remote entry; reject a
    /// causally-older one; on true concurrency,
    /// tie-break by higher HLC then lexicographic `origin_node_id`, but a
    /// TOMBSTONE always shadows a concurrent ACTIVE update regardless of the
    /// tie-break. The winner's `vector_clock` is always the pointwise max of
    /// both sides.
    pub fn merge_entry(&self, remote: RegistryEntry) -> RegistryEntry {
        let entity_id = remote.entity_id.clone();
        let joined_clock = match self.entries.get(&entity_id) {
            None => {
                self.entries.insert(entity_id.clone(), remote.clone());
                return remote;
            }
            Some(local) => local.vector_clock.join(&remote.vector_clock),
        };

        let mut winner = {
            let local = self.entries.get(&entity_id).expect("checked above").clone();
            match local.vector_clock.compare(&remote.vector_clock) {
                CausalOrder::Equal => local,
                CausalOrder::After => local,
                CausalOrder::Before => remote,
                CausalOrder::Concurrent => {
                    if remote.status == EntryStatus::Tombstone && local.status != EntryStatus::Tombstone {
                        remote
                    } else if local.status == EntryStatus::Tombstone && remote.status != EntryStatus::Tombstone {
                        local
                    } else {
                        tie_break(local, remote)
                    }
                }
            }
        };
        winner.vector_clock = joined_clock;
        self.entries.insert(entity_id, winner.clone());
        winner
    }

    pub fn get(&self, entity_id: &str) -> Option<RegistryEntry> {
        self.entries.get(entity_id).map(|e| e.clone())
    }

    /// Linear scan over ACTIVE entries exposing `capability`. Best-effort
    /// consistent: callers must not assume global agreement.
    pub fn find_by_capability(&self, capability: &str) -> Vec<RegistryEntry> {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::Active && e.capabilities.contains(capability))
            .map(|e| e.clone())
            .collect()
    }

    /// True if `entity_id`'s entry is ACTIVE and its heartbeat is within
    /// `liveness_timeout_seconds`. An ACTIVE entry that fails this check is
    /// reported as not-alive but is never removed.
    pub fn is_alive(&self, entity_id: &str, liveness_timeout_seconds: u64) -> bool {
        match self.entries.get(entity_id) {
            Some(e) if e.status == EntryStatus::Active => {
                let age_ms = now_ms().saturating_sub(e.last_heartbeat);
                age_ms <= liveness_timeout_seconds * 1000
            }
            _ => false,
        }
    }

    /// Removes tombstones older than `tombstone_ttl_seconds`, measured from
    /// the tombstone's HLC wall time. Idempotent.
    pub fn gc_tombstones(&self, tombstone_ttl_seconds: u64) -> usize {
        let now = now_ms();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let expired = entry.status == EntryStatus::Tombstone
                && now.saturating_sub(entry.hlc.wall_ms) > tombstone_ttl_seconds * 1000;
            if expired {
                removed += 1;
            }
            !expired
        });
        removed
    }

    /// Snapshot digest for gossip: `entity_id -> max(vector_clock values)`,
    /// the cheap per-entity staleness proxy exchanged in a gossip round.
    pub fn digest(&self) -> std::collections::BTreeMap<String, u64> {
        self.entries
            .iter()
            .map(|e| (e.entity_id.clone(), e.vector_clock.0.values().copied().max().unwrap_or(0)))
            .collect()
    }

    /// Entries whose digest value exceeds the corresponding value in
    /// `peer_digest` (or that the peer doesn't have at all) — the entries
    /// this node should push in response to a received digest.
    pub fn entries_newer_than(&self, peer_digest: &std::collections::BTreeMap<String, u64>) -> Vec<RegistryEntry> {
        self.entries
            .iter()
            .filter(|e| {
                let local_value = e.vector_clock.0.values().copied().max().unwrap_or(0);
                peer_digest.get(e.entity_id.as_str()).copied().unwrap_or(0) < local_value
            })
            .map(|e| e.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn tie_break(local: RegistryEntry, remote: RegistryEntry) -> RegistryEntry {
    match local.hlc.cmp(&remote.hlc) {
        std::cmp::Ordering::Greater => local,
        std::cmp::Ordering::Less => remote,
        std::cmp::Ordering::Equal => {
            if local.origin_node_id >= remote.origin_node_id {
                local
            } else {
                remote
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_lookup() {
        let reg = Registry::new("n1");
        reg.register_local("svc-1", "Service One", "tcp://a", vec!["store".into()]);
        let entry = reg.get("svc-1").unwrap();
        assert_eq!(entry.status, EntryStatus::Active);
        assert_eq!(entry.vector_clock.get("n1"), 1);
    }

    #[test]
    fn heartbeat_does_not_bump_version() {
        let reg = Registry::new("n1");
        reg.register_local("svc-1", "Service One", "tcp://a", vec![]);
        let before = reg.get("svc-1").unwrap().version;
        reg.update_heartbeat("svc-1").unwrap();
        let after = reg.get("svc-1").unwrap().version;
        assert_eq!(before, after);
    }

    #[test]
    fn merge_adopts_causally_newer_entry() {
        let n1 = Registry::new("n1");
        n1.register_local("svc-1", "Svc", "tcp://a", vec!["store".into()]);
        let mut remote = n1.get("svc-1").unwrap();
        remote.vector_clock.increment("n1");
        remote.capabilities.insert("search".into());

        let n2 = Registry::new("n2");
        let merged = n2.merge_entry(remote.clone());
        assert!(merged.capabilities.contains("search"));
    }

    #[test]
    fn merge_rejects_causally_older_entry() {
        let n1 = Registry::new("n1");
        let newer = n1.register_local("svc-1", "Svc", "tcp://a", vec!["store".into()]);

        let n2 = Registry::new("n2");
        n2.merge_entry(newer.clone());
        let mut older = newer.clone();
        older.vector_clock = VectorClock::new(); // strictly behind

        let result = n2.merge_entry(older);
        assert_eq!(result.capabilities, newer.capabilities);
    }

    #[test]
    fn concurrent_updates_tie_break_by_hlc_then_origin() {
        let n1 = Registry::new("n1");
        let mut a = n1.register_local("svc-1", "Svc", "tcp://a", vec!["store".into()]);
        a.origin_node_id = "n1".into();
        a.hlc = Hlc { wall_ms: 100, logical_counter: 0 };

        let mut b = a.clone();
        b.vector_clock = VectorClock::new();
        b.vector_clock.increment("n2");
        b.origin_node_id = "n2".into();
        b.hlc = Hlc { wall_ms: 200, logical_counter: 0 };
        b.capabilities = vec!["search".to_string()].into_iter().collect();

        let n3 = Registry::new("n3");
        n3.merge_entry(a);
        let merged = n3.merge_entry(b);
        assert!(merged.capabilities.contains("search")); // b has higher hlc
    }

    #[test]
    fn tombstone_shadows_concurrent_active_update() {
        let n1 = Registry::new("n1");
        let base = n1.register_local("svc-1", "Svc", "tcp://a", vec![]);

        let mut tombstone = base.clone();
        tombstone.vector_clock.increment("n1");
        tombstone.status = EntryStatus::Tombstone;
        tombstone.hlc = Hlc { wall_ms: 50, logical_counter: 0 }; // lower HLC than the active update

        let mut active = base.clone();
        active.vector_clock.increment("n2");
        active.hlc = Hlc { wall_ms: 999, logical_counter: 0 }; // higher HLC, would normally win

        let n3 = Registry::new("n3");
        n3.merge_entry(tombstone);
        let merged = n3.merge_entry(active);
        assert_eq!(merged.status, EntryStatus::Tombstone);
    }

    #[test]
    fn gc_removes_only_expired_tombstones() {
        let n1 = Registry::new("n1");
        n1.register_local("svc-1", "Svc", "tcp://a", vec![]);
        let mut tombstone = n1.unregister_local("svc-1").unwrap();
        tombstone.hlc.wall_ms = 0; // ancient
        n1.merge_entry(tombstone);
        assert_eq!(n1.gc_tombstones(1), 1);
        assert!(n1.get("svc-1").is_none());
    }

    #[test]
    fn find_by_capability_excludes_inactive() {
        let n1 = Registry::new("n1");
        n1.register_local("svc-1", "Svc", "tcp://a", vec!["store".into()]);
        n1.register_local("svc-2", "Svc2", "tcp://b", vec!["store".into()]);
        n1.unregister_local("svc-2").unwrap();
        let found = n1.find_by_capability("store");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].entity_id, "svc-1");
    }
}
