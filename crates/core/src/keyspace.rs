// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory model of the store's primitive collections
//!
//! A `Keyspace` holds sets, lists and scored indexes by key, with the
//! convention that an empty collection does not exist. The pool transitions
//! on top of it are the single source of truth for lease semantics; every
//! store backend applies them under its own atomicity guarantee (a mutex,
//! a file lock).

use crate::keys::PoolKeys;
use crate::resource::ResourceId;
use crate::store::{Lease, PoolSnapshot, ReleaseOutcome};
use crate::sync::SyncPlan;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Sets, lists and scored indexes addressed by key
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyspace {
    #[serde(default)]
    sets: BTreeMap<String, BTreeSet<ResourceId>>,
    #[serde(default)]
    lists: BTreeMap<String, VecDeque<ResourceId>>,
    #[serde(default)]
    scores: BTreeMap<String, BTreeMap<ResourceId, u64>>,
}

impl Keyspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any collection is stored under `key`
    pub fn contains_key(&self, key: &str) -> bool {
        self.sets.contains_key(key) || self.lists.contains_key(key) || self.scores.contains_key(key)
    }

    // === Pool transitions ===

    /// Whether the pool has been seeded (its registry exists)
    pub fn exists(&self, keys: &PoolKeys) -> bool {
        self.sets.contains_key(&keys.registry)
    }

    /// Seed an absent pool with `ids`, keeping first occurrences in order
    pub fn seed(&mut self, keys: &PoolKeys, ids: &[ResourceId]) -> bool {
        if self.exists(keys) {
            return false;
        }
        let mut seen = BTreeSet::new();
        for id in ids {
            if seen.insert(id) {
                self.sadd(&keys.registry, id);
                self.rpush(&keys.available, id);
            }
        }
        true
    }

    /// Move the head of the available queue to the tail of the busy queue
    /// and record its lease expiry in the same step
    pub fn move_to_busy(&mut self, keys: &PoolKeys, expires_at_ms: u64) -> Option<ResourceId> {
        let id = self.lpop(&keys.available)?;
        self.rpush(&keys.busy, &id);
        self.scores
            .entry(keys.busy_index.clone())
            .or_default()
            .insert(id.clone(), expires_at_ms);
        Some(id)
    }

    /// Return a busy id to the tail of the available queue
    pub fn release(&mut self, keys: &PoolKeys, id: &ResourceId) -> ReleaseOutcome {
        let removed_busy = self.lrem(&keys.busy, id);
        let removed_lease = self.zrem(&keys.busy_index, id);
        if removed_busy == 0 && !removed_lease {
            return ReleaseOutcome::NotBusy;
        }
        if !self.sismember(&keys.registry, id) {
            return ReleaseOutcome::Evicted;
        }
        self.lrem(&keys.available, id);
        self.rpush(&keys.available, id);
        ReleaseOutcome::Returned
    }

    /// Release `id` only if its lease expired at or before `now_ms`
    pub fn reclaim(&mut self, keys: &PoolKeys, id: &ResourceId, now_ms: u64) -> ReleaseOutcome {
        let due = self
            .scores
            .get(&keys.busy_index)
            .and_then(|index| index.get(id))
            .is_some_and(|expires_at_ms| *expires_at_ms <= now_ms);
        if !due {
            return ReleaseOutcome::NotBusy;
        }
        self.release(keys, id)
    }

    /// Register ids; idle ones are (re)appended to the available queue
    pub fn add(&mut self, keys: &PoolKeys, ids: &[ResourceId]) {
        for id in ids {
            self.sadd(&keys.registry, id);
            // A busy id comes back through release, not through add
            if self.lcontains(&keys.busy, id) {
                continue;
            }
            self.lrem(&keys.available, id);
            self.rpush(&keys.available, id);
        }
    }

    /// Evict ids from all four collections
    pub fn remove(&mut self, keys: &PoolKeys, ids: &[ResourceId]) {
        for id in ids {
            self.lrem(&keys.busy, id);
            self.lrem(&keys.available, id);
            self.zrem(&keys.busy_index, id);
            self.srem(&keys.registry, id);
        }
    }

    /// Apply a reconciliation plan: removals first, then additions
    pub fn apply_sync(&mut self, keys: &PoolKeys, plan: &SyncPlan) {
        self.remove(keys, &plan.to_remove);
        self.add(keys, &plan.to_add);
    }

    /// Registry members, sorted
    pub fn registry(&self, keys: &PoolKeys) -> Vec<ResourceId> {
        self.sets
            .get(&keys.registry)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn registry_len(&self, keys: &PoolKeys) -> usize {
        self.sets.get(&keys.registry).map_or(0, BTreeSet::len)
    }

    pub fn snapshot(&self, keys: &PoolKeys) -> PoolSnapshot {
        let mut leases: Vec<Lease> = self
            .scores
            .get(&keys.busy_index)
            .map(|index| {
                index
                    .iter()
                    .map(|(resource, expires_at_ms)| Lease {
                        resource: resource.clone(),
                        expires_at_ms: *expires_at_ms,
                    })
                    .collect()
            })
            .unwrap_or_default();
        leases.sort_by(|a, b| {
            a.expires_at_ms
                .cmp(&b.expires_at_ms)
                .then_with(|| a.resource.cmp(&b.resource))
        });

        PoolSnapshot {
            resources: self.registry(keys),
            available: self.lrange(&keys.available),
            busy: self.lrange(&keys.busy),
            leases,
        }
    }

    /// Busy ids with an expiry at or before `now_ms`, soonest first
    pub fn expired(&self, keys: &PoolKeys, now_ms: u64) -> Vec<ResourceId> {
        self.snapshot(keys)
            .leases
            .into_iter()
            .take_while(|lease| lease.expires_at_ms <= now_ms)
            .map(|lease| lease.resource)
            .collect()
    }

    /// Delete every collection of the pool
    pub fn delete(&mut self, keys: &PoolKeys) {
        for key in keys.all() {
            self.sets.remove(key);
            self.lists.remove(key);
            self.scores.remove(key);
        }
    }

    // === Primitives ===

    fn sadd(&mut self, key: &str, id: &ResourceId) {
        self.sets.entry(key.to_string()).or_default().insert(id.clone());
    }

    fn srem(&mut self, key: &str, id: &ResourceId) {
        if let Some(set) = self.sets.get_mut(key) {
            set.remove(id);
            if set.is_empty() {
                self.sets.remove(key);
            }
        }
    }

    fn sismember(&self, key: &str, id: &ResourceId) -> bool {
        self.sets.get(key).is_some_and(|set| set.contains(id))
    }

    fn rpush(&mut self, key: &str, id: &ResourceId) {
        self.lists.entry(key.to_string()).or_default().push_back(id.clone());
    }

    fn lpop(&mut self, key: &str) -> Option<ResourceId> {
        let list = self.lists.get_mut(key)?;
        let id = list.pop_front();
        if list.is_empty() {
            self.lists.remove(key);
        }
        id
    }

    /// Remove every occurrence of `id`, returning how many were removed
    fn lrem(&mut self, key: &str, id: &ResourceId) -> usize {
        let Some(list) = self.lists.get_mut(key) else {
            return 0;
        };
        let before = list.len();
        list.retain(|item| item != id);
        let removed = before - list.len();
        if list.is_empty() {
            self.lists.remove(key);
        }
        removed
    }

    fn lcontains(&self, key: &str, id: &ResourceId) -> bool {
        self.lists.get(key).is_some_and(|list| list.contains(id))
    }

    fn lrange(&self, key: &str) -> Vec<ResourceId> {
        self.lists
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn zrem(&mut self, key: &str, id: &ResourceId) -> bool {
        let Some(index) = self.scores.get_mut(key) else {
            return false;
        };
        let removed = index.remove(id).is_some();
        if index.is_empty() {
            self.scores.remove(key);
        }
        removed
    }
}

#[cfg(test)]
#[path = "keyspace_tests.rs"]
mod tests;
