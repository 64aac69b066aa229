// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store collaborator trait
//!
//! The shared store holds the four collections of every pool. Each trait
//! method is one atomic step against that store; the coordinator never
//! composes two calls where an interleaving would break pool invariants.

use crate::keys::PoolKeys;
use crate::resource::ResourceId;
use crate::sync::SyncPlan;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The backend dropped its cached release procedure; resubmitting it succeeds
    #[error("release procedure not cached by store")]
    ScriptNotCached,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt store document: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Result of the atomic release transition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseOutcome {
    /// Was busy and registered; now at the tail of the available queue
    Returned,
    /// Was busy but no longer registered; dropped from bookkeeping
    Evicted,
    /// Was not busy; nothing changed
    NotBusy,
}

/// A single lease recorded in the busy index
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub resource: ResourceId,
    /// Epoch milliseconds after which the reaper reclaims the lease
    pub expires_at_ms: u64,
}

/// Consistent read of one pool's collections
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Registry members, sorted
    pub resources: Vec<ResourceId>,
    /// Available queue, head first
    pub available: Vec<ResourceId>,
    /// Busy queue, oldest checkout first
    pub busy: Vec<ResourceId>,
    /// Busy index, soonest expiry first
    pub leases: Vec<Lease>,
}

/// Shared durable store for pool collections
#[async_trait]
pub trait LeaseStore: Clone + Send + Sync + 'static {
    /// Create the pool if its registry is absent: register `ids` and append
    /// them to the available queue in order. Returns whether it seeded.
    async fn seed(&self, keys: &PoolKeys, ids: &[ResourceId]) -> Result<bool, StoreError>;

    /// Pop the head of the available queue onto the tail of the busy queue,
    /// blocking up to `wait` while the queue is empty. `None` on timeout.
    ///
    /// The lease expiry is taken from `expires_at` at the moment of the pop
    /// and indexed in the same transaction, so a checkout never exists
    /// without a lease the reaper can find.
    async fn move_to_busy(
        &self,
        keys: &PoolKeys,
        wait: Duration,
        expires_at: &(dyn Fn() -> u64 + Send + Sync),
    ) -> Result<Option<ResourceId>, StoreError>;

    /// Return a busy id to the available queue if it is still registered
    async fn release(&self, keys: &PoolKeys, id: &ResourceId)
        -> Result<ReleaseOutcome, StoreError>;

    /// Release `id` only if its lease is still due at `now_ms`
    async fn reclaim(
        &self,
        keys: &PoolKeys,
        id: &ResourceId,
        now_ms: u64,
    ) -> Result<ReleaseOutcome, StoreError>;

    /// Register ids and make the idle ones available
    async fn add(&self, keys: &PoolKeys, ids: &[ResourceId]) -> Result<(), StoreError>;

    /// Evict ids from every collection
    async fn remove(&self, keys: &PoolKeys, ids: &[ResourceId]) -> Result<(), StoreError>;

    /// Apply a reconciliation plan in one transaction
    async fn apply_sync(&self, keys: &PoolKeys, plan: &SyncPlan) -> Result<(), StoreError>;

    /// Registry members, sorted
    async fn registry(&self, keys: &PoolKeys) -> Result<Vec<ResourceId>, StoreError>;

    async fn registry_len(&self, keys: &PoolKeys) -> Result<usize, StoreError>;

    async fn snapshot(&self, keys: &PoolKeys) -> Result<PoolSnapshot, StoreError>;

    /// Busy ids whose lease expired at or before `now_ms`
    async fn expired(&self, keys: &PoolKeys, now_ms: u64) -> Result<Vec<ResourceId>, StoreError>;

    /// Delete all four collections of the pool
    async fn delete(&self, keys: &PoolKeys) -> Result<(), StoreError>;
}
