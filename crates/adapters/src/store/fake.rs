// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake lease store for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::MemoryStore;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wl_core::{
    Keyspace, LeaseStore, PoolKeys, PoolSnapshot, ReleaseOutcome, ResourceId, StoreError, SyncPlan,
};

/// Recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Seed { ids: Vec<ResourceId> },
    MoveToBusy { wait: Duration },
    Release { id: ResourceId },
    Reclaim { id: ResourceId, now_ms: u64 },
    Add { ids: Vec<ResourceId> },
    Remove { ids: Vec<ResourceId> },
    ApplySync { plan: SyncPlan },
    Registry,
    RegistryLen,
    Snapshot,
    Expired { now_ms: u64 },
    Delete,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<StoreCall>,
    /// Next call of any kind fails with this message
    fail_next: Option<String>,
    /// Every expiry scan fails while set
    fail_expired: bool,
    /// Next release or reclaim reports the procedure missing from the store cache
    script_evicted: bool,
    /// Delay before a successful pop is reported back to the caller
    pop_delay: Option<Duration>,
}

/// Memory store with call recording and failure injection
#[derive(Clone, Default)]
pub struct FakeStore {
    inner: MemoryStore,
    state: Arc<Mutex<FakeState>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Fail the next store call with [`StoreError::Unavailable`]
    pub fn fail_next(&self, message: impl Into<String>) {
        self.lock().fail_next = Some(message.into());
    }

    /// Make every expiry scan fail until turned off
    pub fn set_fail_expired(&self, fail: bool) {
        self.lock().fail_expired = fail;
    }

    /// Make the next release or reclaim report [`StoreError::ScriptNotCached`]
    pub fn evict_release_script(&self) {
        self.lock().script_evicted = true;
    }

    /// Hold every successful pop for `delay` after it has been committed
    pub fn set_pop_delay(&self, delay: Duration) {
        self.lock().pop_delay = Some(delay);
    }

    pub fn keyspace(&self) -> Keyspace {
        self.inner.keyspace()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a call and consume any one-shot failure
    fn record(&self, call: StoreCall) -> Result<(), StoreError> {
        let mut state = self.lock();
        let is_expired = matches!(call, StoreCall::Expired { .. });
        let is_release = matches!(call, StoreCall::Release { .. } | StoreCall::Reclaim { .. });
        state.calls.push(call);

        if let Some(message) = state.fail_next.take() {
            return Err(StoreError::Unavailable(message));
        }
        if is_expired && state.fail_expired {
            return Err(StoreError::Unavailable("expiry scan failed".to_string()));
        }
        if is_release && state.script_evicted {
            state.script_evicted = false;
            return Err(StoreError::ScriptNotCached);
        }
        Ok(())
    }
}

#[async_trait]
impl LeaseStore for FakeStore {
    async fn seed(&self, keys: &PoolKeys, ids: &[ResourceId]) -> Result<bool, StoreError> {
        self.record(StoreCall::Seed { ids: ids.to_vec() })?;
        self.inner.seed(keys, ids).await
    }

    async fn move_to_busy(
        &self,
        keys: &PoolKeys,
        wait: Duration,
        expires_at: &(dyn Fn() -> u64 + Send + Sync),
    ) -> Result<Option<ResourceId>, StoreError> {
        self.record(StoreCall::MoveToBusy { wait })?;
        let popped = self.inner.move_to_busy(keys, wait, expires_at).await?;
        let delay = self.lock().pop_delay;
        if let (Some(_), Some(delay)) = (&popped, delay) {
            tokio::time::sleep(delay).await;
        }
        Ok(popped)
    }

    async fn release(
        &self,
        keys: &PoolKeys,
        id: &ResourceId,
    ) -> Result<ReleaseOutcome, StoreError> {
        self.record(StoreCall::Release { id: id.clone() })?;
        self.inner.release(keys, id).await
    }

    async fn reclaim(
        &self,
        keys: &PoolKeys,
        id: &ResourceId,
        now_ms: u64,
    ) -> Result<ReleaseOutcome, StoreError> {
        self.record(StoreCall::Reclaim {
            id: id.clone(),
            now_ms,
        })?;
        self.inner.reclaim(keys, id, now_ms).await
    }

    async fn add(&self, keys: &PoolKeys, ids: &[ResourceId]) -> Result<(), StoreError> {
        self.record(StoreCall::Add { ids: ids.to_vec() })?;
        self.inner.add(keys, ids).await
    }

    async fn remove(&self, keys: &PoolKeys, ids: &[ResourceId]) -> Result<(), StoreError> {
        self.record(StoreCall::Remove { ids: ids.to_vec() })?;
        self.inner.remove(keys, ids).await
    }

    async fn apply_sync(&self, keys: &PoolKeys, plan: &SyncPlan) -> Result<(), StoreError> {
        self.record(StoreCall::ApplySync { plan: plan.clone() })?;
        self.inner.apply_sync(keys, plan).await
    }

    async fn registry(&self, keys: &PoolKeys) -> Result<Vec<ResourceId>, StoreError> {
        self.record(StoreCall::Registry)?;
        self.inner.registry(keys).await
    }

    async fn registry_len(&self, keys: &PoolKeys) -> Result<usize, StoreError> {
        self.record(StoreCall::RegistryLen)?;
        self.inner.registry_len(keys).await
    }

    async fn snapshot(&self, keys: &PoolKeys) -> Result<PoolSnapshot, StoreError> {
        self.record(StoreCall::Snapshot)?;
        self.inner.snapshot(keys).await
    }

    async fn expired(&self, keys: &PoolKeys, now_ms: u64) -> Result<Vec<ResourceId>, StoreError> {
        self.record(StoreCall::Expired { now_ms })?;
        self.inner.expired(keys, now_ms).await
    }

    async fn delete(&self, keys: &PoolKeys) -> Result<(), StoreError> {
        self.record(StoreCall::Delete)?;
        self.inner.delete(keys).await
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
