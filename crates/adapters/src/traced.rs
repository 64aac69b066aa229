// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced store wrapper for consistent observability

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::Instrument;
use wl_core::{
    LeaseStore, PoolKeys, PoolSnapshot, ReleaseOutcome, ResourceId, StoreError, SyncPlan,
};

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn elapsed_ms(start: Instant) -> u64 {
    millis(start.elapsed())
}

/// Log the error branch of a store result, passing it through
fn log_failure<T>(result: &Result<T, StoreError>, start: Instant) {
    if let Err(e) = result {
        tracing::error!(elapsed_ms = elapsed_ms(start), error = %e, "store call failed");
    }
}

/// Wrapper that adds tracing to any LeaseStore
#[derive(Clone)]
pub struct TracedStore<S> {
    inner: S,
}

impl<S> TracedStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: LeaseStore> LeaseStore for TracedStore<S> {
    async fn seed(&self, keys: &PoolKeys, ids: &[ResourceId]) -> Result<bool, StoreError> {
        let span = tracing::info_span!("store.seed", pool = %keys.registry);
        async {
            let start = Instant::now();
            let result = self.inner.seed(keys, ids).await;
            match &result {
                Ok(seeded) => tracing::info!(
                    seeded,
                    count = ids.len(),
                    elapsed_ms = elapsed_ms(start),
                    "seed finished"
                ),
                Err(_) => log_failure(&result, start),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn move_to_busy(
        &self,
        keys: &PoolKeys,
        wait: Duration,
        expires_at: &(dyn Fn() -> u64 + Send + Sync),
    ) -> Result<Option<ResourceId>, StoreError> {
        let span = tracing::debug_span!("store.move_to_busy", pool = %keys.available);
        async {
            tracing::debug!(wait_ms = millis(wait), "waiting for resource");
            let start = Instant::now();
            let result = self.inner.move_to_busy(keys, wait, expires_at).await;
            match &result {
                Ok(Some(id)) => tracing::debug!(
                    resource = %id,
                    elapsed_ms = elapsed_ms(start),
                    "resource moved to busy"
                ),
                Ok(None) => tracing::debug!(elapsed_ms = elapsed_ms(start), "wait timed out"),
                Err(_) => log_failure(&result, start),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn release(
        &self,
        keys: &PoolKeys,
        id: &ResourceId,
    ) -> Result<ReleaseOutcome, StoreError> {
        let span = tracing::debug_span!("store.release", pool = %keys.busy, resource = %id);
        async {
            let start = Instant::now();
            let result = self.inner.release(keys, id).await;
            match &result {
                Ok(outcome) => {
                    tracing::debug!(?outcome, elapsed_ms = elapsed_ms(start), "released")
                }
                // The caller resubmits; not worth an error line
                Err(StoreError::ScriptNotCached) => tracing::debug!("release procedure not cached"),
                Err(_) => log_failure(&result, start),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn reclaim(
        &self,
        keys: &PoolKeys,
        id: &ResourceId,
        now_ms: u64,
    ) -> Result<ReleaseOutcome, StoreError> {
        let span = tracing::debug_span!("store.reclaim", pool = %keys.busy, resource = %id);
        async {
            let start = Instant::now();
            let result = self.inner.reclaim(keys, id, now_ms).await;
            match &result {
                Ok(outcome) => {
                    tracing::debug!(?outcome, now_ms, elapsed_ms = elapsed_ms(start), "reclaimed")
                }
                Err(StoreError::ScriptNotCached) => tracing::debug!("reclaim procedure not cached"),
                Err(_) => log_failure(&result, start),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn add(&self, keys: &PoolKeys, ids: &[ResourceId]) -> Result<(), StoreError> {
        let start = Instant::now();
        let result = self.inner.add(keys, ids).await;
        if result.is_ok() {
            tracing::info!(pool = %keys.registry, count = ids.len(), "resources added");
        }
        log_failure(&result, start);
        result
    }

    async fn remove(&self, keys: &PoolKeys, ids: &[ResourceId]) -> Result<(), StoreError> {
        let start = Instant::now();
        let result = self.inner.remove(keys, ids).await;
        if result.is_ok() {
            tracing::info!(pool = %keys.registry, count = ids.len(), "resources removed");
        }
        log_failure(&result, start);
        result
    }

    async fn apply_sync(&self, keys: &PoolKeys, plan: &SyncPlan) -> Result<(), StoreError> {
        let start = Instant::now();
        let result = self.inner.apply_sync(keys, plan).await;
        if result.is_ok() {
            tracing::info!(
                pool = %keys.registry,
                removed = plan.to_remove.len(),
                added = plan.to_add.len(),
                "sync applied"
            );
        }
        log_failure(&result, start);
        result
    }

    async fn registry(&self, keys: &PoolKeys) -> Result<Vec<ResourceId>, StoreError> {
        let start = Instant::now();
        let result = self.inner.registry(keys).await;
        tracing::trace!(pool = %keys.registry, size = ?result.as_ref().map(Vec::len).ok(), "read registry");
        log_failure(&result, start);
        result
    }

    async fn registry_len(&self, keys: &PoolKeys) -> Result<usize, StoreError> {
        let start = Instant::now();
        let result = self.inner.registry_len(keys).await;
        log_failure(&result, start);
        result
    }

    async fn snapshot(&self, keys: &PoolKeys) -> Result<PoolSnapshot, StoreError> {
        let start = Instant::now();
        let result = self.inner.snapshot(keys).await;
        log_failure(&result, start);
        result
    }

    async fn expired(&self, keys: &PoolKeys, now_ms: u64) -> Result<Vec<ResourceId>, StoreError> {
        let start = Instant::now();
        let result = self.inner.expired(keys, now_ms).await;
        tracing::trace!(now_ms, expired = ?result.as_ref().map(Vec::len).ok(), "scanned expiries");
        log_failure(&result, start);
        result
    }

    async fn delete(&self, keys: &PoolKeys) -> Result<(), StoreError> {
        let start = Instant::now();
        let result = self.inner.delete(keys).await;
        if result.is_ok() {
            tracing::warn!(pool = %keys.registry, "pool collections deleted");
        }
        log_failure(&result, start);
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
