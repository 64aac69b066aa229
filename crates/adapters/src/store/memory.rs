// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared in-memory store
//!
//! Clones share one keyspace, so coordinators built on clones of the same
//! `MemoryStore` see one pool exactly as separate processes would see a
//! shared store.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use wl_core::{
    Keyspace, LeaseStore, PoolKeys, PoolSnapshot, ReleaseOutcome, ResourceId, StoreError, SyncPlan,
};

#[derive(Default)]
struct Shared {
    keyspace: Mutex<Keyspace>,
    /// Signalled whenever an id may have become available
    freed: Notify,
}

/// In-process store backed by a mutex-guarded keyspace
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the whole keyspace
    pub fn keyspace(&self) -> Keyspace {
        self.shared
            .keyspace
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn with_keyspace<T>(&self, f: impl FnOnce(&mut Keyspace) -> T) -> T {
        let mut keyspace = self
            .shared
            .keyspace
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        f(&mut keyspace)
    }

    fn wake_waiters(&self) {
        self.shared.freed.notify_waiters();
    }
}

#[async_trait]
impl LeaseStore for MemoryStore {
    async fn seed(&self, keys: &PoolKeys, ids: &[ResourceId]) -> Result<bool, StoreError> {
        let seeded = self.with_keyspace(|ks| ks.seed(keys, ids));
        if seeded {
            self.wake_waiters();
        }
        Ok(seeded)
    }

    async fn move_to_busy(
        &self,
        keys: &PoolKeys,
        wait: Duration,
        expires_at: &(dyn Fn() -> u64 + Send + Sync),
    ) -> Result<Option<ResourceId>, StoreError> {
        // No deadline when the wait runs past the end of time
        let deadline = tokio::time::Instant::now().checked_add(wait);
        loop {
            // Register interest before looking so a release between the
            // check and the wait still wakes us
            let notified = self.shared.freed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(id) = self.with_keyspace(|ks| ks.move_to_busy(keys, expires_at())) {
                return Ok(Some(id));
            }
            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return Ok(None);
                    }
                }
                None => notified.await,
            }
        }
    }


    async fn release(
        &self,
        keys: &PoolKeys,
        id: &ResourceId,
    ) -> Result<ReleaseOutcome, StoreError> {
        let outcome = self.with_keyspace(|ks| ks.release(keys, id));
        if outcome == ReleaseOutcome::Returned {
            self.wake_waiters();
        }
        Ok(outcome)
    }

    async fn reclaim(
        &self,
        keys: &PoolKeys,
        id: &ResourceId,
        now_ms: u64,
    ) -> Result<ReleaseOutcome, StoreError> {
        let outcome = self.with_keyspace(|ks| ks.reclaim(keys, id, now_ms));
        if outcome == ReleaseOutcome::Returned {
            self.wake_waiters();
        }
        Ok(outcome)
    }

    async fn add(&self, keys: &PoolKeys, ids: &[ResourceId]) -> Result<(), StoreError> {
        self.with_keyspace(|ks| ks.add(keys, ids));
        self.wake_waiters();
        Ok(())
    }

    async fn remove(&self, keys: &PoolKeys, ids: &[ResourceId]) -> Result<(), StoreError> {
        self.with_keyspace(|ks| ks.remove(keys, ids));
        Ok(())
    }

    async fn apply_sync(&self, keys: &PoolKeys, plan: &SyncPlan) -> Result<(), StoreError> {
        self.with_keyspace(|ks| ks.apply_sync(keys, plan));
        if !plan.to_add.is_empty() {
            self.wake_waiters();
        }
        Ok(())
    }

    async fn registry(&self, keys: &PoolKeys) -> Result<Vec<ResourceId>, StoreError> {
        Ok(self.with_keyspace(|ks| ks.registry(keys)))
    }

    async fn registry_len(&self, keys: &PoolKeys) -> Result<usize, StoreError> {
        Ok(self.with_keyspace(|ks| ks.registry_len(keys)))
    }

    async fn snapshot(&self, keys: &PoolKeys) -> Result<PoolSnapshot, StoreError> {
        Ok(self.with_keyspace(|ks| ks.snapshot(keys)))
    }

    async fn expired(&self, keys: &PoolKeys, now_ms: u64) -> Result<Vec<ResourceId>, StoreError> {
        Ok(self.with_keyspace(|ks| ks.expired(keys, now_ms)))
    }

    async fn delete(&self, keys: &PoolKeys) -> Result<(), StoreError> {
        self.with_keyspace(|ks| ks.delete(keys));
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
