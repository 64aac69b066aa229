// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lease coordinator for a named resource pool
//!
//! A coordinator is one process's view of a pool whose state lives in a
//! shared store. Any number of coordinators, in any number of processes,
//! may run against the same pool name; they interact only through the
//! store. Local state is limited to the stopped flag and the reaper task.

use crate::error::CoordinatorError;
use crate::pool::{PooledStore, StorePool};
use crate::reaper::{ReaperHandle, Tick};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::time::Instant;
use wl_adapters::TracedStore;
use wl_core::{
    resource_ids, Clock, Lease, LeaseStore, PoolKeys, ReleaseOutcome, ResourceId, Settings,
    StoreError, SyncPlan, SystemClock,
};
use wl_storage::FileStore;

/// Options for [`Coordinator::destroy`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DestroyOptions {
    /// Also stop this coordinator once the collections are gone
    pub with_stop: bool,
}

impl DestroyOptions {
    pub fn with_stop() -> Self {
        Self { with_stop: true }
    }
}

/// Snapshot of a pool returned by [`Coordinator::info`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PoolInfo {
    pub name: String,
    /// Registry members, sorted
    pub resources: Vec<ResourceId>,
    /// Available queue, head first
    pub available: Vec<ResourceId>,
    /// Busy queue, oldest checkout first
    pub busy: Vec<ResourceId>,
    /// Lease expiries, soonest first
    pub leases: Vec<Lease>,
    pub settings: Settings,
}

struct Inner<S, C> {
    name: String,
    instance_id: String,
    resources: Vec<ResourceId>,
    settings: Settings,
    keys: PoolKeys,
    pool: StorePool<S>,
    clock: C,
    stopped: AtomicBool,
    reaper: Mutex<Option<ReaperHandle>>,
}

/// Coordinates leases on one named pool
///
/// Cloning yields another handle to the same instance (same stopped flag,
/// same reaper), not a new instance.
pub struct Coordinator<S, C = SystemClock> {
    inner: Arc<Inner<S, C>>,
}

impl<S, C> Clone for Coordinator<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: LeaseStore> Coordinator<S, SystemClock> {
    /// Build a coordinator. Nothing touches the store until [`start`](Self::start).
    pub fn new<I, T>(
        name: impl Into<String>,
        resources: I,
        settings: Settings,
        store: S,
    ) -> Result<Self, CoordinatorError>
    where
        I: IntoIterator<Item = T>,
        T: Into<ResourceId>,
    {
        Self::with_clock(name, resources, settings, store, SystemClock)
    }
}

/// Coordinator over the durable file store named by `Settings::store_path`
pub type FileCoordinator = Coordinator<TracedStore<FileStore>>;

impl FileCoordinator {
    /// Open the file store at `settings.store_path` and build a coordinator on it
    pub fn open<I, T>(
        name: impl Into<String>,
        resources: I,
        settings: Settings,
    ) -> Result<Self, CoordinatorError>
    where
        I: IntoIterator<Item = T>,
        T: Into<ResourceId>,
    {
        settings.validate()?;
        let store = FileStore::open(&settings.store_path)?;
        Self::new(name, resources, settings, TracedStore::new(store))
    }
}

impl<S: LeaseStore, C: Clock> Coordinator<S, C> {
    /// Build a coordinator reading lease time from `clock`
    pub fn with_clock<I, T>(
        name: impl Into<String>,
        resources: I,
        settings: Settings,
        store: S,
        clock: C,
    ) -> Result<Self, CoordinatorError>
    where
        I: IntoIterator<Item = T>,
        T: Into<ResourceId>,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CoordinatorError::InvalidName(name));
        }
        settings.validate()?;

        let instance_id = uuid::Uuid::new_v4().to_string();
        let keys = PoolKeys::new(&settings.key_prefix, &name);
        let pool = StorePool::new(store, settings.max_connections);

        Ok(Self {
            inner: Arc::new(Inner {
                name,
                instance_id,
                resources: resource_ids(resources),
                settings,
                keys,
                pool,
                clock,
                stopped: AtomicBool::new(false),
                reaper: Mutex::new(None),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Unique id of this instance, for correlating logs across processes
    pub fn instance_id(&self) -> &str {
        &self.inner.instance_id
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn keys(&self) -> &PoolKeys {
        &self.inner.keys
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Whether a reaper loop is currently scheduled
    pub fn is_reaping(&self) -> bool {
        self.inner
            .reaper
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|reaper| !reaper.is_finished())
    }

    /// Borrow a store handle, failing once stopped
    async fn store(&self) -> Result<PooledStore<S>, CoordinatorError> {
        if self.is_stopped() {
            return Err(CoordinatorError::AlreadyStopped);
        }
        self.inner.pool.get().await
    }

    // === Lifecycle ===

    /// Seed the pool, or reconcile it if another instance already did, then
    /// schedule the reaper. Calling it again replaces the reaper.
    pub async fn start(&self) -> Result<&Self, CoordinatorError> {
        let inner = &self.inner;
        let seeded = {
            let store = self.store().await?;
            store.seed(&inner.keys, &inner.resources).await?
        };

        if seeded {
            tracing::info!(
                pool = %inner.name,
                instance = %inner.instance_id,
                count = inner.resources.len(),
                "pool seeded"
            );
        } else {
            tracing::info!(
                pool = %inner.name,
                instance = %inner.instance_id,
                "pool already initialized, reconciling"
            );
            self.sync(inner.resources.iter()).await?;
        }

        self.schedule_reaper().await;
        Ok(self)
    }

    async fn schedule_reaper(&self) {
        let weak = Arc::downgrade(&self.inner);
        let handle = ReaperHandle::spawn(self.inner.settings.interval_to_check_release, move || {
            reap_tick(weak.clone())
        });

        let previous = self
            .inner
            .reaper
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle);
        if let Some(previous) = previous {
            tracing::debug!(pool = %self.inner.name, "replacing reaper");
            previous.shutdown().await;
        }
    }

    /// Halt the reaper, drain store handles and refuse further operations.
    ///
    /// Shared collections are left intact for other instances.
    pub async fn stop(&self) -> Result<(), CoordinatorError> {
        let inner = &self.inner;
        let reaper = inner
            .reaper
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(reaper) = reaper {
            reaper.shutdown().await;
        }
        inner.pool.drain().await;
        if !inner.stopped.swap(true, Ordering::SeqCst) {
            tracing::info!(pool = %inner.name, instance = %inner.instance_id, "coordinator stopped");
        }
        Ok(())
    }

    /// Delete the pool's collections for every instance sharing the name
    pub async fn destroy(&self, options: DestroyOptions) -> Result<(), CoordinatorError> {
        {
            let store = self.store().await?;
            store.delete(&self.inner.keys).await?;
        }
        tracing::warn!(pool = %self.inner.name, instance = %self.inner.instance_id, "pool destroyed");

        if options.with_stop {
            self.stop().await?;
        }
        Ok(())
    }

    // === Leases ===

    /// Check out a resource, waiting up to `max_timeout_to_wait` for one
    ///
    /// The wait runs on a handle from the pool's wait budget, so parked
    /// acquires never hold up releases or other short operations.
    pub async fn acquire(&self) -> Result<ResourceId, CoordinatorError> {
        let inner = &self.inner;
        let wait = inner.settings.acquire_wait();
        let deadline = Instant::now().checked_add(wait);
        {
            let store = self.store().await?;
            if store.registry_len(&inner.keys).await? == 0 {
                return Err(CoordinatorError::NoResourcesRegistered(inner.name.clone()));
            }
        }

        let store = self.wait_store(deadline, wait).await?;
        let remaining = deadline.map_or(wait, |deadline| {
            deadline.saturating_duration_since(Instant::now())
        });
        let lease_ms =
            u64::try_from(inner.settings.max_timeout_to_release.as_millis()).unwrap_or(u64::MAX);
        let expires_at = || inner.clock.epoch_ms().saturating_add(lease_ms);
        let id = store
            .move_to_busy(&inner.keys, remaining, &expires_at)
            .await?
            .ok_or(CoordinatorError::AcquireTimedOut { waited: wait })?;

        tracing::debug!(pool = %inner.name, resource = %id, "acquired");
        Ok(id)
    }

    /// Borrow a wait handle, giving up at `deadline`
    async fn wait_store(
        &self,
        deadline: Option<Instant>,
        wait: Duration,
    ) -> Result<PooledStore<S>, CoordinatorError> {
        if self.is_stopped() {
            return Err(CoordinatorError::AlreadyStopped);
        }
        let lend = self.inner.pool.get_for_wait();
        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, lend)
                .await
                .map_err(|_| CoordinatorError::AcquireTimedOut { waited: wait })?,
            None => lend.await,
        }
    }

    /// Return a resource. Releasing an id that is not busy is a no-op.
    pub async fn release(
        &self,
        id: impl Into<ResourceId>,
    ) -> Result<ReleaseOutcome, CoordinatorError> {
        let id = id.into();
        if id.as_str().is_empty() {
            return Ok(ReleaseOutcome::NotBusy);
        }
        let store = self.store().await?;
        let keys = &self.inner.keys;
        let outcome = resubmitting(&id, || store.release(keys, &id)).await?;
        tracing::debug!(pool = %self.inner.name, resource = %id, ?outcome, "release");
        Ok(outcome)
    }

    /// Release every lease whose expiry has passed; returns the reclaimed ids
    ///
    /// Each release re-checks the expiry, so a lease renewed by a fresh
    /// checkout between the scan and the release is left alone.
    pub async fn release_expired(&self) -> Result<Vec<ResourceId>, CoordinatorError> {
        let inner = &self.inner;
        let store = self.store().await?;
        let now_ms = inner.clock.epoch_ms();
        let expired = store.expired(&inner.keys, now_ms).await?;

        let mut reclaimed = Vec::with_capacity(expired.len());
        for id in expired {
            let outcome = resubmitting(&id, || store.reclaim(&inner.keys, &id, now_ms)).await?;
            if outcome != ReleaseOutcome::NotBusy {
                tracing::info!(pool = %inner.name, resource = %id, ?outcome, "lease expired");
                reclaimed.push(id);
            }
        }
        Ok(reclaimed)
    }

    // === Membership ===

    /// Register resources; idle ones join the tail of the available queue
    pub async fn add<I, T>(&self, ids: I) -> Result<(), CoordinatorError>
    where
        I: IntoIterator<Item = T>,
        T: Into<ResourceId>,
    {
        let ids = resource_ids(ids);
        if ids.is_empty() {
            return Ok(());
        }
        let store = self.store().await?;
        store.add(&self.inner.keys, &ids).await?;
        Ok(())
    }

    /// Evict resources from every collection, even if currently leased
    pub async fn remove<I, T>(&self, ids: I) -> Result<(), CoordinatorError>
    where
        I: IntoIterator<Item = T>,
        T: Into<ResourceId>,
    {
        let ids = resource_ids(ids);
        if ids.is_empty() {
            return Ok(());
        }
        let store = self.store().await?;
        store.remove(&self.inner.keys, &ids).await?;
        Ok(())
    }

    /// Make the registry match `desired`, leaving ids outside the diff alone
    pub async fn sync<I, T>(&self, desired: I) -> Result<SyncPlan, CoordinatorError>
    where
        I: IntoIterator<Item = T>,
        T: Into<ResourceId>,
    {
        let desired = resource_ids(desired);
        let store = self.store().await?;
        let registry = store.registry(&self.inner.keys).await?;

        let plan = SyncPlan::between(&registry, &desired);
        if plan.is_empty() {
            tracing::debug!(pool = %self.inner.name, "registry already in sync");
            return Ok(plan);
        }
        store.apply_sync(&self.inner.keys, &plan).await?;
        tracing::info!(
            pool = %self.inner.name,
            removed = plan.to_remove.len(),
            added = plan.to_add.len(),
            "registry synced"
        );
        Ok(plan)
    }

    // === Introspection ===

    /// Read all collections at one point in time
    pub async fn info(&self) -> Result<PoolInfo, CoordinatorError> {
        let store = self.store().await?;
        let snapshot = store.snapshot(&self.inner.keys).await?;
        Ok(PoolInfo {
            name: self.inner.name.clone(),
            resources: snapshot.resources,
            available: snapshot.available,
            busy: snapshot.busy,
            leases: snapshot.leases,
            settings: self.inner.settings.clone(),
        })
    }
}

/// Run a release transition, resubmitting once if the store lost its cached
/// copy of the procedure
async fn resubmitting<F, Fut>(id: &ResourceId, transition: F) -> Result<ReleaseOutcome, StoreError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<ReleaseOutcome, StoreError>>,
{
    match transition().await {
        Err(StoreError::ScriptNotCached) => {
            tracing::debug!(resource = %id, "resubmitting release procedure");
            transition().await
        }
        result => result,
    }
}

/// One reaper pass. Failures are logged and retried next interval; the loop
/// ends once the coordinator is stopped or dropped.
async fn reap_tick<S: LeaseStore, C: Clock>(inner: Weak<Inner<S, C>>) -> Tick {
    let Some(inner) = inner.upgrade() else {
        return Tick::Stop;
    };
    let coordinator = Coordinator { inner };

    match coordinator.release_expired().await {
        Ok(_) => Tick::Continue,
        Err(CoordinatorError::AlreadyStopped) => Tick::Stop,
        Err(e) => {
            tracing::warn!(
                pool = %coordinator.inner.name,
                instance = %coordinator.inner.instance_id,
                error = %e,
                "reaper pass failed, retrying next interval"
            );
            Tick::Continue
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
