// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded lending of store handles
//!
//! Every store interaction borrows a handle for its duration and returns it
//! when the guard drops. Short operations and blocking waits draw from
//! separate budgets, so parked waiters never starve the release that would
//! wake them. Draining waits for all lent handles, then closes the pool for
//! good.

use crate::error::CoordinatorError;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Pool of store handles limited to `size` short operations plus `size`
/// blocking waits at once
pub struct StorePool<S> {
    store: S,
    permits: Arc<Semaphore>,
    waits: Arc<Semaphore>,
    size: u32,
}

/// A store handle on loan from a [`StorePool`]
pub struct PooledStore<S> {
    store: S,
    _permit: OwnedSemaphorePermit,
}

impl<S> Deref for PooledStore<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.store
    }
}

impl<S: Clone> StorePool<S> {
    pub fn new(store: S, size: u32) -> Self {
        Self {
            store,
            permits: Arc::new(Semaphore::new(size as usize)),
            waits: Arc::new(Semaphore::new(size as usize)),
            size,
        }
    }

    /// Borrow a handle for a short operation
    pub async fn get(&self) -> Result<PooledStore<S>, CoordinatorError> {
        self.lend(&self.permits).await
    }

    /// Borrow a handle dedicated to one blocking wait
    pub async fn get_for_wait(&self) -> Result<PooledStore<S>, CoordinatorError> {
        self.lend(&self.waits).await
    }

    async fn lend(&self, budget: &Arc<Semaphore>) -> Result<PooledStore<S>, CoordinatorError> {
        let permit = budget
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| CoordinatorError::AlreadyStopped)?;
        Ok(PooledStore {
            store: self.store.clone(),
            _permit: permit,
        })
    }

    /// Wait for every lent handle to come back, then close the pool
    pub async fn drain(&self) {
        // Each fails only if another drain already closed that budget
        for budget in [&self.waits, &self.permits] {
            if let Ok(all) = budget.acquire_many(self.size).await {
                budget.close();
                drop(all);
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed() && self.waits.is_closed()
    }

    /// Short-operation handles not currently lent out
    pub fn idle(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait handles not currently lent out
    pub fn idle_waits(&self) -> usize {
        self.waits.available_permits()
    }
}
