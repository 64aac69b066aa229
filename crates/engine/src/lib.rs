// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Wait-list lease coordinator
//!
//! A [`Coordinator`] lends out the resources of a named pool to callers in
//! any process that shares the same store, reclaiming leases that outlive
//! their timeout.

mod coordinator;
mod error;
mod pool;
mod reaper;

pub use coordinator::{Coordinator, DestroyOptions, FileCoordinator, PoolInfo};
pub use error::CoordinatorError;
pub use pool::{PooledStore, StorePool};
pub use reaper::{ReaperHandle, Tick};
