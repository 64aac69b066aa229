// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wl-core: core types for the wait-list resource lease coordinator
//!
//! This crate provides:
//! - Resource ids, the per-pool key namespace and pool settings
//! - The keyspace model with the lease transitions every store applies
//! - The `LeaseStore` trait implemented by store backends
//! - A clock abstraction for testable lease expiry

pub mod clock;
pub mod keys;
pub mod keyspace;
pub mod resource;
pub mod settings;
pub mod store;
pub mod sync;

pub use clock::{Clock, FakeClock, SystemClock};
pub use keys::PoolKeys;
pub use keyspace::Keyspace;
pub use resource::{resource_ids, ResourceId};
pub use settings::{Settings, SettingsError};
pub use store::{Lease, LeaseStore, PoolSnapshot, ReleaseOutcome, StoreError};
pub use sync::SyncPlan;
