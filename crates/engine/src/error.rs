// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the lease coordinator

use std::time::Duration;
use thiserror::Error;
use wl_core::{SettingsError, StoreError};

/// Errors returned by coordinator operations
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("the resource list is already stopped and inaccessible")]
    AlreadyStopped,
    #[error("no resources registered in pool {0}")]
    NoResourcesRegistered(String),
    #[error("timed out after {waited:?} waiting for a resource")]
    AcquireTimedOut { waited: Duration },
    #[error("invalid pool name: {0:?}")]
    InvalidName(String),
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
