// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key namespace for a named pool
//!
//! Every pool owns four collections in the shared store, all under
//! `{prefix}:{name}:`.

use serde::{Deserialize, Serialize};

/// The four store keys belonging to one named pool
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolKeys {
    /// Set of every resource id known to the pool
    pub registry: String,
    /// FIFO of ids free for acquisition
    pub available: String,
    /// List of ids currently leased
    pub busy: String,
    /// Busy id -> lease expiry (epoch ms)
    pub busy_index: String,
}

impl PoolKeys {
    pub fn new(prefix: &str, name: &str) -> Self {
        let base = format!("{}:{}", prefix, name);
        Self {
            registry: format!("{}:resource-set", base),
            available: format!("{}:available-list", base),
            busy: format!("{}:busy-list", base),
            busy_index: format!("{}:busy-set", base),
        }
    }

    /// All four keys, for bulk deletion
    pub fn all(&self) -> [&str; 4] {
        [
            &self.registry,
            &self.available,
            &self.busy,
            &self.busy_index,
        ]
    }
}
