// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciliation of a registry against a desired resource list

use crate::resource::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Ids to evict and ids to register so the registry matches a desired list
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPlan {
    pub to_remove: Vec<ResourceId>,
    pub to_add: Vec<ResourceId>,
}

impl SyncPlan {
    /// Diff the current registry against the desired ids.
    ///
    /// `to_remove` is sorted; `to_add` keeps the desired order with
    /// duplicates dropped.
    pub fn between(registry: &[ResourceId], desired: &[ResourceId]) -> Self {
        let current: BTreeSet<&ResourceId> = registry.iter().collect();
        let wanted: BTreeSet<&ResourceId> = desired.iter().collect();

        let to_remove = current
            .difference(&wanted)
            .map(|id| (*id).clone())
            .collect();

        let mut seen = BTreeSet::new();
        let to_add = desired
            .iter()
            .filter(|id| !current.contains(id) && seen.insert(*id))
            .cloned()
            .collect();

        Self { to_remove, to_add }
    }

    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }
}
