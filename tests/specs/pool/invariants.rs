//! Pool invariant specs
//!
//! Interleave membership changes and leases from several instances and
//! check the collections stay consistent after every step.

use crate::prelude::*;
use std::collections::BTreeSet;

on_every_backend!(interleaved_operations_keep_collections_consistent);

fn assert_consistent(info: &PoolInfo) {
    let registry: BTreeSet<_> = info.resources.iter().collect();
    let available: BTreeSet<_> = info.available.iter().collect();
    let busy: BTreeSet<_> = info.busy.iter().collect();

    assert_eq!(available.len(), info.available.len(), "duplicate in available");
    assert_eq!(busy.len(), info.busy.len(), "duplicate in busy");
    assert!(available.is_disjoint(&busy), "{info:?}");
    assert!(available.is_subset(&registry), "{info:?}");
    assert!(busy.is_subset(&registry), "{info:?}");
    for lease in &info.leases {
        assert!(busy.contains(&lease.resource), "{info:?}");
    }
}

async fn interleaved_operations_keep_collections_consistent(backend: Backend) {
    let names = ["x1", "x2", "x3", "x4", "x5"];
    let first = backend.pool("mixed", &names[..3]).await;
    let second = backend.pool("mixed", &names[..3]).await;
    let instances = [first, second];

    let mut held: Vec<ResourceId> = Vec::new();
    for step in 0..40usize {
        let pool = &instances[step % 2];
        let name = names[step % names.len()];
        match step % 5 {
            0 | 3 => {
                let info = pool.info().await.unwrap();
                if !info.available.is_empty() {
                    held.push(pool.acquire().await.unwrap());
                }
            }
            1 => {
                if let Some(id) = held.pop() {
                    pool.release(id.as_str()).await.unwrap();
                }
            }
            2 => pool.add(&[name]).await.unwrap(),
            _ => pool.remove(&[name]).await.unwrap(),
        }
        assert_consistent(&pool.info().await.unwrap());
    }

    for id in held {
        instances[0].release(id.as_str()).await.unwrap();
    }
    let info = instances[1].info().await.unwrap();
    assert_consistent(&info);
    assert!(info.busy.is_empty());
}
