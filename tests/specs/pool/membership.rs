//! Membership specs
//!
//! Verify add, remove and sync against a live pool.

use crate::prelude::*;

on_every_backend!(
    added_resources_become_available,
    removed_resources_disappear,
    sync_adds_missing_resources,
    sync_swaps_idle_resource,
    sync_keeps_lease_on_surviving_resource,
);

async fn added_resources_become_available(backend: Backend) {
    let pool = backend.pool("grow", &["x1"]).await;
    pool.add(&["x2", "x3"]).await.unwrap();

    let info = pool.info().await.unwrap();
    assert_eq!(info.resources, ids(&["x1", "x2", "x3"]));
    assert_eq!(info.available, ids(&["x1", "x2", "x3"]));
}

async fn removed_resources_disappear(backend: Backend) {
    let pool = backend.pool("shrink", &["x1", "x2", "x3"]).await;
    pool.remove(&["x2"]).await.unwrap();

    let info = pool.info().await.unwrap();
    assert_eq!(info.resources, ids(&["x1", "x3"]));
    assert_eq!(info.available, ids(&["x1", "x3"]));
}

async fn sync_adds_missing_resources(backend: Backend) {
    let pool = backend.pool("sync-add", &["x1"]).await;
    pool.sync(&["x1", "x2"]).await.unwrap();

    let info = pool.info().await.unwrap();
    assert_eq!(info.resources, ids(&["x1", "x2"]));
    assert_eq!(info.available, ids(&["x1", "x2"]));
}

async fn sync_swaps_idle_resource(backend: Backend) {
    let pool = backend.pool("sync-swap", &["x1"]).await;
    pool.sync(&["x2"]).await.unwrap();

    let info = pool.info().await.unwrap();
    assert_eq!(info.resources, ids(&["x2"]));
    assert_eq!(info.available, ids(&["x2"]));
}

async fn sync_keeps_lease_on_surviving_resource(backend: Backend) {
    let pool = backend.pool("sync-lease", &["x1", "x2"]).await;
    let id = pool.acquire().await.unwrap();

    pool.sync(&["x1", "x3"]).await.unwrap();

    let info = pool.info().await.unwrap();
    assert_eq!(info.resources, ids(&["x1", "x3"]));
    assert_eq!(info.busy, vec![id.clone()]);
    assert_eq!(info.available, ids(&["x3"]));

    assert_eq!(
        pool.release(id.as_str()).await.unwrap(),
        ReleaseOutcome::Returned
    );
}
