//! Reaper specs
//!
//! Verify that abandoned leases come back on their own.

use crate::prelude::*;

on_every_backend!(
    abandoned_lease_is_reclaimed,
    on_demand_reclaim_skips_live_leases,
    reclaimed_resource_can_be_acquired_again,
);

fn reaping() -> Settings {
    settings()
        .with_max_timeout_to_release(Duration::from_millis(1000))
        .with_interval_to_check_release(Duration::from_millis(1000))
}

async fn abandoned_lease_is_reclaimed(backend: Backend) {
    let pool = backend.started("abandoned", &["x1"], reaping()).await;
    let id = pool.acquire().await.unwrap();

    tokio::time::sleep(Duration::from_millis(2200)).await;

    let info = pool.info().await.unwrap();
    assert_eq!(info.available, vec![id]);
    assert!(info.busy.is_empty());
    assert!(info.leases.is_empty());
}

async fn on_demand_reclaim_skips_live_leases(backend: Backend) {
    let pool = backend.pool("live", &["x1", "x2"]).await;
    pool.acquire().await.unwrap();

    assert!(pool.release_expired().await.unwrap().is_empty());
    assert_eq!(pool.info().await.unwrap().busy.len(), 1);
}

async fn reclaimed_resource_can_be_acquired_again(backend: Backend) {
    let settings = settings().with_max_timeout_to_release(Duration::from_millis(100));
    let pool = backend.started("again", &["x1"], settings).await;
    let id = pool.acquire().await.unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(pool.release_expired().await.unwrap(), vec![id.clone()]);
    assert_eq!(pool.acquire().await.unwrap(), id);

    let info = pool.info().await.unwrap();
    assert_eq!(info.busy, vec![id]);
}
