//! Release specs
//!
//! Verify that release is idempotent and that removal wins over a late release.

use crate::prelude::*;

on_every_backend!(
    repeated_release_returns_resource_once,
    release_of_unknown_id_is_a_no_op,
    removal_wins_over_late_release,
    released_resource_goes_to_tail,
);

async fn repeated_release_returns_resource_once(backend: Backend) {
    let pool = backend.pool("idempotent", &["x1", "x2"]).await;
    let id = pool.acquire().await.unwrap();

    assert_eq!(
        pool.release(id.as_str()).await.unwrap(),
        ReleaseOutcome::Returned
    );
    for _ in 0..4 {
        assert_eq!(
            pool.release(id.as_str()).await.unwrap(),
            ReleaseOutcome::NotBusy
        );
    }

    let info = pool.info().await.unwrap();
    let copies = info.available.iter().filter(|a| **a == id).count();
    assert_eq!(copies, 1);
    assert!(info.busy.is_empty());
}

async fn release_of_unknown_id_is_a_no_op(backend: Backend) {
    let pool = backend.pool("stranger", &["x1"]).await;
    let before = pool.info().await.unwrap();

    assert_eq!(
        pool.release("x9").await.unwrap(),
        ReleaseOutcome::NotBusy
    );
    assert_eq!(pool.info().await.unwrap(), before);
}

async fn removal_wins_over_late_release(backend: Backend) {
    let pool = backend.pool("removal", &["x1", "x2"]).await;
    let id = pool.acquire().await.unwrap();

    pool.remove(&[id.as_str()]).await.unwrap();
    pool.release(id.as_str()).await.unwrap();

    let info = pool.info().await.unwrap();
    assert!(!info.available.contains(&id));
    assert!(!info.resources.contains(&id));
    assert!(!info.busy.contains(&id));
}

async fn released_resource_goes_to_tail(backend: Backend) {
    let pool = backend.pool("tail", &["x1", "x2", "x3"]).await;
    let id = pool.acquire().await.unwrap();
    pool.release(id.as_str()).await.unwrap();

    assert_eq!(
        pool.info().await.unwrap().available,
        ids(&["x2", "x3", "x1"])
    );
}
