//! Acquire specs
//!
//! Verify checkout order, blocking waits, the empty-pool failure and
//! cancelled checkouts.

use crate::prelude::*;

on_every_backend!(
    single_resource_is_returned_immediately,
    second_acquire_waits_for_release,
    acquire_gives_up_after_wait_bound,
    empty_registry_fails_without_blocking,
    resources_are_handed_out_in_queue_order,
    concurrent_callers_never_share_a_resource,
    waiters_beyond_connection_limit_do_not_block_release,
    abandoned_acquire_never_leaves_an_unleased_checkout,
);

async fn single_resource_is_returned_immediately(backend: Backend) {
    let pool = backend.pool("single", &["x1"]).await;

    let started = Instant::now();
    assert_eq!(pool.acquire().await.unwrap(), ResourceId::new("x1"));
    assert!(started.elapsed() < Duration::from_millis(500));

    let info = pool.info().await.unwrap();
    assert_eq!(info.busy, ids(&["x1"]));
    assert!(info.available.is_empty());
}

async fn second_acquire_waits_for_release(backend: Backend) {
    let pool = backend.pool("handoff", &["x1"]).await;
    let held = pool.acquire().await.unwrap();

    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire().await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!waiter.is_finished());

    pool.release(held.as_str()).await.unwrap();
    assert_eq!(waiter.await.unwrap().unwrap(), held);
}

async fn acquire_gives_up_after_wait_bound(backend: Backend) {
    let pool = backend.pool("exhausted", &["x1"]).await;
    pool.acquire().await.unwrap();

    let started = Instant::now();
    let result = pool.acquire().await;
    assert!(matches!(result, Err(CoordinatorError::AcquireTimedOut { .. })));
    assert!(started.elapsed() >= Duration::from_millis(900));

    // The failed call left nothing checked out on its behalf
    let info = pool.info().await.unwrap();
    assert_eq!(info.busy, ids(&["x1"]));
}

async fn empty_registry_fails_without_blocking(backend: Backend) {
    let pool = backend.pool("nothing", &[]).await;

    let started = Instant::now();
    let result = pool.acquire().await;
    assert!(matches!(
        result,
        Err(CoordinatorError::NoResourcesRegistered(_))
    ));
    assert!(started.elapsed() < Duration::from_millis(500));
}

async fn resources_are_handed_out_in_queue_order(backend: Backend) {
    let pool = backend.pool("order", &["x1", "x2", "x3"]).await;

    let mut handed = Vec::new();
    for _ in 0..3 {
        handed.push(pool.acquire().await.unwrap());
    }
    assert_eq!(handed, ids(&["x1", "x2", "x3"]));
}

async fn concurrent_callers_never_share_a_resource(backend: Backend) {
    let first = backend.pool("crowd", &["x1", "x2", "x3"]).await;
    let second = backend.pool("crowd", &["x1", "x2", "x3"]).await;

    let mut tasks = Vec::new();
    for pool in [&first, &second, &first, &second, &first, &second] {
        let pool = pool.clone();
        tasks.push(tokio::spawn(async move { pool.acquire().await }));
    }

    let mut granted = Vec::new();
    let mut timed_out = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(id) => granted.push(id),
            Err(CoordinatorError::AcquireTimedOut { .. }) => timed_out += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    granted.sort();
    assert_eq!(granted, ids(&["x1", "x2", "x3"]));
    assert_eq!(timed_out, 3);
}

async fn waiters_beyond_connection_limit_do_not_block_release(backend: Backend) {
    let settings = settings()
        .with_max_timeout_to_wait(Duration::from_secs(2))
        .with_max_connections(2);
    let pool = backend.started("limited", &["x1"], settings).await;
    let held = pool.acquire().await.unwrap();

    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    pool.release(held.as_str()).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(500));

    let mut granted = Vec::new();
    for waiter in waiters {
        match waiter.await.unwrap() {
            Ok(id) => granted.push(id),
            Err(CoordinatorError::AcquireTimedOut { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(granted, vec![held]);
}

async fn abandoned_acquire_never_leaves_an_unleased_checkout(backend: Backend) {
    let pool = backend.pool("abandon", &["x1", "x2", "x3"]).await;

    for _ in 0..3 {
        let _ = tokio::time::timeout(Duration::from_millis(1), pool.acquire()).await;
    }

    let info = pool.info().await.unwrap();
    let mut leased: Vec<_> = info.leases.into_iter().map(|l| l.resource).collect();
    let mut busy = info.busy;
    leased.sort();
    busy.sort();
    assert_eq!(busy, leased);
}
