// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic background task reclaiming expired leases
//!
//! The loop sleeps for one interval, runs one tick, and repeats until the
//! tick asks it to stop or its handle cancels it. Cancellation is checked
//! after every sleep, so a tick never starts once shutdown has begun.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What the loop does after a tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Stop,
}

/// Handle to a running reaper loop
#[derive(Debug)]
pub struct ReaperHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Spawn a loop calling `tick` every `interval`
    pub fn spawn<F, Fut>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Tick> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let done = cancel.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = done.cancelled() => break,
                    () = tokio::time::sleep(interval) => {}
                }
                if done.is_cancelled() {
                    break;
                }
                if tick().await == Tick::Stop {
                    tracing::debug!("reaper loop stopped by tick");
                    break;
                }
            }
        });

        Self { cancel, task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the loop and wait for an in-flight tick to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "reaper task ended abnormally");
        }
    }
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;
