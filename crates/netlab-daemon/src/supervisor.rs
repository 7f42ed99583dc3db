// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The restartable-supervisor pattern §9 calls for: every long-running
//! background loop (health checks, link reconciliation, the WS gateway
//! listener) is wrapped so that a panic or an unexpected early return
//! gets the loop restarted with backoff instead of silently killing it.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

const INITIAL_BACKOFF: Duration = Duration::from_millis(200);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Runs `make_task()` repeatedly until `cancellation` fires. Each
/// invocation should run until cancelled itself; if it returns early
/// (crash, unhandled error, panic caught via `JoinHandle`), it's
/// restarted after a backoff that grows on consecutive failures and
/// resets once a run has stayed up for a while.
pub async fn supervise<F, Fut>(name: &'static str, cancellation: CancellationToken, mut make_task: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut backoff = INITIAL_BACKOFF;
    loop {
        if cancellation.is_cancelled() {
            return;
        }
        let started_at = std::time::Instant::now();
        let handle = tokio::spawn(make_task());
        match handle.await {
            Ok(()) if cancellation.is_cancelled() => return,
            Ok(()) => {
                warn!(task = name, "supervised task exited early, restarting");
            }
            Err(join_error) => {
                error!(task = name, error = %join_error, "supervised task panicked, restarting");
            }
        }

        if started_at.elapsed() > MAX_BACKOFF {
            backoff = INITIAL_BACKOFF;
        }
        tokio::select! {
            _ = cancellation.cancelled() => return,
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}
