// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent health-check loop (§4.2, §9 "restartable supervisors"):
//! periodically polls every registered agent's `/health` and reports the
//! outcome through a callback. This crate doesn't know about persistence
//! or the `offline` status transition — `netlab-engine` owns turning a
//! health result into a `Host` state change; this just drives the poll.

use std::future::Future;
use std::time::Duration;

use crate::client::AgentResult;
use crate::router::RuntimeRouter;
use netlab_core::HostId;
use netlab_wire::HealthResponse;

/// Runs one health-check pass across every agent the router knows about,
/// invoking `on_result` for each. Agents that return `NoRoute` between
/// listing and dispatch (deregistered mid-pass) are skipped silently.
pub async fn poll_once<F, Fut>(router: &RuntimeRouter, on_result: F)
where
    F: Fn(HostId, AgentResult<HealthResponse>) -> Fut,
    Fut: Future<Output = ()>,
{
    for host_id in router.registered_hosts() {
        let Ok(client) = router.get(host_id) else { continue };
        let result = client.health().await;
        on_result(host_id, result).await;
    }
}

/// Runs `poll_once` on a fixed interval until `cancellation` fires. The
/// caller wraps this in a restart supervisor (§9); a single pass
/// panicking or a callback future dropping does not retry within this
/// function — that's the supervisor's job.
pub async fn run_loop<F, Fut>(
    router: RuntimeRouter,
    interval: Duration,
    cancellation: tokio_util::sync::CancellationToken,
    on_result: F,
) where
    F: Fn(HostId, AgentResult<HealthResponse>) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = cancellation.cancelled() => return,
            _ = ticker.tick() => poll_once(&router, &on_result).await,
        }
    }
}
