// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! netlabd: the controller process. Wires the event-sourced repository,
//! the agent router, and every background reconciler/job runner together,
//! then serves the two public surfaces (§6) — the WSGateway and the
//! carrier-state callback — until told to shut down.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod carrier_callback;
mod config;
mod supervisor;
mod ws_gateway;

use std::sync::Arc;

use netlab_adapters::{HttpAgentClient, RuntimeRouter};
use netlab_core::SystemClock;
use netlab_engine::{
    Broadcaster, CleanupBus, CleanupEvent, DefaultCleanupHandler, JobRunner, LinkManager,
    LinkReconciler, LinkReservations, LiveEdit, NodeReconciler,
};
use netlab_storage::Repository;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Always logs to stdout; additionally layers in a daily-rotated,
/// non-blocking file appender when `log_dir` is configured. Returns the
/// appender's flush guard, which must stay alive for the process
/// lifetime or buffered lines on the worker thread are lost on exit.
fn init_tracing(log_dir: Option<&std::path::Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = tracing_subscriber::fmt::layer();

    match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "netlabd.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false);
            tracing_subscriber::registry().with(env_filter()).with(stdout_layer).with(file_layer).init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(env_filter()).with(stdout_layer).init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = Config::load(None).unwrap_or_else(|e| {
        eprintln!("falling back to default config: {e}");
        Config::default()
    });
    let _log_guard = init_tracing(config.log_dir.as_deref());

    let repository = Arc::new(Repository::open(&config.wal_path, 0).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::Other, format!("failed to open wal at {:?}: {e}", config.wal_path))
    })?);
    let router = Arc::new(RuntimeRouter::new());
    for host in repository.all_hosts() {
        let client: Arc<dyn netlab_adapters::AgentClient> = Arc::new(HttpAgentClient::new(host.id, host.address.clone()));
        router.register(host.id, client);
    }

    let broadcaster = Broadcaster::new();
    let clock = SystemClock;

    let reservations = Arc::new(LinkReservations::new(repository.clone(), LinkReservations::default_normaliser()));
    let link_manager = Arc::new(LinkManager::new(repository.clone(), router.clone(), reservations.clone(), clock.clone()));
    let link_reconciler = Arc::new(LinkReconciler::new(repository.clone(), router.clone(), link_manager.clone()));
    let node_reconciler = Arc::new(NodeReconciler::new(repository.clone(), router.clone(), clock.clone()));

    let job_runner = Arc::new(JobRunner::new(
        repository.clone(),
        router.clone(),
        broadcaster.clone(),
        link_manager.clone(),
        link_reconciler.clone(),
        node_reconciler.clone(),
        reservations.clone(),
        clock.clone(),
    ));
    let live_edit = Arc::new(LiveEdit::new(repository.clone(), router.clone(), job_runner.clone(), clock.clone()));

    let cleanup_handler: Arc<dyn netlab_engine::CleanupHandler> =
        Arc::new(DefaultCleanupHandler::new(repository.clone(), router.clone()));
    let cleanup_bus = Arc::new(CleanupBus::new(vec![cleanup_handler]));

    let shutdown = CancellationToken::new();

    let mut tasks = Vec::new();

    {
        let router = router.clone();
        let repository = repository.clone();
        let cleanup_bus = cleanup_bus.clone();
        let interval = config.health_check_interval();
        let cancellation = shutdown.clone();
        tasks.push(tokio::spawn(supervisor::supervise("agent-health", shutdown.clone(), move || {
            let router = (*router).clone();
            let repository = repository.clone();
            let cleanup_bus = cleanup_bus.clone();
            let cancellation = cancellation.clone();
            async move {
                netlab_adapters::health::run_loop(router, interval, cancellation, move |host_id, result| {
                    let repository = repository.clone();
                    let cleanup_bus = cleanup_bus.clone();
                    async move {
                        if result.is_err() {
                            if let Some(host) = repository.get_host(&host_id) {
                                let _ = repository
                                    .apply(netlab_storage::Event::HostErrorSet {
                                        host_id,
                                        error_message: Some("health check failed".to_string()),
                                        error_since: Some(clock_epoch_ms()),
                                    })
                                    .await;
                                if host.status == netlab_core::HostStatus::Online {
                                    cleanup_bus.publish(CleanupEvent::AgentOffline { host_id });
                                }
                            }
                        }
                    }
                })
                .await
            }
        })));
    }

    {
        let repository = repository.clone();
        let link_reconciler = link_reconciler.clone();
        let reservations = reservations.clone();
        let interval = config.link_reconcile_interval();
        tasks.push(tokio::spawn(supervisor::supervise("link-reconciler", shutdown.clone(), move || {
            let repository = repository.clone();
            let link_reconciler = link_reconciler.clone();
            let reservations = reservations.clone();
            async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    ticker.tick().await;
                    for lab in repository.all_labs() {
                        if lab.declared_state == netlab_core::LabState::Stopped {
                            continue;
                        }
                        link_reconciler.reconcile_lab(lab.id).await;
                        let _ = reservations.reconcile(lab.id).await;
                    }
                }
            }
        })));
    }

    {
        let job_runner = job_runner.clone();
        let interval = config.job_health_monitor_interval();
        tasks.push(tokio::spawn(supervisor::supervise("job-health-monitor", shutdown.clone(), move || {
            let job_runner = job_runner.clone();
            let cancellation = CancellationToken::new();
            async move { job_runner.run_health_monitor(interval, cancellation).await }
        })));
    }

    {
        let repository = repository.clone();
        let broadcaster = broadcaster.clone();
        let router = router.clone();
        let listen_addr = config.ws_listen_addr.clone();
        tasks.push(tokio::spawn(supervisor::supervise("ws-gateway", shutdown.clone(), move || {
            let repository = repository.clone();
            let broadcaster = broadcaster.clone();
            let router = router.clone();
            let listen_addr = listen_addr.clone();
            let cancellation = shutdown.clone();
            async move {
                if let Err(e) = ws_gateway::run(&listen_addr, repository, broadcaster, router, cancellation).await {
                    tracing::error!(error = %e, "ws gateway stopped");
                }
            }
        })));
    }

    {
        let repository = repository.clone();
        let link_manager = link_manager.clone();
        let broadcaster = broadcaster.clone();
        let listen_addr = config.callback_listen_addr.clone();
        tasks.push(tokio::spawn(supervisor::supervise("carrier-callback", shutdown.clone(), move || {
            let repository = repository.clone();
            let link_manager = link_manager.clone();
            let broadcaster = broadcaster.clone();
            let listen_addr = listen_addr.clone();
            let cancellation = shutdown.clone();
            async move {
                if let Err(e) =
                    carrier_callback::run(&listen_addr, repository, link_manager, broadcaster, cancellation).await
                {
                    tracing::error!(error = %e, "carrier-state callback stopped");
                }
            }
        })));
    }

    let _ = live_edit;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    shutdown.cancel();
    for task in tasks {
        task.abort();
    }
    Ok(())
}

fn clock_epoch_ms() -> u64 {
    use netlab_core::Clock;
    SystemClock.epoch_ms()
}
