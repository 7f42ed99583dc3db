// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cleanup (§4.12): an event bus that fans a small set of lifecycle
//! events out to handlers. Handlers are isolated from each other (one
//! panicking or erroring never stops the rest), retried once on a
//! transient failure, then logged and dropped.

use std::sync::Arc;

use async_trait::async_trait;
use netlab_core::{HasCategory, HostId, JobId, LabId, NodeId};
use netlab_storage::{Event, Repository};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::EngineError;

#[derive(Debug, Clone)]
pub enum CleanupEvent {
    LabDeleted { lab_id: LabId, workspace_path: String },
    NodeRemoved { lab_id: LabId, node_id: NodeId },
    AgentOffline { host_id: HostId },
    DeployFinished { lab_id: LabId },
    DestroyFinished { lab_id: LabId },
    JobCompleted { job_id: JobId },
}

impl CleanupEvent {
    fn kind(&self) -> &'static str {
        match self {
            CleanupEvent::LabDeleted { .. } => "lab_deleted",
            CleanupEvent::NodeRemoved { .. } => "node_removed",
            CleanupEvent::AgentOffline { .. } => "agent_offline",
            CleanupEvent::DeployFinished { .. } => "deploy_finished",
            CleanupEvent::DestroyFinished { .. } => "destroy_finished",
            CleanupEvent::JobCompleted { .. } => "job_completed",
        }
    }
}

/// A single cleanup action. Implementations must be idempotent: the bus
/// makes no effort to deduplicate events, and a retried handler call sees
/// the same event again.
#[async_trait]
pub trait CleanupHandler: Send + Sync {
    async fn handle(&self, event: &CleanupEvent) -> Result<(), EngineError>;
}

/// The built-in dispatch table (§4.12's "typical dispatch"). Every branch
/// is a no-op for events it doesn't own, so several of these can sit in
/// the same bus without coordinating.
pub struct DefaultCleanupHandler {
    repository: Arc<Repository>,
    router: Arc<netlab_adapters::RuntimeRouter>,
}

impl DefaultCleanupHandler {
    pub fn new(repository: Arc<Repository>, router: Arc<netlab_adapters::RuntimeRouter>) -> Self {
        Self { repository, router }
    }

    async fn on_lab_deleted(&self, lab_id: LabId, workspace_path: &str) -> Result<(), EngineError> {
        // The workspace directory holds both the checked-out topology and
        // its config-snapshot files; removing it purges both in one step.
        if let Err(e) = tokio::fs::remove_dir_all(workspace_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(EngineError::OverlayAttachFailed(format!("workspace cleanup for {lab_id}: {e}")));
            }
        }
        for placement in self.repository.placements_for_lab(lab_id) {
            self.repository.apply(Event::PlacementRemoved { lab_id, node_id: placement.node_id }).await?;
        }
        for host in self.repository.all_hosts() {
            if !host.is_online() {
                continue;
            }
            if let Ok(client) = self.router.get(host.id) {
                let _ = client.reconcile_vxlan_ports(&[], true).await;
            }
        }
        Ok(())
    }

    async fn on_node_removed(&self, lab_id: LabId, node_id: NodeId) -> Result<(), EngineError> {
        if self.repository.get_placement(lab_id, node_id).is_some() {
            self.repository.apply(Event::PlacementRemoved { lab_id, node_id }).await?;
        }
        Ok(())
    }

    async fn on_agent_offline(&self, host_id: HostId) -> Result<(), EngineError> {
        if let Some(host) = self.repository.get_host(&host_id) {
            if host.status != netlab_core::HostStatus::Offline {
                self.repository.apply(Event::HostStatusChanged { host_id, status: netlab_core::HostStatus::Offline }).await?;
            }
        }
        Ok(())
    }

    async fn on_destroy_finished(&self, lab_id: LabId) -> Result<(), EngineError> {
        let live_node_ids: std::collections::HashSet<NodeId> =
            self.repository.nodes_for_lab(lab_id).into_iter().map(|n| n.id).collect();
        for placement in self.repository.placements_for_lab(lab_id) {
            if !live_node_ids.contains(&placement.node_id) {
                self.repository.apply(Event::PlacementRemoved { lab_id, node_id: placement.node_id }).await?;
            }
        }
        let valid_port_names: Vec<String> = self
            .repository
            .all_vxlan_tunnels()
            .into_iter()
            .filter(|t| t.lab_id == lab_id)
            .map(|t| t.port_name)
            .collect();
        for host_id in self.repository.placements_for_lab(lab_id).into_iter().map(|p| p.host_id) {
            if let Ok(client) = self.router.get(host_id) {
                let _ = client.reconcile_vxlan_ports(&valid_port_names, true).await;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CleanupHandler for DefaultCleanupHandler {
    async fn handle(&self, event: &CleanupEvent) -> Result<(), EngineError> {
        match event {
            CleanupEvent::LabDeleted { lab_id, workspace_path } => self.on_lab_deleted(*lab_id, workspace_path).await,
            CleanupEvent::NodeRemoved { lab_id, node_id } => self.on_node_removed(*lab_id, *node_id).await,
            CleanupEvent::AgentOffline { host_id } => self.on_agent_offline(*host_id).await,
            CleanupEvent::DestroyFinished { lab_id } => self.on_destroy_finished(*lab_id).await,
            // No cleanup owns these yet; they exist on the bus for future
            // handlers (e.g. metrics) to subscribe to.
            CleanupEvent::DeployFinished { .. } | CleanupEvent::JobCompleted { .. } => Ok(()),
        }
    }
}

/// Fans published events out to every registered handler. Each handler
/// runs on its own task so one slow or failing handler never blocks the
/// others; a transient failure gets exactly one retry before the bus
/// gives up and logs it.
pub struct CleanupBus {
    tx: mpsc::UnboundedSender<CleanupEvent>,
}

impl CleanupBus {
    pub fn new(handlers: Vec<Arc<dyn CleanupHandler>>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<CleanupEvent>();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                for handler in handlers.clone() {
                    let event = event.clone();
                    tokio::spawn(async move {
                        dispatch_with_retry(handler, event).await;
                    });
                }
            }
        });
        Self { tx }
    }

    /// Enqueues `event` for every registered handler. Never blocks and
    /// never fails the caller — a full queue only happens if the process
    /// is shutting down, at which point dropped events are moot.
    pub fn publish(&self, event: CleanupEvent) {
        let _ = self.tx.send(event);
    }
}

async fn dispatch_with_retry(handler: Arc<dyn CleanupHandler>, event: CleanupEvent) {
    match handler.handle(&event).await {
        Ok(()) => return,
        Err(e) if e.category().is_retriable() => {
            if let Err(e) = handler.handle(&event).await {
                warn!(event = event.kind(), error = %e, "cleanup handler failed after retry, dropping");
            }
        }
        Err(e) => {
            warn!(event = event.kind(), error = %e, "cleanup handler failed, not retriable");
        }
    }
}
