// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LiveEdit (§4.11): coalesces a burst of topology edits into one batched
//! flush per lab. Three edits arriving within the debounce window produce
//! one deploy pass, not three.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use netlab_core::{Clock, HostId, LabId, LabState, NodeActualState, NodeId};
use netlab_storage::{Event, Repository};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::EngineError;
use crate::job_runner::JobRunner;

pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

/// What the owning agent needs to tear a removed node down. Carried at
/// submission time since the node row itself is about to be deleted.
#[derive(Debug, Clone)]
pub struct RemovedNodeInfo {
    pub node_id: NodeId,
    pub container_name: String,
    pub host_id: Option<HostId>,
}

/// One accepted edit: either node ids to add back into the deployed set,
/// or nodes already removed from the declared topology that still need
/// tearing down.
#[derive(Debug, Clone, Default)]
pub struct LiveEditChange {
    pub added_node_ids: Vec<NodeId>,
    pub removed_nodes: Vec<RemovedNodeInfo>,
}

#[derive(Default)]
struct PendingBatch {
    added: Vec<NodeId>,
    removed: HashMap<NodeId, RemovedNodeInfo>,
}

impl PendingBatch {
    fn accumulate(&mut self, change: LiveEditChange) {
        for node_id in change.added_node_ids {
            if !self.added.contains(&node_id) {
                self.added.push(node_id);
            }
        }
        for removed in change.removed_nodes {
            self.added.retain(|id| *id != removed.node_id);
            self.removed.insert(removed.node_id, removed);
        }
    }

    fn drain(&mut self) -> (Vec<NodeId>, Vec<RemovedNodeInfo>) {
        (std::mem::take(&mut self.added), self.removed.drain().map(|(_, v)| v).collect())
    }
}

struct LabDebounce {
    batch: AsyncMutex<PendingBatch>,
    cancel: parking_lot::Mutex<CancellationToken>,
}

/// Accepts topology edits per lab, debounces them, and hands the drained
/// batch to a `sync:node:<id>` job per surviving add once the flush fires.
pub struct LiveEdit<C: Clock> {
    repository: Arc<Repository>,
    router: Arc<netlab_adapters::RuntimeRouter>,
    job_runner: Arc<JobRunner<C>>,
    clock: C,
    labs: parking_lot::Mutex<HashMap<LabId, Arc<LabDebounce>>>,
    debounce_delay: Duration,
}

impl<C: Clock + 'static> LiveEdit<C> {
    pub fn new(
        repository: Arc<Repository>,
        router: Arc<netlab_adapters::RuntimeRouter>,
        job_runner: Arc<JobRunner<C>>,
        clock: C,
    ) -> Self {
        Self {
            repository,
            router,
            job_runner,
            clock,
            labs: parking_lot::Mutex::new(HashMap::new()),
            debounce_delay: DEBOUNCE_DELAY,
        }
    }

    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    fn lab_debounce(&self, lab_id: LabId) -> Arc<LabDebounce> {
        self.labs
            .lock()
            .entry(lab_id)
            .or_insert_with(|| {
                Arc::new(LabDebounce {
                    batch: AsyncMutex::new(PendingBatch::default()),
                    cancel: parking_lot::Mutex::new(CancellationToken::new()),
                })
            })
            .clone()
    }

    /// Accumulates `change` into the lab's pending batch and (re)starts its
    /// debounce timer. Returns once the change has been recorded; the
    /// flush itself runs on a detached task.
    pub async fn submit_change(self: &Arc<Self>, lab_id: LabId, change: LiveEditChange)
    where
        C: Clone,
    {
        let debounce = self.lab_debounce(lab_id);
        debounce.batch.lock().await.accumulate(change);

        let previous = {
            let mut cancel = debounce.cancel.lock();
            let previous = cancel.clone();
            *cancel = CancellationToken::new();
            previous
        };
        previous.cancel();

        let this = self.clone();
        let fresh_token = debounce.cancel.lock().clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = fresh_token.cancelled() => {}
                _ = tokio::time::sleep(this.debounce_delay) => {
                    this.flush(lab_id).await;
                }
            }
        });
    }

    /// Drains the lab's accumulator and applies it: removes always
    /// process, adds only while the lab is `running` or `starting`.
    async fn flush(&self, lab_id: LabId) {
        let debounce = self.lab_debounce(lab_id);
        let (added, removed) = {
            let mut batch = debounce.batch.lock().await;
            batch.drain()
        };
        if added.is_empty() && removed.is_empty() {
            return;
        }

        for info in &removed {
            if let Err(e) = self.process_removal(lab_id, info).await {
                warn!(lab_id = %lab_id, node_id = %info.node_id, error = %e, "live-edit removal failed");
            }
        }

        let Some(lab) = self.repository.get_lab(&lab_id) else { return };
        if !matches!(lab.declared_state, LabState::Running | LabState::Starting) {
            return;
        }

        for node_id in added {
            if let Err(e) = self.process_addition(lab_id, node_id).await {
                warn!(lab_id = %lab_id, node_id = %node_id, error = %e, "live-edit addition failed");
            }
        }
    }

    async fn process_removal(&self, lab_id: LabId, info: &RemovedNodeInfo) -> Result<(), EngineError> {
        if let Some(host_id) = info.host_id {
            if let Ok(client) = self.router.get(host_id) {
                let _ = client.node_action(netlab_core::JobId::new(), lab_id, &info.container_name, "stop").await;
            }
        }
        self.repository
            .apply(Event::NodeActualStateChanged {
                lab_id,
                node_id: info.node_id,
                actual_state: NodeActualState::Undeployed,
                entered_state_at: self.clock.epoch_ms(),
            })
            .await?;
        self.repository.apply(Event::PlacementRemoved { lab_id, node_id: info.node_id }).await?;
        Ok(())
    }

    async fn process_addition(&self, lab_id: LabId, node_id: NodeId) -> Result<(), EngineError> {
        let Some(state) = self.repository.get_node_state(lab_id, node_id) else { return Ok(()) };
        if !matches!(state.actual_state, NodeActualState::Undeployed | NodeActualState::Stopped) {
            return Ok(());
        }
        self.repository
            .apply(Event::NodeActualStateChanged {
                lab_id,
                node_id,
                actual_state: NodeActualState::Pending,
                entered_state_at: self.clock.epoch_ms(),
            })
            .await?;
        self.job_runner
            .submit(lab_id, "live-edit", netlab_core::JobAction::SyncNode { node_id })
            .await?;
        Ok(())
    }
}
