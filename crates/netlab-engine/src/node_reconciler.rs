// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NodeReconciler (§4.8): enforcement of a node's desired state, run from
//! inside a JobRunner sync job rather than on its own timer. Drives a
//! terminal-but-mismatched `NodeState` toward its desired state one
//! enforcement action at a time, and promotes nodes stuck `pending` to
//! `error` rather than leaving them silently wedged.

use std::sync::Arc;
use std::time::Duration;

use netlab_adapters::RuntimeRouter;
use netlab_core::{
    Clock, JobId, LabId, NodeActualState, NodeCommand, NodeId, NodeStateMachine,
};
use netlab_storage::{Event, Repository};

use crate::error::EngineError;

pub const DEFAULT_MAX_ENFORCEMENT_ATTEMPTS: u32 = 3;
pub const DEFAULT_PENDING_STALE_THRESHOLD: Duration = Duration::from_secs(600);

/// What `reconcile_node` actually did, for the caller's job log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeReconcileOutcome {
    NoActionNeeded,
    PromotedStuckPendingToError,
    EnforcementSkippedAlreadyFailed,
    ActionIssued(NodeCommand),
    ActionFailed,
    EnforcementGaveUp,
}

pub struct NodeReconciler<C: Clock> {
    repository: Arc<Repository>,
    router: Arc<RuntimeRouter>,
    clock: C,
    max_enforcement_attempts: u32,
    pending_stale_threshold: Duration,
}

impl<C: Clock> NodeReconciler<C> {
    pub fn new(repository: Arc<Repository>, router: Arc<RuntimeRouter>, clock: C) -> Self {
        Self {
            repository,
            router,
            clock,
            max_enforcement_attempts: DEFAULT_MAX_ENFORCEMENT_ATTEMPTS,
            pending_stale_threshold: DEFAULT_PENDING_STALE_THRESHOLD,
        }
    }

    pub fn with_max_enforcement_attempts(mut self, max: u32) -> Self {
        self.max_enforcement_attempts = max;
        self
    }

    pub fn with_pending_stale_threshold(mut self, threshold: Duration) -> Self {
        self.pending_stale_threshold = threshold;
        self
    }

    /// One enforcement step for a single node, called from within a
    /// `sync:node:<id>` job. Never panics on a missing node; callers should
    /// treat a missing `NodeState` as the reconciler having nothing to do.
    pub async fn reconcile_node(&self, job_id: JobId, lab_id: LabId, node_id: NodeId) -> Result<NodeReconcileOutcome, EngineError> {
        let Some(state) = self.repository.get_node_state(lab_id, node_id) else {
            return Ok(NodeReconcileOutcome::NoActionNeeded);
        };

        if state.actual_state == NodeActualState::Pending
            && state.desired_state == netlab_core::NodeDesiredState::Running
        {
            let age_ms = self.clock.epoch_ms().saturating_sub(state.entered_state_at);
            if age_ms > self.pending_stale_threshold.as_millis() as u64 {
                self.repository
                    .apply(Event::NodeActualStateChanged {
                        lab_id,
                        node_id,
                        actual_state: NodeActualState::Error,
                        entered_state_at: self.clock.epoch_ms(),
                    })
                    .await?;
                self.repository
                    .apply(Event::NodeEnforcementFailed {
                        lab_id,
                        node_id,
                        failed_at: self.clock.epoch_ms(),
                        error_message: "stuck pending longer than the stale threshold".into(),
                    })
                    .await?;
                return Ok(NodeReconcileOutcome::PromotedStuckPendingToError);
            }
        }

        if state.enforcement_failed_at.is_some() {
            return Ok(NodeReconcileOutcome::EnforcementSkippedAlreadyFailed);
        }

        if !NodeStateMachine::needs_enforcement(state.actual_state, state.desired_state) {
            return Ok(NodeReconcileOutcome::NoActionNeeded);
        }
        let Some(command) = NodeStateMachine::get_enforcement_action(state.actual_state, state.desired_state) else {
            return Ok(NodeReconcileOutcome::NoActionNeeded);
        };

        let Some(host_id) = state.host_id else {
            return Err(EngineError::MissingPlacement);
        };
        let Some(node) = self.repository.get_node(&node_id) else {
            return Ok(NodeReconcileOutcome::NoActionNeeded);
        };
        let client = self.router.get(host_id)?;

        let op = match command {
            NodeCommand::Start => "start",
            NodeCommand::Stop => "stop",
        };
        let result = tokio::time::timeout(
            netlab_adapters::timeouts::NODE_ACTION,
            client.node_action(job_id, lab_id, &node.container_name, op),
        )
        .await;

        let attempts = state.enforcement_attempts + 1;
        self.repository.apply(Event::NodeEnforcementAttempted { lab_id, node_id, attempts }).await?;

        let succeeded = matches!(result, Ok(Ok(())));
        if succeeded {
            if let Some(next) = NodeStateMachine::get_transition_for_desired(state.actual_state, state.desired_state) {
                self.repository
                    .apply(Event::NodeActualStateChanged { lab_id, node_id, actual_state: next, entered_state_at: self.clock.epoch_ms() })
                    .await?;
            }
            return Ok(NodeReconcileOutcome::ActionIssued(command));
        }

        if attempts >= self.max_enforcement_attempts {
            let message = match result {
                Ok(Err(e)) => e.to_string(),
                Err(_) => "node action timed out".to_string(),
                Ok(Ok(())) => unreachable!(),
            };
            self.repository
                .apply(Event::NodeEnforcementFailed { lab_id, node_id, failed_at: self.clock.epoch_ms(), error_message: message })
                .await?;
            return Ok(NodeReconcileOutcome::EnforcementGaveUp);
        }

        Ok(NodeReconcileOutcome::ActionFailed)
    }
}
