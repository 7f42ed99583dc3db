// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node declarations and the observed/declared NodeState pair.

use crate::clock::Clock;
use crate::ids::{HostId, LabId, NodeId};
use serde::{Deserialize, Serialize};

crate::simple_display! {
    NodeDesiredState {
        Running => "running",
        Stopped => "stopped",
    }
}

/// The user's intent for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeDesiredState {
    Running,
    Stopped,
}

crate::simple_display! {
    NodeActualState {
        Undeployed => "undeployed",
        Pending => "pending",
        Starting => "starting",
        Running => "running",
        Stopping => "stopping",
        Stopped => "stopped",
        Exited => "exited",
        Error => "error",
    }
}

/// Observed container state, following the eight-state lifecycle in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeActualState {
    Undeployed,
    Pending,
    Starting,
    Running,
    Stopping,
    Stopped,
    Exited,
    Error,
}

/// Device kind for a Node declaration. Open-ended at the wire boundary but
/// the control plane only branches on a handful of kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum NodeKind {
    Linux,
    Router { vendor: String },
    Switch,
    Other { label: String },
}

/// A logical device declaration within a lab.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub lab_id: LabId,
    pub display_name: String,
    pub container_name: String,
    pub kind: NodeKind,
    pub image_ref: String,
}

/// The observed/declared pair for one node, keyed by (lab, node).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeState {
    pub lab_id: LabId,
    pub node_id: NodeId,
    pub desired_state: NodeDesiredState,
    pub actual_state: NodeActualState,
    pub is_ready: bool,
    pub enforcement_attempts: u32,
    pub enforcement_failed_at: Option<u64>,
    pub host_id: Option<HostId>,
    pub error_message: Option<String>,
    pub image_sync_status: Option<String>,
    pub image_sync_message: Option<String>,
    /// epoch-ms timestamp of the last `actual_state` transition.
    pub entered_state_at: u64,
}

impl NodeState {
    pub fn new(lab_id: LabId, node_id: NodeId, clock: &impl Clock) -> Self {
        Self {
            lab_id,
            node_id,
            desired_state: NodeDesiredState::Stopped,
            actual_state: NodeActualState::Undeployed,
            is_ready: false,
            enforcement_attempts: 0,
            enforcement_failed_at: None,
            host_id: None,
            error_message: None,
            image_sync_status: None,
            image_sync_message: None,
            entered_state_at: clock.epoch_ms(),
        }
    }

    /// Mutates `actual_state`, stamping the transition time. Callers are
    /// expected to have already validated the transition via
    /// [`crate::state_machine::NodeStateMachine::can_transition`].
    pub fn transition_to(&mut self, next: NodeActualState, clock: &impl Clock) {
        self.actual_state = next;
        self.entered_state_at = clock.epoch_ms();
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct NodeStateBuilder => NodeState {
        set { lab_id: LabId = LabId::new() }
        set { node_id: NodeId = NodeId::new() }
        set { desired_state: NodeDesiredState = NodeDesiredState::Stopped }
        set { actual_state: NodeActualState = NodeActualState::Undeployed }
        set { is_ready: bool = false }
        set { enforcement_attempts: u32 = 0 }
        option { enforcement_failed_at: u64 = None }
        option { host_id: HostId = None }
        option { error_message: String = None }
        option { image_sync_status: String = None }
        option { image_sync_message: String = None }
        set { entered_state_at: u64 = 0 }
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
