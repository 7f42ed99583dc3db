// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pub/sub broadcast frame (§4.3): everything the Broadcaster fans out
//! to WebSocket subscribers is one of these, serialized as JSON.

use chrono::{DateTime, Utc};
use netlab_core::{HostId, JobId, JobStatus, LabId, LabState, LinkStateId, NodeId};
use serde::{Deserialize, Serialize};

/// One frame published on a `lab_state:<lab-id>` channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BroadcastFrame {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub data: BroadcastData,
}

impl BroadcastFrame {
    pub fn new(timestamp: DateTime<Utc>, data: BroadcastData) -> Self {
        Self { timestamp, data }
    }
}

/// The type-specific payload. `#[serde(tag = "type")]` so the wire shape
/// matches `{type: "...", ...fields}` rather than nesting a `data` object,
/// which keeps consumers' pattern matches flat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BroadcastData {
    NodeState {
        lab_id: LabId,
        node_id: NodeId,
        display_state: String,
        image_sync_status: Option<String>,
        enforcement_attempts: u32,
        host_name: Option<String>,
    },
    LinkState {
        lab_id: LabId,
        link_state_id: LinkStateId,
        actual_state: String,
        source_oper_state: String,
        source_oper_reason: String,
        target_oper_state: String,
        target_oper_reason: String,
        oper_epoch: u64,
    },
    LabState {
        lab_id: LabId,
        state: LabState,
    },
    JobProgress {
        job_id: JobId,
        lab_id: LabId,
        status: JobStatus,
        message: Option<String>,
    },
    InitialState {
        lab_id: LabId,
        nodes: Vec<NodeStateSnapshot>,
    },
    InitialLinks {
        lab_id: LabId,
        links: Vec<LinkStateSnapshot>,
    },
    Heartbeat,
    Error {
        message: String,
    },
}

/// The node-snapshot shape sent in an `initial_state` frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeStateSnapshot {
    pub node_id: NodeId,
    pub display_state: String,
    pub image_sync_status: Option<String>,
    pub enforcement_attempts: u32,
    pub host_name: Option<String>,
}

/// The link-snapshot shape sent in an `initial_links` frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkStateSnapshot {
    pub link_state_id: LinkStateId,
    pub actual_state: String,
    pub is_cross_host: bool,
    pub source_host_id: Option<HostId>,
    pub target_host_id: Option<HostId>,
    pub oper_epoch: u64,
}
