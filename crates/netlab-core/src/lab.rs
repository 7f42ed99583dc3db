// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lab declarations: the top-level container owning nodes, links, and jobs.

use crate::ids::{HostId, LabId};
use serde::{Deserialize, Serialize};

crate::simple_display! {
    LabProvider {
        Docker => "docker",
        Libvirt => "libvirt",
    }
}

/// The container runtime backing a lab's nodes. Open-ended at the wire
/// boundary, but the control plane only ever branches on these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabProvider {
    Docker,
    Libvirt,
}

crate::simple_display! {
    LabState {
        Stopped => "stopped",
        Starting => "starting",
        Running => "running",
        Stopping => "stopping",
        Error => "error",
    }
}

/// A lab's declared state, as distinct from its derived aggregate state
/// (computed from per-node counts,).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Error,
}

/// A top-level lab: owns nodes, links, jobs, node/link states, placements,
/// and layout. Destroying a Lab cascades to every owned entity and
/// triggers a `LAB_DELETED` cleanup event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lab {
    pub id: LabId,
    pub name: String,
    pub owner: String,
    pub provider: LabProvider,
    pub declared_state: LabState,
    pub workspace_path: String,
    pub default_agent: Option<HostId>,
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct LabBuilder => Lab {
        set { id: LabId = LabId::new() }
        into { name: String = "demo-lab" }
        into { owner: String = "alice" }
        set { provider: LabProvider = LabProvider::Docker }
        set { declared_state: LabState = LabState::Stopped }
        into { workspace_path: String = "/var/lib/netlab/demo-lab" }
        option { default_agent: HostId = None }
    }
}
