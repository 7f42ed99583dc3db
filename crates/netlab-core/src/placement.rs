// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node-to-host placement decisions.

use crate::ids::{HostId, LabId, NodeId};
use serde::{Deserialize, Serialize};

/// Records which host a node was (or should be) deployed onto. Kept
/// separate from [`crate::node::NodeState`] because placement is decided
/// once, up front, while actual/desired state churns continuously.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub lab_id: LabId,
    pub node_id: NodeId,
    pub host_id: HostId,
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct PlacementBuilder => Placement {
        set { lab_id: LabId = LabId::new() }
        set { node_id: NodeId = NodeId::new() }
        set { host_id: HostId = HostId::new() }
    }
}
