// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-host overlay tunnels.

use crate::ids::{HostId, LabId, LinkStateId, TunnelId};
use serde::{Deserialize, Serialize};

crate::simple_display! {
    TunnelStatus {
        Pending => "pending",
        Active => "active",
        Cleanup => "cleanup",
    }
}

/// A tunnel's lifecycle phase. `Cleanup` marks a tunnel the reconciler has
/// decided to tear down but not yet confirmed gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunnelStatus {
    Pending,
    Active,
    Cleanup,
}

/// One VXLAN overlay tunnel backing a cross-host link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VxlanTunnel {
    pub id: TunnelId,
    pub lab_id: LabId,
    /// Null once the owning LinkState row has been deleted out from under
    /// this tunnel; such tunnels are swept by orphan cleanup.
    pub link_state_id: Option<LinkStateId>,
    pub agent_a: HostId,
    pub agent_b: HostId,
    pub vni: u32,
    pub port_name: String,
    pub status: TunnelStatus,
    pub cleanup_reason: Option<String>,
    pub created_at: u64,
    /// epoch-ms of the last status/field change; orphan-tunnel cleanup uses
    /// this against a cutoff to find stale `cleanup` rows.
    pub updated_at: u64,
}

impl VxlanTunnel {
    /// The canonical key used to detect duplicate tunnels for the same
    /// overlay: two tunnels with the same (unordered) agent pair and VNI
    /// are the same logical tunnel.
    pub fn canonical_key(&self) -> (HostId, HostId, u32) {
        if self.agent_a.as_str() <= self.agent_b.as_str() {
            (self.agent_a, self.agent_b, self.vni)
        } else {
            (self.agent_b, self.agent_a, self.vni)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct VxlanTunnelBuilder => VxlanTunnel {
        set { id: TunnelId = TunnelId::new() }
        set { lab_id: LabId = LabId::new() }
        option { link_state_id: LinkStateId = None }
        set { agent_a: HostId = HostId::new() }
        set { agent_b: HostId = HostId::new() }
        set { vni: u32 = 5000 }
        into { port_name: String = "vxlan-deadbeef" }
        set { status: TunnelStatus = TunnelStatus::Active }
        option { cleanup_reason: String = None }
        set { created_at: u64 = 0 }
        set { updated_at: u64 = 0 }
    }
}

#[cfg(test)]
#[path = "vxlan_tests.rs"]
mod tests;
