// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declared-interface to observed-OVS-port mappings.

use crate::ids::{LabId, NodeId};
use serde::{Deserialize, Serialize};

/// Maps a node's declared Linux interface name to what the reconciler last
/// observed on the host: the OVS port, its bridge, the VLAN tag carried on
/// it, and any vendor-facing interface name alias. Refreshed by the
/// LinkReconciler's verify step; `last_verified_at` records when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceMapping {
    pub lab_id: LabId,
    pub node_id: NodeId,
    pub linux_interface: String,
    pub ovs_port: String,
    pub bridge: String,
    pub vlan_tag: Option<u16>,
    pub vendor_interface_name: Option<String>,
    pub last_verified_at: u64,
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct InterfaceMappingBuilder => InterfaceMapping {
        set { lab_id: LabId = LabId::new() }
        set { node_id: NodeId = NodeId::new() }
        into { linux_interface: String = "eth1" }
        into { ovs_port: String = "veth-eth1" }
        into { bridge: String = "ovs-br0" }
        option { vlan_tag: u16 = None }
        option { vendor_interface_name: String = None }
        set { last_verified_at: u64 = 0 }
    }
}
