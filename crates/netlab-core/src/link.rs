// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Link declarations and the observed/declared LinkState pair.

use crate::ids::{HostId, LabId, LinkId, LinkStateId, NodeId};
use serde::{Deserialize, Serialize};

crate::simple_display! {
    LinkDesiredState {
        Up => "up",
        Down => "down",
        Deleted => "deleted",
    }
}

/// The user's intent for a link. `Deleted` is distinct from `Down`: a
/// deleted link is torn down and its row removed by the reconciler's
/// orphan/deleted-link sweep, whereas `down` just releases
/// reservations and leaves the row in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkDesiredState {
    Up,
    Down,
    Deleted,
}

crate::simple_display! {
    LinkActualState {
        Unknown => "unknown",
        Pending => "pending",
        Creating => "creating",
        Up => "up",
        Down => "down",
        Error => "error",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkActualState {
    Unknown,
    Pending,
    Creating,
    Up,
    Down,
    Error,
}

/// One declared endpoint: a node and the interface on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEndpoint {
    pub node_id: NodeId,
    pub node_name: String,
    pub interface: String,
}

/// A declared L2 connection between two (node, interface) pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub lab_id: LabId,
    pub link_name: String,
    pub source: LinkEndpoint,
    pub target: LinkEndpoint,
    pub mtu: Option<u32>,
}

crate::simple_display! {
    OperReason {
        AdminDown => "admin_down",
        LocalNodeDown => "local_node_down",
        LocalInterfaceDown => "local_interface_down",
        PeerHostOffline => "peer_host_offline",
        PeerNodeDown => "peer_node_down",
        PeerInterfaceDown => "peer_interface_down",
        TransportDown => "transport_down",
        TransportDegraded => "transport_degraded",
        Unknown => "unknown",
    }
}

/// Closed set of reasons an endpoint's derived operational state is down
/// or degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperReason {
    AdminDown,
    LocalNodeDown,
    LocalInterfaceDown,
    PeerHostOffline,
    PeerNodeDown,
    PeerInterfaceDown,
    TransportDown,
    TransportDegraded,
    Unknown,
}

crate::simple_display! {
    OperState {
        Up => "up",
        Degraded => "degraded",
        Down => "down",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperState {
    Up,
    Degraded,
    Down,
}

/// Per-endpoint derived operational state: state plus reason, default
/// to `Down`/`Unknown` until the reconciler has computed it once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointOper {
    pub state: OperState,
    pub reason: OperReason,
}

impl Default for EndpointOper {
    fn default() -> Self {
        Self { state: OperState::Down, reason: OperReason::Unknown }
    }
}

/// The observed/declared pair for one link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkState {
    pub id: LinkStateId,
    pub lab_id: LabId,
    /// Null means the Link declaration that created this row was deleted
    /// (e.g. an interface rename); see.
    pub link_definition_id: Option<LinkId>,
    pub link_name: String,
    pub source: LinkEndpoint,
    pub target: LinkEndpoint,
    pub desired_state: LinkDesiredState,
    pub actual_state: LinkActualState,
    pub is_cross_host: bool,
    pub source_host_id: Option<HostId>,
    pub target_host_id: Option<HostId>,
    pub source_vxlan_attached: bool,
    pub target_vxlan_attached: bool,
    pub source_carrier_state: CarrierState,
    pub target_carrier_state: CarrierState,
    /// Cross-host only: the deterministically-allocated VNI.
    pub vni: Option<u32>,
    pub source_vlan_tag: Option<u16>,
    pub target_vlan_tag: Option<u16>,
    pub source_oper: EndpointOper,
    pub target_oper: EndpointOper,
    /// Strictly increases whenever a derived oper-state field changes.
    pub oper_epoch: u64,
    pub error_message: Option<String>,
}

crate::simple_display! {
    CarrierState {
        On => "on",
        Off => "off",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarrierState {
    On,
    Off,
}

impl LinkState {
    pub fn new(lab_id: crate::ids::LabId, link: &Link) -> Self {
        Self {
            id: LinkStateId::new(),
            lab_id,
            link_definition_id: Some(link.id),
            link_name: link.link_name.clone(),
            source: link.source.clone(),
            target: link.target.clone(),
            desired_state: LinkDesiredState::Up,
            actual_state: LinkActualState::Unknown,
            is_cross_host: false,
            source_host_id: None,
            target_host_id: None,
            source_vxlan_attached: false,
            target_vxlan_attached: false,
            source_carrier_state: CarrierState::Off,
            target_carrier_state: CarrierState::Off,
            vni: None,
            source_vlan_tag: None,
            target_vlan_tag: None,
            source_oper: EndpointOper::default(),
            target_oper: EndpointOper::default(),
            oper_epoch: 0,
            error_message: None,
        }
    }

    /// Bumps `oper_epoch` if and only if either endpoint's derived oper
    /// state or reason actually changed.
    pub fn apply_oper(&mut self, source: EndpointOper, target: EndpointOper) -> bool {
        let changed = source != self.source_oper || target != self.target_oper;
        if changed {
            self.source_oper = source;
            self.target_oper = target;
            self.oper_epoch += 1;
        }
        changed
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct LinkStateBuilder => LinkState {
        set { id: LinkStateId = LinkStateId::new() }
        set { lab_id: LabId = LabId::new() }
        option { link_definition_id: LinkId = None }
        into { link_name: String = "l1" }
        set { source: LinkEndpoint = LinkEndpoint { node_id: NodeId::new(), node_name: "r1".into(), interface: "eth1".into() } }
        set { target: LinkEndpoint = LinkEndpoint { node_id: NodeId::new(), node_name: "r2".into(), interface: "eth1".into() } }
        set { desired_state: LinkDesiredState = LinkDesiredState::Up }
        set { actual_state: LinkActualState = LinkActualState::Unknown }
        set { is_cross_host: bool = false }
        option { source_host_id: HostId = None }
        option { target_host_id: HostId = None }
        set { source_vxlan_attached: bool = false }
        set { target_vxlan_attached: bool = false }
        set { source_carrier_state: CarrierState = CarrierState::Off }
        set { target_carrier_state: CarrierState = CarrierState::Off }
        option { vni: u32 = None }
        option { source_vlan_tag: u16 = None }
        option { target_vlan_tag: u16 = None }
        set { source_oper: EndpointOper = EndpointOper::default() }
        set { target_oper: EndpointOper = EndpointOper::default() }
        set { oper_epoch: u64 = 0 }
        option { error_message: String = None }
    }
}

#[cfg(test)]
#[path = "link_tests.rs"]
mod tests;
