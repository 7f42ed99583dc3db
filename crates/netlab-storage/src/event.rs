// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Every state mutation this crate knows how to apply, as a fact rather
//! than a command. `MaterializedState::apply_event` is the single place
//! these facts turn into row changes; nothing else mutates
//! [`crate::state::MaterializedState`] directly.

use netlab_core::{
    EndpointOper, HostId, HostStatus, JobId, JobLog, JobStatus, LabId, LabState, LinkActualState,
    LinkDesiredState, LinkId, LinkStateId, NodeActualState, NodeDesiredState, NodeId,
    ReservationId, TunnelId, TunnelStatus,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// A durable fact. Handlers in [`crate::state`] derive `MaterializedState`
/// changes from these; applying the same event twice must leave the state
/// identical to applying it once (see the data-model idempotency
/// invariant this event log exists to satisfy).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    LabCreated {
        lab_id: LabId,
        name: String,
        owner: String,
        provider: netlab_core::LabProvider,
        workspace_path: String,
    },
    LabStateChanged {
        lab_id: LabId,
        state: LabState,
    },
    LabDeleted {
        lab_id: LabId,
    },

    NodeDeclared {
        lab_id: LabId,
        node_id: NodeId,
        display_name: String,
        container_name: String,
        kind: netlab_core::NodeKind,
        image_ref: String,
    },
    NodeDesiredStateSet {
        lab_id: LabId,
        node_id: NodeId,
        desired_state: NodeDesiredState,
    },
    NodeActualStateChanged {
        lab_id: LabId,
        node_id: NodeId,
        actual_state: NodeActualState,
        entered_state_at: u64,
    },
    NodeEnforcementAttempted {
        lab_id: LabId,
        node_id: NodeId,
        attempts: u32,
    },
    NodeEnforcementFailed {
        lab_id: LabId,
        node_id: NodeId,
        failed_at: u64,
        error_message: String,
    },
    NodeReadyChanged {
        lab_id: LabId,
        node_id: NodeId,
        is_ready: bool,
    },
    NodeRemoved {
        lab_id: LabId,
        node_id: NodeId,
    },

    LinkDeclared {
        lab_id: LabId,
        link_id: LinkId,
        link_name: String,
        source: netlab_core::LinkEndpoint,
        target: netlab_core::LinkEndpoint,
        mtu: Option<u32>,
    },
    LinkStateCreated {
        lab_id: LabId,
        link_state_id: LinkStateId,
        link_definition_id: Option<LinkId>,
        link_name: String,
        source: netlab_core::LinkEndpoint,
        target: netlab_core::LinkEndpoint,
    },
    LinkDesiredStateSet {
        link_state_id: LinkStateId,
        desired_state: LinkDesiredState,
    },
    LinkActualStateChanged {
        link_state_id: LinkStateId,
        actual_state: LinkActualState,
    },
    LinkHostsAssigned {
        link_state_id: LinkStateId,
        source_host_id: Option<HostId>,
        target_host_id: Option<HostId>,
        is_cross_host: bool,
    },
    LinkVniAssigned {
        link_state_id: LinkStateId,
        vni: u32,
    },
    LinkVlanTagsAssigned {
        link_state_id: LinkStateId,
        source_vlan_tag: Option<u16>,
        target_vlan_tag: Option<u16>,
    },
    LinkVxlanAttachmentChanged {
        link_state_id: LinkStateId,
        source_vxlan_attached: bool,
        target_vxlan_attached: bool,
    },
    LinkCarrierChanged {
        link_state_id: LinkStateId,
        source_carrier_state: netlab_core::CarrierState,
        target_carrier_state: netlab_core::CarrierState,
    },
    LinkOperChanged {
        link_state_id: LinkStateId,
        source_oper: EndpointOper,
        target_oper: EndpointOper,
        oper_epoch: u64,
    },
    LinkDefinitionOrphaned {
        link_state_id: LinkStateId,
    },
    LinkErrorSet {
        link_state_id: LinkStateId,
        error_message: Option<String>,
    },
    LinkStateRemoved {
        link_state_id: LinkStateId,
    },

    ReservationClaimed {
        reservation_id: ReservationId,
        lab_id: LabId,
        node_id: NodeId,
        normalised_interface: String,
        link_state_id: LinkStateId,
    },
    ReservationReleased {
        reservation_id: ReservationId,
    },

    HostRegistered {
        host_id: HostId,
        address: String,
        capabilities: Json,
        image_sync_strategy: String,
    },
    HostHeartbeatReceived {
        host_id: HostId,
        received_at: u64,
    },
    HostStatusChanged {
        host_id: HostId,
        status: HostStatus,
    },
    HostErrorSet {
        host_id: HostId,
        last_error: Option<String>,
        error_since: Option<u64>,
    },
    HostResourceUsageReported {
        host_id: HostId,
        resource_usage: Json,
    },

    PlacementSet {
        lab_id: LabId,
        node_id: NodeId,
        host_id: HostId,
    },
    PlacementRemoved {
        lab_id: LabId,
        node_id: NodeId,
    },

    VxlanTunnelCreated {
        tunnel_id: TunnelId,
        lab_id: LabId,
        link_state_id: Option<LinkStateId>,
        agent_a: HostId,
        agent_b: HostId,
        vni: u32,
        port_name: String,
        created_at: u64,
    },
    VxlanTunnelStatusChanged {
        tunnel_id: TunnelId,
        status: TunnelStatus,
        cleanup_reason: Option<String>,
        updated_at: u64,
    },
    VxlanTunnelOrphaned {
        tunnel_id: TunnelId,
        updated_at: u64,
    },
    VxlanTunnelRemoved {
        tunnel_id: TunnelId,
    },

    InterfaceMappingUpserted {
        lab_id: LabId,
        node_id: NodeId,
        linux_interface: String,
        ovs_port: String,
        bridge: String,
        vlan_tag: Option<u16>,
        vendor_interface_name: Option<String>,
        last_verified_at: u64,
    },
    InterfaceMappingRemoved {
        lab_id: LabId,
        node_id: NodeId,
        linux_interface: String,
    },

    JobCreated {
        job_id: JobId,
        lab_id: LabId,
        user: String,
        action: netlab_core::JobAction,
    },
    JobStarted {
        job_id: JobId,
        started_at: u64,
    },
    JobStatusChanged {
        job_id: JobId,
        status: JobStatus,
        completed_at: Option<u64>,
    },
    JobRetried {
        job_id: JobId,
        retry_count: u32,
    },
    JobLogAppended {
        job_id: JobId,
        log: JobLog,
    },
    JobAssignedAgent {
        job_id: JobId,
        assigned_agent: Option<HostId>,
    },

    /// A control marker written to the log but never replayed into state;
    /// callers driving replay are responsible for stopping on it.
    Shutdown,
}
