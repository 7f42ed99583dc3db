// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bodies for the controller → agent RPC surface (§4.2, §6).
//!
//! These are JSON-over-HTTP request/response shapes. The `AgentClient`
//! trait in `netlab-adapters` is what actually issues them; this crate only
//! owns the schema, the way the teacher's wire crate is schema-only and
//! leaves framing/IO to its adapters.

use netlab_core::{HostId, JobId, LabId, LabProvider, NodeId};
use serde::{Deserialize, Serialize};

/// One endpoint of a declared link, as sent to an agent's `create-link` /
/// `attach-overlay` calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopologyLinkWire {
    pub link_name: String,
    pub source_node: String,
    pub source_interface: String,
    pub target_node: String,
    pub target_interface: String,
    #[serde(default)]
    pub mtu: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopologyNodeWire {
    pub name: String,
    pub container_name: String,
    pub kind: String,
    pub image_ref: String,
}

/// The resolved topology a `deploy` job hands to an agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopologyWire {
    pub nodes: Vec<TopologyNodeWire>,
    pub links: Vec<TopologyLinkWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeployRequest {
    pub job_id: JobId,
    pub lab_id: LabId,
    pub provider: LabProvider,
    pub topology: TopologyWire,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DestroyRequest {
    pub job_id: JobId,
    pub lab_id: LabId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeActionRequest {
    pub job_id: JobId,
    pub lab_id: LabId,
    pub node: String,
    pub op: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusRequest {
    pub lab_id: LabId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeStatusEntry {
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub nodes: Vec<NodeStatusEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub healthy: bool,
    #[serde(default)]
    pub resource_usage: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CleanupOrphansRequest {
    pub valid_lab_ids: Vec<LabId>,
}

/// `attach-overlay-interface`: one side of a cross-host link creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttachOverlayRequest {
    pub link_state_id: String,
    pub container: String,
    pub interface: String,
    pub vni: u32,
    pub local_ip: String,
    pub remote_ip: String,
    #[serde(default)]
    pub mtu: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttachOverlayResponse {
    pub vlan_tag: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetachOverlayRequest {
    pub link_state_id: String,
    pub container: String,
    pub interface: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetPortVlanRequest {
    pub port: String,
    pub vlan_tag: u16,
}

/// One (container-port-a, container-port-b, vlan-tag) triple for the
/// same-host port-state batch declaration (§4.7 "same-host port
/// convergence").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortPairing {
    pub port_a: String,
    pub port_b: String,
    pub vlan_tag: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconcileOverlayPortsRequest {
    pub valid_port_names: Vec<String>,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub confirm: bool,
    #[serde(default)]
    pub allow_empty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconcileOverlayPortsResponse {
    pub removed_ports: Vec<String>,
}

/// A host as returned by `discover-labs`/registration, used by the
/// (out-of-scope) agent-registration flow this crate only characterizes
/// the shape of.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveredLab {
    pub lab_id: LabId,
    pub agent_id: HostId,
}
