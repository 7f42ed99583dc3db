// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The [`AgentClient`] trait: every RPC the control plane issues against a
//! single agent (§4.2, §6). One timeout and one retry policy per
//! operation, both fixed at the call site rather than left to the
//! implementation, so the fake and the HTTP client behave identically.

use async_trait::async_trait;
use netlab_core::{HostId, JobId, LabId, LabProvider};
use netlab_wire::{
    AttachOverlayRequest, AttachOverlayResponse, HealthResponse, PortPairing,
    ReconcileOverlayPortsResponse, StatusResponse, TopologyWire,
};
use std::time::Duration;

use crate::error::AgentClientError;

pub type AgentResult<T> = Result<T, AgentClientError>;

/// Fixed per-operation timeout table (§4.2).
pub mod timeouts {
    use std::time::Duration;

    pub const DEPLOY: Duration = Duration::from_secs(900);
    pub const DESTROY: Duration = Duration::from_secs(300);
    pub const NODE_ACTION: Duration = Duration::from_secs(60);
    pub const STATUS: Duration = Duration::from_secs(30);
    pub const HEALTH: Duration = Duration::from_secs(5);
    pub const DISCOVER_LABS: Duration = Duration::from_secs(30);
    pub const CLEANUP_ORPHANS: Duration = Duration::from_secs(120);
    pub const OVERLAY_ENDPOINT: Duration = Duration::from_secs(60);
    pub const PORT_VLAN: Duration = Duration::from_secs(30);
    pub const RECONCILE_VXLAN_PORTS: Duration = Duration::from_secs(60);
    pub const PORT_STATE_DECLARE: Duration = Duration::from_secs(30);
}

/// How many times a failed call may be retried, and under what condition.
/// Mirrors §4.2's table: most calls retry connection errors only (up to
/// the shared exponential-backoff budget), `status` retries once
/// regardless of category, and several calls never retry at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    Never,
    ConnectionOnly { max_attempts: u32 },
    Once,
}

pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// One `(port-a, port-b, vlan-tag)` side's batch for `declare_port_state`.
#[derive(Debug, Clone)]
pub struct PortStateDeclaration {
    pub lab_id: LabId,
    pub pairings: Vec<PortPairing>,
}

/// A typed façade over one agent's HTTP API (§4.2). Every method
/// corresponds to exactly one row of the operations table; the agent id
/// a given instance talks to is bound at construction.
#[async_trait]
pub trait AgentClient: Send + Sync {
    fn host_id(&self) -> HostId;

    async fn deploy(
        &self,
        job_id: JobId,
        lab_id: LabId,
        provider: LabProvider,
        topology: &TopologyWire,
    ) -> AgentResult<()>;

    async fn destroy(&self, job_id: JobId, lab_id: LabId) -> AgentResult<()>;

    async fn node_action(&self, job_id: JobId, lab_id: LabId, node: &str, op: &str) -> AgentResult<()>;

    async fn status(&self, lab_id: LabId) -> AgentResult<StatusResponse>;

    async fn health(&self) -> AgentResult<HealthResponse>;

    async fn discover_labs(&self) -> AgentResult<Vec<LabId>>;

    async fn cleanup_orphans(&self, valid_lab_ids: &[LabId]) -> AgentResult<()>;

    async fn attach_overlay(&self, request: AttachOverlayRequest) -> AgentResult<AttachOverlayResponse>;

    async fn detach_overlay(&self, link_state_id: &str, container: &str, interface: &str) -> AgentResult<()>;

    async fn set_port_vlan(&self, port: &str, vlan_tag: u16) -> AgentResult<()>;

    async fn get_port_vlan(&self, port: &str) -> AgentResult<Option<u16>>;

    async fn reconcile_vxlan_ports(
        &self,
        valid_port_names: &[String],
        allow_empty: bool,
    ) -> AgentResult<ReconcileOverlayPortsResponse>;

    async fn declare_port_state(&self, declaration: PortStateDeclaration) -> AgentResult<()>;

    /// Opens the bidirectional byte proxy to this agent's console endpoint
    /// for `lab_id`/`node`. No timeout: lives for the life of the
    /// connection (§6).
    async fn open_console(&self, lab_id: LabId, node: &str) -> AgentResult<crate::console::ConsoleStream>;
}

/// The operation's declared timeout and retry policy, used by the HTTP
/// implementation (and asserted against by the fake's tests) so the two
/// can never silently drift apart.
pub fn policy_for(op: AgentOperation) -> (Duration, RetryPolicy) {
    use AgentOperation::*;
    match op {
        Deploy => (timeouts::DEPLOY, RetryPolicy::ConnectionOnly { max_attempts: DEFAULT_MAX_ATTEMPTS }),
        Destroy => (timeouts::DESTROY, RetryPolicy::ConnectionOnly { max_attempts: DEFAULT_MAX_ATTEMPTS }),
        NodeAction => (timeouts::NODE_ACTION, RetryPolicy::ConnectionOnly { max_attempts: DEFAULT_MAX_ATTEMPTS }),
        Status => (timeouts::STATUS, RetryPolicy::Once),
        Health => (timeouts::HEALTH, RetryPolicy::Never),
        DiscoverLabs => (timeouts::DISCOVER_LABS, RetryPolicy::Never),
        CleanupOrphans => (timeouts::CLEANUP_ORPHANS, RetryPolicy::Never),
        OverlayEndpoint => (timeouts::OVERLAY_ENDPOINT, RetryPolicy::Never),
        PortVlan => (timeouts::PORT_VLAN, RetryPolicy::Never),
        ReconcileVxlanPorts => (timeouts::RECONCILE_VXLAN_PORTS, RetryPolicy::Never),
        PortStateDeclare => (timeouts::PORT_STATE_DECLARE, RetryPolicy::Never),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentOperation {
    Deploy,
    Destroy,
    NodeAction,
    Status,
    Health,
    DiscoverLabs,
    CleanupOrphans,
    OverlayEndpoint,
    PortVlan,
    ReconcileVxlanPorts,
    PortStateDeclare,
}
