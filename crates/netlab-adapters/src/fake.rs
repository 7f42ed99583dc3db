// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`AgentClient`] double for tests of reconciler/job-runner
//! logic that would otherwise need a real agent. Records every call it
//! receives and lets the test script the response or failure per
//! operation, the way the teacher's `FakeAgentAdapter` is driven.

use async_trait::async_trait;
use netlab_core::{HostId, JobId, LabId};
use netlab_wire::{
    AttachOverlayRequest, AttachOverlayResponse, HealthResponse, ReconcileOverlayPortsResponse,
    StatusResponse, TopologyWire,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::client::{AgentClient, AgentResult, PortStateDeclaration};
use crate::console::ConsoleStream;
use crate::error::AgentClientError;

/// One recorded call, for assertions like "deploy was issued exactly once
/// with this topology".
#[derive(Debug, Clone)]
pub enum AgentCall {
    Deploy { job_id: JobId, lab_id: LabId, provider: netlab_core::LabProvider, topology: TopologyWire },
    Destroy { job_id: JobId, lab_id: LabId },
    NodeAction { job_id: JobId, lab_id: LabId, node: String, op: String },
    Status { lab_id: LabId },
    Health,
    DiscoverLabs,
    CleanupOrphans { valid_lab_ids: Vec<LabId> },
    AttachOverlay { request: AttachOverlayRequest },
    DetachOverlay { link_state_id: String, container: String, interface: String },
    SetPortVlan { port: String, vlan_tag: u16 },
    GetPortVlan { port: String },
    ReconcileVxlanPorts { valid_port_names: Vec<String>, allow_empty: bool },
    DeclarePortState { declaration: PortStateDeclaration },
}

#[derive(Default)]
struct Inner {
    calls: Vec<AgentCall>,
    scripted_errors: HashMap<&'static str, AgentClientError>,
    statuses: HashMap<LabId, StatusResponse>,
    healthy: bool,
    port_vlans: HashMap<String, u16>,
}

/// A scriptable, call-recording stand-in for a real agent. Defaults to
/// healthy and to succeeding every call; `fail_next` overrides one
/// operation's next call with a given error.
#[derive(Clone)]
pub struct FakeAgentClient {
    host_id: HostId,
    inner: Arc<Mutex<Inner>>,
}

impl FakeAgentClient {
    pub fn new(host_id: HostId) -> Self {
        let mut inner = Inner::default();
        inner.healthy = true;
        Self { host_id, inner: Arc::new(Mutex::new(inner)) }
    }

    pub fn calls(&self) -> Vec<AgentCall> {
        self.inner.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().calls.len()
    }

    /// Makes the next call to `op` (by the operation's method name) fail
    /// with `error`. Cleared after it fires once.
    pub fn fail_next(&self, op: &'static str, error: AgentClientError) {
        self.inner.lock().scripted_errors.insert(op, error);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.inner.lock().healthy = healthy;
    }

    pub fn set_status(&self, lab_id: LabId, status: StatusResponse) {
        self.inner.lock().statuses.insert(lab_id, status);
    }

    pub fn set_port_vlan(&self, port: impl Into<String>, vlan_tag: u16) {
        self.inner.lock().port_vlans.insert(port.into(), vlan_tag);
    }

    fn take_scripted_error(&self, op: &'static str) -> Option<AgentClientError> {
        self.inner.lock().scripted_errors.remove(op)
    }
}

#[async_trait]
impl AgentClient for FakeAgentClient {
    fn host_id(&self) -> HostId {
        self.host_id
    }

    async fn deploy(
        &self,
        job_id: JobId,
        lab_id: LabId,
        provider: netlab_core::LabProvider,
        topology: &TopologyWire,
    ) -> AgentResult<()> {
        self.inner.lock().calls.push(AgentCall::Deploy { job_id, lab_id, provider, topology: topology.clone() });
        if let Some(e) = self.take_scripted_error("deploy") {
            return Err(e);
        }
        Ok(())
    }

    async fn destroy(&self, job_id: JobId, lab_id: LabId) -> AgentResult<()> {
        self.inner.lock().calls.push(AgentCall::Destroy { job_id, lab_id });
        if let Some(e) = self.take_scripted_error("destroy") {
            return Err(e);
        }
        Ok(())
    }

    async fn node_action(&self, job_id: JobId, lab_id: LabId, node: &str, op: &str) -> AgentResult<()> {
        self.inner.lock().calls.push(AgentCall::NodeAction {
            job_id,
            lab_id,
            node: node.to_string(),
            op: op.to_string(),
        });
        if let Some(e) = self.take_scripted_error("node_action") {
            return Err(e);
        }
        Ok(())
    }

    async fn status(&self, lab_id: LabId) -> AgentResult<StatusResponse> {
        self.inner.lock().calls.push(AgentCall::Status { lab_id });
        if let Some(e) = self.take_scripted_error("status") {
            return Err(e);
        }
        Ok(self.inner.lock().statuses.get(&lab_id).cloned().unwrap_or(StatusResponse { nodes: vec![] }))
    }

    async fn health(&self) -> AgentResult<HealthResponse> {
        self.inner.lock().calls.push(AgentCall::Health);
        if let Some(e) = self.take_scripted_error("health") {
            return Err(e);
        }
        Ok(HealthResponse { healthy: self.inner.lock().healthy, resource_usage: serde_json::Value::Null })
    }

    async fn discover_labs(&self) -> AgentResult<Vec<LabId>> {
        self.inner.lock().calls.push(AgentCall::DiscoverLabs);
        if let Some(e) = self.take_scripted_error("discover_labs") {
            return Err(e);
        }
        Ok(vec![])
    }

    async fn cleanup_orphans(&self, valid_lab_ids: &[LabId]) -> AgentResult<()> {
        self.inner.lock().calls.push(AgentCall::CleanupOrphans { valid_lab_ids: valid_lab_ids.to_vec() });
        if let Some(e) = self.take_scripted_error("cleanup_orphans") {
            return Err(e);
        }
        Ok(())
    }

    async fn attach_overlay(&self, request: AttachOverlayRequest) -> AgentResult<AttachOverlayResponse> {
        self.inner.lock().calls.push(AgentCall::AttachOverlay { request: request.clone() });
        if let Some(e) = self.take_scripted_error("attach_overlay") {
            return Err(e);
        }
        Ok(AttachOverlayResponse { vlan_tag: 100 })
    }

    async fn detach_overlay(&self, link_state_id: &str, container: &str, interface: &str) -> AgentResult<()> {
        self.inner.lock().calls.push(AgentCall::DetachOverlay {
            link_state_id: link_state_id.to_string(),
            container: container.to_string(),
            interface: interface.to_string(),
        });
        if let Some(e) = self.take_scripted_error("detach_overlay") {
            return Err(e);
        }
        Ok(())
    }

    async fn set_port_vlan(&self, port: &str, vlan_tag: u16) -> AgentResult<()> {
        self.inner.lock().calls.push(AgentCall::SetPortVlan { port: port.to_string(), vlan_tag });
        if let Some(e) = self.take_scripted_error("set_port_vlan") {
            return Err(e);
        }
        self.inner.lock().port_vlans.insert(port.to_string(), vlan_tag);
        Ok(())
    }

    async fn get_port_vlan(&self, port: &str) -> AgentResult<Option<u16>> {
        self.inner.lock().calls.push(AgentCall::GetPortVlan { port: port.to_string() });
        if let Some(e) = self.take_scripted_error("get_port_vlan") {
            return Err(e);
        }
        Ok(self.inner.lock().port_vlans.get(port).copied())
    }

    async fn reconcile_vxlan_ports(
        &self,
        valid_port_names: &[String],
        allow_empty: bool,
    ) -> AgentResult<ReconcileOverlayPortsResponse> {
        self.inner.lock().calls.push(AgentCall::ReconcileVxlanPorts {
            valid_port_names: valid_port_names.to_vec(),
            allow_empty,
        });
        if let Some(e) = self.take_scripted_error("reconcile_vxlan_ports") {
            return Err(e);
        }
        Ok(ReconcileOverlayPortsResponse { removed_ports: vec![] })
    }

    async fn declare_port_state(&self, declaration: PortStateDeclaration) -> AgentResult<()> {
        self.inner.lock().calls.push(AgentCall::DeclarePortState { declaration });
        if let Some(e) = self.take_scripted_error("declare_port_state") {
            return Err(e);
        }
        Ok(())
    }

    async fn open_console(&self, _lab_id: LabId, _node: &str) -> AgentResult<ConsoleStream> {
        Err(AgentClientError::Unknown {
            host_id: self.host_id,
            job_id: None,
            message: "FakeAgentClient does not support console passthrough".into(),
        })
    }
}
