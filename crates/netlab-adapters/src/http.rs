// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The production [`AgentClient`]: issues the §4.2 RPC surface over HTTP
//! against a single agent, applying the fixed timeout/retry table from
//! [`crate::client::policy_for`] uniformly across every call.

use async_trait::async_trait;
use netlab_core::{HostId, JobId, LabId};
use netlab_wire::{
    AttachOverlayRequest, AttachOverlayResponse, CleanupOrphansRequest, DeployRequest,
    DestroyRequest, HealthResponse, NodeActionRequest, PortPairing, ReconcileOverlayPortsRequest,
    ReconcileOverlayPortsResponse, SetPortVlanRequest, StatusRequest, StatusResponse,
    TopologyWire,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::{policy_for, AgentClient, AgentOperation, AgentResult, PortStateDeclaration};
use crate::console::ConsoleStream;
use crate::error::AgentClientError;
use crate::retry::with_retry;

/// Talks to one agent's HTTP API at `base_url` (e.g. `http://10.0.4.12:7780`).
pub struct HttpAgentClient {
    host_id: HostId,
    base_url: String,
    http: Client,
}

impl HttpAgentClient {
    pub fn new(host_id: HostId, base_url: impl Into<String>) -> Self {
        Self {
            host_id,
            base_url: base_url.into(),
            http: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Issues one attempt of a JSON POST, translating transport/HTTP-status
    /// failures into the agent's [`AgentClientError`] taxonomy. Retries are
    /// layered on top by the caller via [`with_retry`], not here.
    async fn call<Req: Serialize + ?Sized, Resp: DeserializeOwned>(
        &self,
        op: AgentOperation,
        path: &str,
        body: &Req,
    ) -> AgentResult<Resp> {
        let (timeout, _) = policy_for(op);
        let response = self
            .http
            .post(self.url(path))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.decode(response).await
    }

    async fn call_no_body<Resp: DeserializeOwned>(
        &self,
        op: AgentOperation,
        path: &str,
    ) -> AgentResult<Resp> {
        let (timeout, _) = policy_for(op);
        let response = self
            .http
            .get(self.url(path))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.decode(response).await
    }

    fn transport_error(&self, source: reqwest::Error) -> AgentClientError {
        if source.is_timeout() {
            AgentClientError::Timeout { host_id: self.host_id, job_id: None, elapsed_secs: 0 }
        } else {
            AgentClientError::Connection { host_id: self.host_id, job_id: None, source: source.to_string() }
        }
    }

    async fn decode<Resp: DeserializeOwned>(&self, response: reqwest::Response) -> AgentResult<Resp> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<Resp>()
                .await
                .map_err(|e| AgentClientError::Unknown { host_id: self.host_id, job_id: None, message: e.to_string() });
        }

        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED => AgentClientError::Authentication { host_id: self.host_id, job_id: None },
            StatusCode::FORBIDDEN => AgentClientError::Authorisation { host_id: self.host_id, job_id: None },
            StatusCode::NOT_FOUND => AgentClientError::NotFound { host_id: self.host_id, job_id: None, message },
            StatusCode::CONFLICT => AgentClientError::Conflict { host_id: self.host_id, job_id: None, message },
            s if s.is_client_error() => AgentClientError::Validation { host_id: self.host_id, job_id: None, message },
            s if s.is_server_error() => AgentClientError::Server { host_id: self.host_id, job_id: None, message },
            _ => AgentClientError::Unknown { host_id: self.host_id, job_id: None, message },
        })
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
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
        let (_, retry) = policy_for(AgentOperation::Deploy);
        let body = DeployRequest { job_id, lab_id, provider, topology: topology.clone() };
        with_retry(retry, || self.call::<_, serde_json::Value>(AgentOperation::Deploy, "/labs/deploy", &body))
            .await
            .map(|_| ())
            .map_err(|e| e.with_job(job_id))
    }

    async fn destroy(&self, job_id: JobId, lab_id: LabId) -> AgentResult<()> {
        let (_, retry) = policy_for(AgentOperation::Destroy);
        let body = DestroyRequest { job_id, lab_id };
        with_retry(retry, || self.call::<_, serde_json::Value>(AgentOperation::Destroy, "/labs/destroy", &body))
            .await
            .map(|_| ())
            .map_err(|e| e.with_job(job_id))
    }

    async fn node_action(&self, job_id: JobId, lab_id: LabId, node: &str, op: &str) -> AgentResult<()> {
        let (_, retry) = policy_for(AgentOperation::NodeAction);
        let body = NodeActionRequest { job_id, lab_id, node: node.to_string(), op: op.to_string() };
        with_retry(retry, || self.call::<_, serde_json::Value>(AgentOperation::NodeAction, "/nodes/action", &body))
            .await
            .map(|_| ())
            .map_err(|e| e.with_job(job_id))
    }

    async fn status(&self, lab_id: LabId) -> AgentResult<StatusResponse> {
        let (_, retry) = policy_for(AgentOperation::Status);
        let body = StatusRequest { lab_id };
        with_retry(retry, || self.call(AgentOperation::Status, "/labs/status", &body)).await
    }

    async fn health(&self) -> AgentResult<HealthResponse> {
        let (_, retry) = policy_for(AgentOperation::Health);
        with_retry(retry, || self.call_no_body(AgentOperation::Health, "/health")).await
    }

    async fn discover_labs(&self) -> AgentResult<Vec<LabId>> {
        let (_, retry) = policy_for(AgentOperation::DiscoverLabs);
        with_retry(retry, || self.call_no_body(AgentOperation::DiscoverLabs, "/labs/discover")).await
    }

    async fn cleanup_orphans(&self, valid_lab_ids: &[LabId]) -> AgentResult<()> {
        let (_, retry) = policy_for(AgentOperation::CleanupOrphans);
        let body = CleanupOrphansRequest { valid_lab_ids: valid_lab_ids.to_vec() };
        with_retry(retry, || {
            self.call::<_, serde_json::Value>(AgentOperation::CleanupOrphans, "/labs/cleanup-orphans", &body)
        })
        .await
        .map(|_| ())
    }

    async fn attach_overlay(&self, request: AttachOverlayRequest) -> AgentResult<AttachOverlayResponse> {
        let (_, retry) = policy_for(AgentOperation::OverlayEndpoint);
        with_retry(retry, || self.call(AgentOperation::OverlayEndpoint, "/overlay/attach", &request)).await
    }

    async fn detach_overlay(&self, link_state_id: &str, container: &str, interface: &str) -> AgentResult<()> {
        let (_, retry) = policy_for(AgentOperation::OverlayEndpoint);
        let body = netlab_wire::DetachOverlayRequest {
            link_state_id: link_state_id.to_string(),
            container: container.to_string(),
            interface: interface.to_string(),
        };
        with_retry(retry, || {
            self.call::<_, serde_json::Value>(AgentOperation::OverlayEndpoint, "/overlay/detach", &body)
        })
        .await
        .map(|_| ())
    }

    async fn set_port_vlan(&self, port: &str, vlan_tag: u16) -> AgentResult<()> {
        let (_, retry) = policy_for(AgentOperation::PortVlan);
        let body = SetPortVlanRequest { port: port.to_string(), vlan_tag };
        with_retry(retry, || {
            self.call::<_, serde_json::Value>(AgentOperation::PortVlan, "/ports/vlan", &body)
        })
        .await
        .map(|_| ())
    }

    async fn get_port_vlan(&self, port: &str) -> AgentResult<Option<u16>> {
        let (_, retry) = policy_for(AgentOperation::PortVlan);
        with_retry(retry, || self.call_no_body(AgentOperation::PortVlan, &format!("/ports/{}/vlan", port))).await
    }

    async fn reconcile_vxlan_ports(
        &self,
        valid_port_names: &[String],
        allow_empty: bool,
    ) -> AgentResult<ReconcileOverlayPortsResponse> {
        let (_, retry) = policy_for(AgentOperation::ReconcileVxlanPorts);
        let body = ReconcileOverlayPortsRequest {
            valid_port_names: valid_port_names.to_vec(),
            force: false,
            confirm: false,
            allow_empty,
        };
        with_retry(retry, || self.call(AgentOperation::ReconcileVxlanPorts, "/overlay/reconcile", &body)).await
    }

    async fn declare_port_state(&self, declaration: PortStateDeclaration) -> AgentResult<()> {
        let (_, retry) = policy_for(AgentOperation::PortStateDeclare);
        let body = serde_json::json!({
            "lab_id": declaration.lab_id,
            "pairings": declaration.pairings.iter().map(|p: &PortPairing| {
                serde_json::json!({ "port_a": p.port_a, "port_b": p.port_b, "vlan_tag": p.vlan_tag })
            }).collect::<Vec<_>>(),
        });
        with_retry(retry, || {
            self.call::<_, serde_json::Value>(AgentOperation::PortStateDeclare, "/ports/declare-state", &body)
        })
        .await
        .map(|_| ())
    }

    async fn open_console(&self, lab_id: LabId, node: &str) -> AgentResult<ConsoleStream> {
        let ws_url = self
            .url(&format!("/labs/{}/nodes/{}/console", lab_id, node))
            .replacen("http", "ws", 1);
        let (stream, _response) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| AgentClientError::Connection { host_id: self.host_id, job_id: None, source: e.to_string() })?;
        Ok(ConsoleStream::new(stream))
    }
}
