// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AgentClient's error taxonomy: every RPC failure is tagged with the
//! agent and job it happened under (§4.2 "tags exceptions with agent id
//! and job id for telemetry") plus a category from the closed set.

use netlab_core::{ErrorCategory, HasCategory, HostId, JobId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentClientError {
    #[error("agent {host_id} unreachable: {source}")]
    Connection { host_id: HostId, job_id: Option<JobId>, source: String },

    #[error("agent {host_id} timed out after {elapsed_secs}s")]
    Timeout { host_id: HostId, job_id: Option<JobId>, elapsed_secs: u64 },

    #[error("agent {host_id} rejected credentials")]
    Authentication { host_id: HostId, job_id: Option<JobId> },

    #[error("agent {host_id} denied the operation")]
    Authorisation { host_id: HostId, job_id: Option<JobId> },

    #[error("agent {host_id} has no such resource: {message}")]
    NotFound { host_id: HostId, job_id: Option<JobId>, message: String },

    #[error("agent {host_id} rejected the request: {message}")]
    Validation { host_id: HostId, job_id: Option<JobId>, message: String },

    #[error("agent {host_id} reports a conflict: {message}")]
    Conflict { host_id: HostId, job_id: Option<JobId>, message: String },

    #[error("agent {host_id} returned a server error: {message}")]
    Server { host_id: HostId, job_id: Option<JobId>, message: String },

    #[error("agent {host_id} failed the operation: {message}")]
    Agent { host_id: HostId, job_id: Option<JobId>, message: String },

    #[error("agent {host_id}: unrecognised failure: {message}")]
    Unknown { host_id: HostId, job_id: Option<JobId>, message: String },

    #[error("no route configured for agent {0}")]
    NoRoute(HostId),
}

impl AgentClientError {
    pub fn host_id(&self) -> HostId {
        match self {
            AgentClientError::Connection { host_id, .. }
            | AgentClientError::Timeout { host_id, .. }
            | AgentClientError::Authentication { host_id, .. }
            | AgentClientError::Authorisation { host_id, .. }
            | AgentClientError::NotFound { host_id, .. }
            | AgentClientError::Validation { host_id, .. }
            | AgentClientError::Conflict { host_id, .. }
            | AgentClientError::Server { host_id, .. }
            | AgentClientError::Agent { host_id, .. }
            | AgentClientError::Unknown { host_id, .. } => *host_id,
            AgentClientError::NoRoute(host_id) => *host_id,
        }
    }

    pub fn job_id(&self) -> Option<JobId> {
        match self {
            AgentClientError::Connection { job_id, .. }
            | AgentClientError::Timeout { job_id, .. }
            | AgentClientError::Authentication { job_id, .. }
            | AgentClientError::Authorisation { job_id, .. }
            | AgentClientError::NotFound { job_id, .. }
            | AgentClientError::Validation { job_id, .. }
            | AgentClientError::Conflict { job_id, .. }
            | AgentClientError::Server { job_id, .. }
            | AgentClientError::Agent { job_id, .. }
            | AgentClientError::Unknown { job_id, .. } => *job_id,
            AgentClientError::NoRoute(_) => None,
        }
    }

    /// Tags `self` with the job this call was made on behalf of, for
    /// telemetry (§4.2). A no-op for variants that don't carry one.
    pub fn with_job(mut self, job_id: JobId) -> Self {
        match &mut self {
            AgentClientError::Connection { job_id: j, .. }
            | AgentClientError::Timeout { job_id: j, .. }
            | AgentClientError::Authentication { job_id: j, .. }
            | AgentClientError::Authorisation { job_id: j, .. }
            | AgentClientError::NotFound { job_id: j, .. }
            | AgentClientError::Validation { job_id: j, .. }
            | AgentClientError::Conflict { job_id: j, .. }
            | AgentClientError::Server { job_id: j, .. }
            | AgentClientError::Agent { job_id: j, .. }
            | AgentClientError::Unknown { job_id: j, .. } => *j = Some(job_id),
            AgentClientError::NoRoute(_) => {}
        }
        self
    }

    pub fn as_categorized(&self) -> netlab_core::CategorizedError {
        netlab_core::CategorizedError::new(self.category(), self.to_string())
            .with_detail("agent_id", self.host_id().to_string())
    }
}

impl HasCategory for AgentClientError {
    fn category(&self) -> ErrorCategory {
        match self {
            AgentClientError::Connection { .. } => ErrorCategory::Network,
            AgentClientError::Timeout { .. } => ErrorCategory::Timeout,
            AgentClientError::Authentication { .. } => ErrorCategory::Authentication,
            AgentClientError::Authorisation { .. } => ErrorCategory::Authorisation,
            AgentClientError::NotFound { .. } => ErrorCategory::NotFound,
            AgentClientError::Validation { .. } => ErrorCategory::Validation,
            AgentClientError::Conflict { .. } => ErrorCategory::Conflict,
            AgentClientError::Server { .. } => ErrorCategory::Server,
            AgentClientError::Agent { .. } | AgentClientError::NoRoute(_) => ErrorCategory::Agent,
            AgentClientError::Unknown { .. } => ErrorCategory::Unknown,
        }
    }
}
