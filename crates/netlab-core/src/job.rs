// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Long-running lab-scoped jobs.

use crate::ids::{HostId, JobId, LabId, NodeId};
use serde::{Deserialize, Serialize};

/// What a job does. `NodeAction`'s inner string is the agent-facing verb
/// (e.g. `"restart"`); `SyncNode`/`NodeAction` both carry the node id their
/// action string embeds (`sync:node:<id>`, `node:<name>:<op>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum JobAction {
    Up,
    Down,
    Sync,
    SyncNode { node_id: NodeId },
    NodeAction { node_id: NodeId, op: String },
    AgentUpdate,
}

impl JobAction {
    /// The wire-format action string Job.action carries.
    pub fn as_action_string(&self) -> String {
        match self {
            JobAction::Up => "up".to_string(),
            JobAction::Down => "down".to_string(),
            JobAction::Sync => "sync".to_string(),
            JobAction::SyncNode { node_id } => format!("sync:node:{node_id}"),
            JobAction::NodeAction { node_id, op } => format!("node:{node_id}:{op}"),
            JobAction::AgentUpdate => "agent-update".to_string(),
        }
    }

    /// Deadline in seconds for this action kind, used by the JobRunner
    /// supervisor to flip overdue jobs to `failed`.
    pub fn deadline_secs(&self) -> u64 {
        match self {
            JobAction::Up => 1020,
            JobAction::Down => 360,
            JobAction::Sync | JobAction::SyncNode { .. } => 660,
            JobAction::NodeAction { .. } => 300,
            JobAction::AgentUpdate => 300,
        }
    }
}

crate::simple_display! {
    JobStatus {
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        CompletedWithWarnings => "completed_with_warnings",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// Job lifecycle status. `Completed` and `CompletedWithWarnings` are kept
/// distinct even though nothing downstream of the
/// job record collapses them back together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    CompletedWithWarnings,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed
                | JobStatus::CompletedWithWarnings
                | JobStatus::Failed
                | JobStatus::Cancelled
        )
    }
}

/// Where a job's log output lives: inlined for small messages, or a
/// filesystem path for larger output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum JobLog {
    Inline(String),
    Path(String),
}

/// A single long-running, lab-scoped unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub lab_id: LabId,
    pub user: String,
    pub action: JobAction,
    pub status: JobStatus,
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
    pub retry_count: u32,
    pub log: Option<JobLog>,
    pub assigned_agent: Option<HostId>,
}

impl Job {
    pub fn new(lab_id: LabId, user: impl Into<String>, action: JobAction) -> Self {
        Self {
            id: JobId::new(),
            lab_id,
            user: user.into(),
            action,
            status: JobStatus::Queued,
            started_at: None,
            completed_at: None,
            retry_count: 0,
            log: None,
            assigned_agent: None,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct JobBuilder => Job {
        set { id: JobId = JobId::new() }
        set { lab_id: LabId = LabId::new() }
        into { user: String = "operator" }
        set { action: JobAction = JobAction::Up }
        set { status: JobStatus = JobStatus::Queued }
        option { started_at: u64 = None }
        option { completed_at: u64 = None }
        set { retry_count: u32 = 0 }
        option { log: JobLog = None }
        option { assigned_agent: HostId = None }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
