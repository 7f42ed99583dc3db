// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn action_strings_match_wire_format() {
    let node_id = NodeId::new();
    assert_eq!(JobAction::Up.as_action_string(), "up");
    assert_eq!(JobAction::Down.as_action_string(), "down");
    assert_eq!(JobAction::Sync.as_action_string(), "sync");
    assert_eq!(
        JobAction::SyncNode { node_id }.as_action_string(),
        format!("sync:node:{node_id}")
    );
    assert_eq!(
        JobAction::NodeAction { node_id, op: "restart".into() }.as_action_string(),
        format!("node:{node_id}:restart")
    );
    assert_eq!(JobAction::AgentUpdate.as_action_string(), "agent-update");
}

#[test]
fn deadlines_match_action_kind() {
    assert_eq!(JobAction::Up.deadline_secs(), 1020);
    assert_eq!(JobAction::Down.deadline_secs(), 360);
    assert_eq!(JobAction::Sync.deadline_secs(), 660);
    assert_eq!(JobAction::NodeAction { node_id: NodeId::new(), op: "x".into() }.deadline_secs(), 300);
}

#[test]
fn new_job_starts_queued_with_no_timestamps() {
    let job = Job::new(LabId::new(), "alice", JobAction::Up);
    assert_eq!(job.status, JobStatus::Queued);
    assert!(job.started_at.is_none());
    assert!(job.completed_at.is_none());
    assert_eq!(job.retry_count, 0);
}

#[test]
fn terminal_statuses_are_correctly_classified() {
    assert!(JobStatus::Completed.is_terminal());
    assert!(JobStatus::CompletedWithWarnings.is_terminal());
    assert!(JobStatus::Failed.is_terminal());
    assert!(JobStatus::Cancelled.is_terminal());
    assert!(!JobStatus::Queued.is_terminal());
    assert!(!JobStatus::Running.is_terminal());
}
