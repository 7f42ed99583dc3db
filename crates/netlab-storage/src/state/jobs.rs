// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::MaterializedState;
use crate::event::Event;
use netlab_core::Job;

pub(super) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::JobCreated { job_id, lab_id, user, action } => {
            state.jobs.entry(*job_id).or_insert_with(|| Job {
                id: *job_id,
                lab_id: *lab_id,
                user: user.clone(),
                action: action.clone(),
                status: netlab_core::JobStatus::Queued,
                started_at: None,
                completed_at: None,
                retry_count: 0,
                log: None,
                assigned_agent: None,
            });
        }
        Event::JobStarted { job_id, started_at } => {
            if let Some(job) = state.jobs.get_mut(job_id) {
                if job.started_at.is_none() {
                    job.started_at = Some(*started_at);
                }
                job.status = netlab_core::JobStatus::Running;
            }
        }
        Event::JobStatusChanged { job_id, status, completed_at } => {
            if let Some(job) = state.jobs.get_mut(job_id) {
                job.status = *status;
                if let Some(completed_at) = completed_at {
                    job.completed_at = Some(*completed_at);
                }
            }
        }
        Event::JobRetried { job_id, retry_count } => {
            if let Some(job) = state.jobs.get_mut(job_id) {
                job.retry_count = *retry_count;
            }
        }
        Event::JobLogAppended { job_id, log } => {
            if let Some(job) = state.jobs.get_mut(job_id) {
                job.log = Some(log.clone());
            }
        }
        Event::JobAssignedAgent { job_id, assigned_agent } => {
            if let Some(job) = state.jobs.get_mut(job_id) {
                job.assigned_agent = *assigned_agent;
            }
        }
        _ => {}
    }
}
