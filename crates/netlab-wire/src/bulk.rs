// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bulk node desired-state update (§6): `{state: "running"|"stopped"}` in,
//! `{affected, skipped_transitional, already_in_state}` out (S3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesiredStateWire {
    Running,
    Stopped,
}

impl From<DesiredStateWire> for netlab_core::NodeDesiredState {
    fn from(value: DesiredStateWire) -> Self {
        match value {
            DesiredStateWire::Running => netlab_core::NodeDesiredState::Running,
            DesiredStateWire::Stopped => netlab_core::NodeDesiredState::Stopped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkStateRequest {
    pub state: DesiredStateWire,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BulkStateResponse {
    pub affected: u32,
    pub skipped_transitional: u32,
    pub already_in_state: u32,
}
