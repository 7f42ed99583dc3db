// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The one inbound HTTP surface the core itself terminates: an agent's
//! `POST /callbacks/carrier-state` (§6). Everything else under "Agent
//! facing RPC" is controller-initiated; this one runs the other way.

use netlab_core::{CarrierState, LabId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CarrierStateCallback {
    pub lab_id: LabId,
    pub node: String,
    pub interface: String,
    pub carrier_state: CarrierState,
}
