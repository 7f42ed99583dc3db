// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Endpoint reservations: the unique-claim rows LinkReservations maintains
//! so at most one desired-up LinkState owns a given (lab, node, interface).

use crate::ids::{LabId, LinkStateId, NodeId, ReservationId};
use serde::{Deserialize, Serialize};

/// One claimed endpoint. The unique key is `(lab_id, node_id, normalised_interface)`;
/// a second row with the same key belonging to a different `link_state_id` is
/// a conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkEndpointReservation {
    pub id: ReservationId,
    pub lab_id: LabId,
    pub node_id: NodeId,
    pub normalised_interface: String,
    pub link_state_id: LinkStateId,
}

impl LinkEndpointReservation {
    pub fn key(&self) -> (LabId, NodeId, &str) {
        (self.lab_id, self.node_id, self.normalised_interface.as_str())
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct LinkEndpointReservationBuilder => LinkEndpointReservation {
        set { id: ReservationId = ReservationId::new() }
        set { lab_id: LabId = LabId::new() }
        set { node_id: NodeId = NodeId::new() }
        into { normalised_interface: String = "eth1" }
        set { link_state_id: LinkStateId = LinkStateId::new() }
    }
}

#[cfg(test)]
#[path = "reservation_tests.rs"]
mod tests;
