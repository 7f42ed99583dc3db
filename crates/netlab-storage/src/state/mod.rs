// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state derived from the event log.
//!
//! This is the in-process cache the hot reconciliation and broadcast paths
//! read from instead of round-tripping to the durable store on every tick.
//! It is kept consistent with the log by routing every mutation — live or
//! replayed — through [`MaterializedState::apply_event`].

mod hosts;
mod jobs;
mod labs;
mod links;

use crate::event::Event;
use netlab_core::{
    Host, HostId, InterfaceMapping, Job, JobId, Lab, LabId, Link, LinkEndpointReservation, LinkId,
    LinkState, LinkStateId, Node, NodeId, NodeState, Placement, ReservationId, TunnelId,
    VxlanTunnel,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything the control plane derives from the event log, keyed by id.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    pub labs: HashMap<LabId, Lab>,
    pub nodes: HashMap<NodeId, Node>,
    pub node_states: HashMap<(LabId, NodeId), NodeState>,
    pub links: HashMap<LinkId, Link>,
    pub link_states: HashMap<LinkStateId, LinkState>,
    pub reservations: HashMap<ReservationId, LinkEndpointReservation>,
    pub hosts: HashMap<HostId, Host>,
    pub placements: HashMap<(LabId, NodeId), Placement>,
    pub tunnels: HashMap<TunnelId, VxlanTunnel>,
    pub interface_mappings: HashMap<(LabId, NodeId, String), InterfaceMapping>,
    pub jobs: HashMap<JobId, Job>,
}

impl MaterializedState {
    pub fn get_lab(&self, id: &LabId) -> Option<&Lab> {
        self.labs.get(id)
    }

    pub fn get_job(&self, id: &JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn node_state(&self, lab_id: LabId, node_id: NodeId) -> Option<&NodeState> {
        self.node_states.get(&(lab_id, node_id))
    }

    pub fn node_states_for_lab(&self, lab_id: LabId) -> impl Iterator<Item = &NodeState> {
        self.node_states.values().filter(move |ns| ns.lab_id == lab_id)
    }

    pub fn link_states_for_lab(&self, lab_id: LabId) -> impl Iterator<Item = &LinkState> {
        self.link_states.values().filter(move |ls| ls.lab_id == lab_id)
    }

    pub fn reservation_for(&self, lab_id: LabId, node_id: NodeId, iface: &str) -> Option<&LinkEndpointReservation> {
        self.reservations.values().find(|r| r.lab_id == lab_id && r.node_id == node_id && r.normalised_interface == iface)
    }

    /// Applies `event` to derive state changes. Every handler is
    /// idempotent: applying the same event twice must produce the same
    /// state as applying it once, because this dispatcher runs both for
    /// immediate visibility and for WAL replay after restart.
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::LabCreated { .. } | Event::LabStateChanged { .. } | Event::LabDeleted { .. } => {
                labs::apply_lab(self, event)
            }

            Event::NodeDeclared { .. }
            | Event::NodeDesiredStateSet { .. }
            | Event::NodeActualStateChanged { .. }
            | Event::NodeEnforcementAttempted { .. }
            | Event::NodeEnforcementFailed { .. }
            | Event::NodeReadyChanged { .. }
            | Event::NodeRemoved { .. } => labs::apply_node(self, event),

            Event::LinkDeclared { .. }
            | Event::LinkStateCreated { .. }
            | Event::LinkDesiredStateSet { .. }
            | Event::LinkActualStateChanged { .. }
            | Event::LinkHostsAssigned { .. }
            | Event::LinkVniAssigned { .. }
            | Event::LinkVlanTagsAssigned { .. }
            | Event::LinkCarrierChanged { .. }
            | Event::LinkOperChanged { .. }
            | Event::LinkDefinitionOrphaned { .. }
            | Event::LinkErrorSet { .. }
            | Event::LinkStateRemoved { .. } => links::apply_link(self, event),

            Event::ReservationClaimed { .. } | Event::ReservationReleased { .. } => {
                links::apply_reservation(self, event)
            }

            Event::VxlanTunnelCreated { .. }
            | Event::VxlanTunnelStatusChanged { .. }
            | Event::VxlanTunnelOrphaned { .. }
            | Event::VxlanTunnelRemoved { .. } => links::apply_tunnel(self, event),

            Event::InterfaceMappingUpserted { .. } | Event::InterfaceMappingRemoved { .. } => {
                links::apply_interface_mapping(self, event)
            }

            Event::HostRegistered { .. }
            | Event::HostHeartbeatReceived { .. }
            | Event::HostStatusChanged { .. }
            | Event::HostErrorSet { .. }
            | Event::HostResourceUsageReported { .. } => hosts::apply(self, event),

            Event::PlacementSet { .. } | Event::PlacementRemoved { .. } => hosts::apply_placement(self, event),

            Event::JobCreated { .. }
            | Event::JobStarted { .. }
            | Event::JobStatusChanged { .. }
            | Event::JobRetried { .. }
            | Event::JobLogAppended { .. }
            | Event::JobAssignedAgent { .. } => jobs::apply(self, event),

            Event::Shutdown => {}
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
