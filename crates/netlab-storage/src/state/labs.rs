// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::MaterializedState;
use crate::event::Event;
use netlab_core::{Lab, LabState, Node, NodeActualState, NodeState};

pub(super) fn apply_lab(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::LabCreated { lab_id, name, owner, provider, workspace_path } => {
            state.labs.entry(*lab_id).or_insert_with(|| Lab {
                id: *lab_id,
                name: name.clone(),
                owner: owner.clone(),
                provider: *provider,
                declared_state: LabState::Stopped,
                workspace_path: workspace_path.clone(),
                default_agent: None,
            });
        }
        Event::LabStateChanged { lab_id, state: new_state } => {
            if let Some(lab) = state.labs.get_mut(lab_id) {
                lab.declared_state = *new_state;
            }
        }
        Event::LabDeleted { lab_id } => {
            state.labs.remove(lab_id);
            state.nodes.retain(|_, n| n.lab_id != *lab_id);
            state.node_states.retain(|(lab, _), _| lab != lab_id);
            state.links.retain(|_, l| l.lab_id != *lab_id);
            state.link_states.retain(|_, ls| ls.lab_id != *lab_id);
            state.reservations.retain(|_, r| r.lab_id != *lab_id);
            state.placements.retain(|(lab, _), _| lab != lab_id);
            state.tunnels.retain(|_, t| t.lab_id != *lab_id);
            state.interface_mappings.retain(|(lab, _, _), _| lab != lab_id);
            state.jobs.retain(|_, j| j.lab_id != *lab_id);
        }
        _ => {}
    }
}

pub(super) fn apply_node(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::NodeDeclared { lab_id, node_id, display_name, container_name, kind, image_ref } => {
            state.nodes.entry(*node_id).or_insert_with(|| Node {
                id: *node_id,
                lab_id: *lab_id,
                display_name: display_name.clone(),
                container_name: container_name.clone(),
                kind: kind.clone(),
                image_ref: image_ref.clone(),
            });
            state.node_states.entry((*lab_id, *node_id)).or_insert_with(|| NodeState {
                lab_id: *lab_id,
                node_id: *node_id,
                desired_state: netlab_core::NodeDesiredState::Stopped,
                actual_state: NodeActualState::Undeployed,
                is_ready: false,
                enforcement_attempts: 0,
                enforcement_failed_at: None,
                host_id: None,
                error_message: None,
                image_sync_status: None,
                image_sync_message: None,
                entered_state_at: 0,
            });
        }
        Event::NodeDesiredStateSet { lab_id, node_id, desired_state } => {
            if let Some(ns) = state.node_states.get_mut(&(*lab_id, *node_id)) {
                ns.desired_state = *desired_state;
            }
        }
        Event::NodeActualStateChanged { lab_id, node_id, actual_state, entered_state_at } => {
            if let Some(ns) = state.node_states.get_mut(&(*lab_id, *node_id)) {
                ns.actual_state = *actual_state;
                ns.entered_state_at = *entered_state_at;
                if *actual_state != NodeActualState::Error {
                    ns.error_message = None;
                }
            }
        }
        Event::NodeEnforcementAttempted { lab_id, node_id, attempts } => {
            if let Some(ns) = state.node_states.get_mut(&(*lab_id, *node_id)) {
                ns.enforcement_attempts = *attempts;
            }
        }
        Event::NodeEnforcementFailed { lab_id, node_id, failed_at, error_message } => {
            if let Some(ns) = state.node_states.get_mut(&(*lab_id, *node_id)) {
                ns.enforcement_failed_at = Some(*failed_at);
                ns.error_message = Some(error_message.clone());
            }
        }
        Event::NodeReadyChanged { lab_id, node_id, is_ready } => {
            if let Some(ns) = state.node_states.get_mut(&(*lab_id, *node_id)) {
                ns.is_ready = *is_ready;
            }
        }
        Event::NodeRemoved { lab_id, node_id } => {
            state.nodes.remove(node_id);
            state.node_states.remove(&(*lab_id, *node_id));
            state.placements.remove(&(*lab_id, *node_id));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netlab_core::{LabId, LabProvider, NodeDesiredState, NodeId, NodeKind};

    fn lab_created(lab_id: LabId) -> Event {
        Event::LabCreated {
            lab_id,
            name: "demo".into(),
            owner: "alice".into(),
            provider: LabProvider::Docker,
            workspace_path: "/var/lib/netlab/demo".into(),
        }
    }

    #[test]
    fn lab_created_is_idempotent() {
        let mut state = MaterializedState::default();
        let lab_id = LabId::new();
        let event = lab_created(lab_id);
        state.apply_event(&event);
        state.apply_event(&event);
        assert_eq!(state.labs.len(), 1);
    }

    #[test]
    fn lab_deleted_cascades_to_owned_entities() {
        let mut state = MaterializedState::default();
        let lab_id = LabId::new();
        let node_id = NodeId::new();
        state.apply_event(&lab_created(lab_id));
        state.apply_event(&Event::NodeDeclared {
            lab_id,
            node_id,
            display_name: "r1".into(),
            container_name: "r1".into(),
            kind: NodeKind::Linux,
            image_ref: "alpine".into(),
        });
        assert_eq!(state.nodes.len(), 1);

        state.apply_event(&Event::LabDeleted { lab_id });
        assert!(state.labs.is_empty());
        assert!(state.nodes.is_empty());
        assert!(state.node_states.is_empty());
    }

    #[test]
    fn node_desired_state_set_is_idempotent() {
        let mut state = MaterializedState::default();
        let lab_id = LabId::new();
        let node_id = NodeId::new();
        state.apply_event(&lab_created(lab_id));
        state.apply_event(&Event::NodeDeclared {
            lab_id,
            node_id,
            display_name: "r1".into(),
            container_name: "r1".into(),
            kind: NodeKind::Linux,
            image_ref: "alpine".into(),
        });

        let set_running =
            Event::NodeDesiredStateSet { lab_id, node_id, desired_state: NodeDesiredState::Running };
        state.apply_event(&set_running);
        state.apply_event(&set_running);

        let ns = state.node_state(lab_id, node_id).unwrap();
        assert_eq!(ns.desired_state, NodeDesiredState::Running);
    }

    #[test]
    fn actual_state_change_clears_error_message_when_leaving_error() {
        let mut state = MaterializedState::default();
        let lab_id = LabId::new();
        let node_id = NodeId::new();
        state.apply_event(&lab_created(lab_id));
        state.apply_event(&Event::NodeDeclared {
            lab_id,
            node_id,
            display_name: "r1".into(),
            container_name: "r1".into(),
            kind: NodeKind::Linux,
            image_ref: "alpine".into(),
        });
        state.apply_event(&Event::NodeEnforcementFailed {
            lab_id,
            node_id,
            failed_at: 1,
            error_message: "boom".into(),
        });
        state.apply_event(&Event::NodeActualStateChanged {
            lab_id,
            node_id,
            actual_state: NodeActualState::Error,
            entered_state_at: 2,
        });
        assert!(state.node_state(lab_id, node_id).unwrap().error_message.is_some());

        state.apply_event(&Event::NodeActualStateChanged {
            lab_id,
            node_id,
            actual_state: NodeActualState::Pending,
            entered_state_at: 3,
        });
        assert!(state.node_state(lab_id, node_id).unwrap().error_message.is_none());
    }
}
