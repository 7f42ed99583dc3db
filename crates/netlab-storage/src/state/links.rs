// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::MaterializedState;
use crate::event::Event;
use netlab_core::{
    CarrierState, EndpointOper, InterfaceMapping, Link, LinkDesiredState, LinkEndpointReservation,
    LinkState, TunnelStatus, VxlanTunnel,
};

pub(super) fn apply_link(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::LinkDeclared { lab_id, link_id, link_name, source, target, mtu } => {
            state.links.entry(*link_id).or_insert_with(|| Link {
                id: *link_id,
                lab_id: *lab_id,
                link_name: link_name.clone(),
                source: source.clone(),
                target: target.clone(),
                mtu: *mtu,
            });
        }
        Event::LinkStateCreated { lab_id, link_state_id, link_definition_id, link_name, source, target } => {
            state.link_states.entry(*link_state_id).or_insert_with(|| LinkState {
                id: *link_state_id,
                lab_id: *lab_id,
                link_definition_id: *link_definition_id,
                link_name: link_name.clone(),
                source: source.clone(),
                target: target.clone(),
                desired_state: LinkDesiredState::Up,
                actual_state: netlab_core::LinkActualState::Unknown,
                is_cross_host: false,
                source_host_id: None,
                target_host_id: None,
                source_vxlan_attached: false,
                target_vxlan_attached: false,
                source_carrier_state: CarrierState::Off,
                target_carrier_state: CarrierState::Off,
                vni: None,
                source_vlan_tag: None,
                target_vlan_tag: None,
                source_oper: EndpointOper::default(),
                target_oper: EndpointOper::default(),
                oper_epoch: 0,
                error_message: None,
            });
        }
        Event::LinkDesiredStateSet { link_state_id, desired_state } => {
            if let Some(ls) = state.link_states.get_mut(link_state_id) {
                ls.desired_state = *desired_state;
            }
        }
        Event::LinkActualStateChanged { link_state_id, actual_state } => {
            if let Some(ls) = state.link_states.get_mut(link_state_id) {
                ls.actual_state = *actual_state;
            }
        }
        Event::LinkHostsAssigned { link_state_id, source_host_id, target_host_id, is_cross_host } => {
            if let Some(ls) = state.link_states.get_mut(link_state_id) {
                ls.source_host_id = *source_host_id;
                ls.target_host_id = *target_host_id;
                ls.is_cross_host = *is_cross_host;
            }
        }
        Event::LinkVniAssigned { link_state_id, vni } => {
            if let Some(ls) = state.link_states.get_mut(link_state_id) {
                ls.vni = Some(*vni);
            }
        }
        Event::LinkVlanTagsAssigned { link_state_id, source_vlan_tag, target_vlan_tag } => {
            if let Some(ls) = state.link_states.get_mut(link_state_id) {
                ls.source_vlan_tag = *source_vlan_tag;
                ls.target_vlan_tag = *target_vlan_tag;
            }
        }
        Event::LinkVxlanAttachmentChanged { link_state_id, source_vxlan_attached, target_vxlan_attached } => {
            if let Some(ls) = state.link_states.get_mut(link_state_id) {
                ls.source_vxlan_attached = *source_vxlan_attached;
                ls.target_vxlan_attached = *target_vxlan_attached;
            }
        }
        Event::LinkCarrierChanged { link_state_id, source_carrier_state, target_carrier_state } => {
            if let Some(ls) = state.link_states.get_mut(link_state_id) {
                ls.source_carrier_state = *source_carrier_state;
                ls.target_carrier_state = *target_carrier_state;
            }
        }
        Event::LinkOperChanged { link_state_id, source_oper, target_oper, oper_epoch } => {
            if let Some(ls) = state.link_states.get_mut(link_state_id) {
                // Guard on the epoch, not on `!=`, so replaying the same
                // event twice can't bump past the recorded epoch.
                if *oper_epoch > ls.oper_epoch {
                    ls.source_oper = *source_oper;
                    ls.target_oper = *target_oper;
                    ls.oper_epoch = *oper_epoch;
                }
            }
        }
        Event::LinkDefinitionOrphaned { link_state_id } => {
            if let Some(ls) = state.link_states.get_mut(link_state_id) {
                ls.link_definition_id = None;
            }
        }
        Event::LinkErrorSet { link_state_id, error_message } => {
            if let Some(ls) = state.link_states.get_mut(link_state_id) {
                ls.error_message = error_message.clone();
            }
        }
        Event::LinkStateRemoved { link_state_id } => {
            state.link_states.remove(link_state_id);
            state.reservations.retain(|_, r| r.link_state_id != *link_state_id);
        }
        _ => {}
    }
}

pub(super) fn apply_reservation(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::ReservationClaimed { reservation_id, lab_id, node_id, normalised_interface, link_state_id } => {
            state.reservations.entry(*reservation_id).or_insert_with(|| LinkEndpointReservation {
                id: *reservation_id,
                lab_id: *lab_id,
                node_id: *node_id,
                normalised_interface: normalised_interface.clone(),
                link_state_id: *link_state_id,
            });
        }
        Event::ReservationReleased { reservation_id } => {
            state.reservations.remove(reservation_id);
        }
        _ => {}
    }
}

pub(super) fn apply_tunnel(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::VxlanTunnelCreated {
            tunnel_id,
            lab_id,
            link_state_id,
            agent_a,
            agent_b,
            vni,
            port_name,
            created_at,
        } => {
            state.tunnels.entry(*tunnel_id).or_insert_with(|| VxlanTunnel {
                id: *tunnel_id,
                lab_id: *lab_id,
                link_state_id: *link_state_id,
                agent_a: *agent_a,
                agent_b: *agent_b,
                vni: *vni,
                port_name: port_name.clone(),
                status: TunnelStatus::Pending,
                cleanup_reason: None,
                created_at: *created_at,
                updated_at: *created_at,
            });
        }
        Event::VxlanTunnelStatusChanged { tunnel_id, status, cleanup_reason, updated_at } => {
            if let Some(t) = state.tunnels.get_mut(tunnel_id) {
                t.status = *status;
                t.cleanup_reason = cleanup_reason.clone();
                t.updated_at = *updated_at;
            }
        }
        Event::VxlanTunnelOrphaned { tunnel_id, updated_at } => {
            if let Some(t) = state.tunnels.get_mut(tunnel_id) {
                t.link_state_id = None;
                t.updated_at = *updated_at;
            }
        }
        Event::VxlanTunnelRemoved { tunnel_id } => {
            state.tunnels.remove(tunnel_id);
        }
        _ => {}
    }
}

pub(super) fn apply_interface_mapping(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::InterfaceMappingUpserted {
            lab_id,
            node_id,
            linux_interface,
            ovs_port,
            bridge,
            vlan_tag,
            vendor_interface_name,
            last_verified_at,
        } => {
            let key = (*lab_id, *node_id, linux_interface.clone());
            state.interface_mappings.insert(
                key,
                InterfaceMapping {
                    lab_id: *lab_id,
                    node_id: *node_id,
                    linux_interface: linux_interface.clone(),
                    ovs_port: ovs_port.clone(),
                    bridge: bridge.clone(),
                    vlan_tag: *vlan_tag,
                    vendor_interface_name: vendor_interface_name.clone(),
                    last_verified_at: *last_verified_at,
                },
            );
        }
        Event::InterfaceMappingRemoved { lab_id, node_id, linux_interface } => {
            state.interface_mappings.remove(&(*lab_id, *node_id, linux_interface.clone()));
        }
        _ => {}
    }
}
