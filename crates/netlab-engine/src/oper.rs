// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Derived per-endpoint operational state (§4.9): the strict AND of seven
//! prerequisites, collapsed to a state plus a closed-set reason so the UI
//! can show "down: peer_host_offline" instead of a raw boolean.

use netlab_core::{
    CarrierState, EndpointOper, Host, LinkActualState, LinkState, NodeState, OperReason, OperState,
};
use netlab_storage::{Event, Repository};

use crate::error::EngineError;

fn transport_state(link_state: &LinkState) -> OperState {
    if !link_state.is_cross_host {
        return match link_state.actual_state {
            LinkActualState::Up => OperState::Up,
            LinkActualState::Error => OperState::Degraded,
            _ => OperState::Down,
        };
    }
    match (link_state.source_vxlan_attached, link_state.target_vxlan_attached, link_state.actual_state) {
        (true, true, LinkActualState::Up) => OperState::Up,
        (true, true, LinkActualState::Error) => OperState::Degraded,
        (true, false, _) | (false, true, _) => OperState::Degraded,
        _ => OperState::Down,
    }
}

/// One endpoint's prerequisites, evaluated in the fixed order §4.9 lists so
/// the first failing check is always the reported reason. `own_carrier` is
/// this endpoint's own reported link-layer carrier; `peer_carrier` is the
/// other side's.
#[allow(clippy::too_many_arguments)]
fn endpoint_oper(
    admin_up: bool,
    local_node: Option<&NodeState>,
    own_carrier: CarrierState,
    peer_host: Option<&Host>,
    peer_node: Option<&NodeState>,
    peer_carrier: CarrierState,
    transport: OperState,
) -> EndpointOper {
    use OperReason::*;

    if !admin_up {
        return EndpointOper { state: OperState::Down, reason: AdminDown };
    }
    let local_running = local_node.map(|n| n.actual_state == netlab_core::NodeActualState::Running).unwrap_or(false);
    if !local_running {
        return EndpointOper { state: OperState::Down, reason: LocalNodeDown };
    }
    if own_carrier != CarrierState::On {
        return EndpointOper { state: OperState::Down, reason: LocalInterfaceDown };
    }
    let peer_online = peer_host.map(|h| h.is_online()).unwrap_or(false);
    if !peer_online {
        return EndpointOper { state: OperState::Down, reason: PeerHostOffline };
    }
    let peer_running = peer_node.map(|n| n.actual_state == netlab_core::NodeActualState::Running).unwrap_or(false);
    if !peer_running {
        return EndpointOper { state: OperState::Down, reason: PeerNodeDown };
    }
    if peer_carrier != CarrierState::On {
        return EndpointOper { state: OperState::Down, reason: PeerInterfaceDown };
    }

    match transport {
        OperState::Up => EndpointOper { state: OperState::Up, reason: Unknown },
        OperState::Degraded => EndpointOper { state: OperState::Degraded, reason: TransportDegraded },
        OperState::Down => EndpointOper { state: OperState::Down, reason: TransportDown },
    }
}

/// Recomputes both endpoints' derived state for `link_state` against the
/// current repository snapshot, and — if anything changed — bumps
/// `oper_epoch` and emits the transition at info level for audit.
///
/// Returns whether the link's derived state actually changed.
pub async fn recompute_and_apply(repository: &Repository, link_state: &LinkState) -> Result<bool, EngineError> {
    let transport = transport_state(link_state);

    let source_node = repository.get_node_state(link_state.lab_id, link_state.source.node_id);
    let target_node = repository.get_node_state(link_state.lab_id, link_state.target.node_id);
    let target_host = link_state.target_host_id.and_then(|id| repository.get_host(&id));
    let source_host = link_state.source_host_id.and_then(|id| repository.get_host(&id));

    let source_oper = endpoint_oper(
        link_state.desired_state == netlab_core::LinkDesiredState::Up,
        source_node.as_ref(),
        link_state.source_carrier_state,
        target_host.as_ref(),
        target_node.as_ref(),
        link_state.target_carrier_state,
        transport,
    );
    let target_oper = endpoint_oper(
        link_state.desired_state == netlab_core::LinkDesiredState::Up,
        target_node.as_ref(),
        link_state.target_carrier_state,
        source_host.as_ref(),
        source_node.as_ref(),
        link_state.source_carrier_state,
        transport,
    );

    if source_oper == link_state.source_oper && target_oper == link_state.target_oper {
        return Ok(false);
    }

    let oper_epoch = link_state.oper_epoch + 1;
    tracing::info!(
        link_state_id = %link_state.id,
        old_source = ?link_state.source_oper,
        new_source = ?source_oper,
        old_target = ?link_state.target_oper,
        new_target = ?target_oper,
        oper_epoch,
        "link_oper_transition"
    );
    repository
        .apply(Event::LinkOperChanged { link_state_id: link_state.id, source_oper, target_oper, oper_epoch })
        .await?;
    Ok(true)
}
