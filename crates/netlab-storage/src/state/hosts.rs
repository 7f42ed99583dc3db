// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::MaterializedState;
use crate::event::Event;
use netlab_core::{Host, HostStatus, Placement};

pub(super) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::HostRegistered { host_id, address, capabilities, image_sync_strategy } => {
            state.hosts.entry(*host_id).or_insert_with(|| Host {
                id: *host_id,
                address: address.clone(),
                capabilities: capabilities.clone(),
                image_sync_strategy: image_sync_strategy.clone(),
                last_heartbeat: None,
                status: HostStatus::Online,
                resource_usage: serde_json::Value::Null,
                last_error: None,
                error_since: None,
            });
        }
        Event::HostHeartbeatReceived { host_id, received_at } => {
            if let Some(host) = state.hosts.get_mut(host_id) {
                // Assignment, not max(): an out-of-order replay of an older
                // heartbeat after a newer one has already landed would
                // otherwise move liveness backward. Callers are expected to
                // apply events in log order, which this dispatcher assumes
                // throughout.
                host.last_heartbeat = Some(*received_at);
                host.status = HostStatus::Online;
            }
        }
        Event::HostStatusChanged { host_id, status } => {
            if let Some(host) = state.hosts.get_mut(host_id) {
                host.status = *status;
            }
        }
        Event::HostErrorSet { host_id, last_error, error_since } => {
            if let Some(host) = state.hosts.get_mut(host_id) {
                host.last_error = last_error.clone();
                host.error_since = *error_since;
            }
        }
        Event::HostResourceUsageReported { host_id, resource_usage } => {
            if let Some(host) = state.hosts.get_mut(host_id) {
                host.resource_usage = resource_usage.clone();
            }
        }
        _ => {}
    }
}

pub(super) fn apply_placement(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::PlacementSet { lab_id, node_id, host_id } => {
            state.placements.insert((*lab_id, *node_id), Placement { lab_id: *lab_id, node_id: *node_id, host_id: *host_id });
        }
        Event::PlacementRemoved { lab_id, node_id } => {
            state.placements.remove(&(*lab_id, *node_id));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netlab_core::HostId;
    use serde_json::json;

    #[test]
    fn host_registered_is_idempotent() {
        let mut state = MaterializedState::default();
        let host_id = HostId::new();
        let event = Event::HostRegistered {
            host_id,
            address: "http://10.0.0.1:7000".into(),
            capabilities: json!({"ovs": true}),
            image_sync_strategy: "pull".into(),
        };
        state.apply_event(&event);
        state.apply_event(&event);
        assert_eq!(state.hosts.len(), 1);
    }

    #[test]
    fn heartbeat_marks_host_online() {
        let mut state = MaterializedState::default();
        let host_id = HostId::new();
        state.apply_event(&Event::HostRegistered {
            host_id,
            address: "http://10.0.0.1:7000".into(),
            capabilities: json!(null),
            image_sync_strategy: "pull".into(),
        });
        state.apply_event(&Event::HostStatusChanged { host_id, status: HostStatus::Offline });
        state.apply_event(&Event::HostHeartbeatReceived { host_id, received_at: 42 });

        let host = state.hosts.get(&host_id).unwrap();
        assert_eq!(host.status, HostStatus::Online);
        assert_eq!(host.last_heartbeat, Some(42));
    }
}
