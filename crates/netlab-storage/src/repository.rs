// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The façade the rest of the control plane talks to: CRUD plus the two
//! specialised operations §4.1 calls for — row-level lock-with-skip-locked
//! for [`LinkState`] rows, and upsert-with-on-conflict for
//! [`InterfaceMapping`]/[`LinkEndpointReservation`].
//!
//! The durable store this stands in for is a relational database reached
//! through an async pool (out of scope: schema migrations, see
//! `crate::migration`). What's implemented here is the shape every caller
//! sees: a single-writer event log plus an in-process materialized cache
//! kept consistent by the same `apply_event` dispatcher used on replay.

use crate::event::Event;
use crate::state::MaterializedState;
use crate::wal::Wal;
use netlab_core::{
    Host, HostId, InterfaceMapping, Job, JobId, Lab, LabId, Link, LinkEndpointReservation, LinkId,
    LinkState, LinkStateId, Node, NodeId, NodeState, Placement, VxlanTunnel,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::StorageError;

/// Holds a [`LinkStateId`] row lock for the duration of a reconciler pass.
/// Dropping it releases the row for the next pass to claim.
pub struct LinkRowGuard {
    #[allow(dead_code)]
    guard: OwnedMutexGuard<()>,
    pub link_state_id: LinkStateId,
}

/// Single-writer event log plus the materialized cache it keeps current.
///
/// Reads against the cache never block on the writer: `MaterializedState`
/// access takes a `parking_lot::RwLock` read guard, while mutation funnels
/// through `apply` which holds the WAL mutex for the duration of the
/// append + in-memory application.
pub struct Repository {
    state: RwLock<MaterializedState>,
    wal: Mutex<Wal>,
    link_locks: parking_lot::Mutex<HashMap<LinkStateId, Arc<Mutex<()>>>>,
}

impl Repository {
    /// Opens (or creates) the event log at `wal_path` and replays it into a
    /// fresh `MaterializedState`.
    pub fn open(wal_path: impl AsRef<Path>, processed_seq: u64) -> Result<Self, StorageError> {
        let mut wal = Wal::open(wal_path, processed_seq)?;
        let mut state = MaterializedState::default();
        for entry in wal.entries_after(0)? {
            state.apply_event(&entry.event);
        }
        let last_seq = wal.write_seq();
        wal.mark_processed(last_seq);

        Ok(Self {
            state: RwLock::new(state),
            wal: Mutex::new(wal),
            link_locks: parking_lot::Mutex::new(HashMap::new()),
        })
    }

    /// Appends `event` to the log and applies it to the cache. This is the
    /// only way callers mutate state; the two always move together.
    pub async fn apply(&self, event: Event) -> Result<(), StorageError> {
        let mut wal = self.wal.lock().await;
        let seq = wal.append(&event)?;
        if wal.needs_flush() {
            wal.flush()?;
        }
        wal.mark_processed(seq);
        drop(wal);

        self.state.write().apply_event(&event);
        Ok(())
    }

    pub fn get_lab(&self, id: &LabId) -> Option<Lab> {
        self.state.read().get_lab(id).cloned()
    }

    pub fn all_labs(&self) -> Vec<Lab> {
        self.state.read().labs.values().cloned().collect()
    }

    pub fn get_node(&self, id: &NodeId) -> Option<Node> {
        self.state.read().nodes.get(id).cloned()
    }

    pub fn get_node_state(&self, lab_id: LabId, node_id: NodeId) -> Option<NodeState> {
        self.state.read().node_state(lab_id, node_id).cloned()
    }

    pub fn node_states_for_lab(&self, lab_id: LabId) -> Vec<NodeState> {
        self.state.read().node_states_for_lab(lab_id).cloned().collect()
    }

    pub fn get_link(&self, id: &LinkId) -> Option<Link> {
        self.state.read().links.get(id).cloned()
    }

    pub fn get_link_state(&self, id: &LinkStateId) -> Option<LinkState> {
        self.state.read().link_states.get(id).cloned()
    }

    pub fn link_states_for_lab(&self, lab_id: LabId) -> Vec<LinkState> {
        self.state.read().link_states_for_lab(lab_id).cloned().collect()
    }

    pub fn nodes_for_lab(&self, lab_id: LabId) -> Vec<Node> {
        self.state.read().nodes.values().filter(|n| n.lab_id == lab_id).cloned().collect()
    }

    pub fn links_for_lab(&self, lab_id: LabId) -> Vec<Link> {
        self.state.read().links.values().filter(|l| l.lab_id == lab_id).cloned().collect()
    }

    pub fn get_host(&self, id: &HostId) -> Option<Host> {
        self.state.read().hosts.get(id).cloned()
    }

    pub fn all_hosts(&self) -> Vec<Host> {
        self.state.read().hosts.values().cloned().collect()
    }

    pub fn get_placement(&self, lab_id: LabId, node_id: NodeId) -> Option<Placement> {
        self.state.read().placements.get(&(lab_id, node_id)).cloned()
    }

    pub fn placements_for_lab(&self, lab_id: LabId) -> Vec<Placement> {
        self.state.read().placements.values().filter(|p| p.lab_id == lab_id).cloned().collect()
    }

    pub fn get_job(&self, id: &JobId) -> Option<Job> {
        self.state.read().get_job(id).cloned()
    }

    pub fn all_jobs(&self) -> Vec<Job> {
        self.state.read().jobs.values().cloned().collect()
    }

    pub fn jobs_for_lab(&self, lab_id: LabId) -> Vec<Job> {
        self.state.read().jobs.values().filter(|j| j.lab_id == lab_id).cloned().collect()
    }

    pub fn get_interface_mapping(&self, lab_id: LabId, node_id: NodeId, iface: &str) -> Option<InterfaceMapping> {
        self.state.read().interface_mappings.get(&(lab_id, node_id, iface.to_string())).cloned()
    }

    pub fn get_vxlan_tunnel(&self, id: &netlab_core::TunnelId) -> Option<VxlanTunnel> {
        self.state.read().tunnels.get(id).cloned()
    }

    pub fn all_vxlan_tunnels(&self) -> Vec<VxlanTunnel> {
        self.state.read().tunnels.values().cloned().collect()
    }

    pub fn reservation_for(&self, lab_id: LabId, node_id: NodeId, iface: &str) -> Option<LinkEndpointReservation> {
        self.state.read().reservation_for(lab_id, node_id, iface).cloned()
    }

    /// Snapshots the whole cache, for WSGateway's initial-state frame.
    pub fn snapshot(&self) -> MaterializedState {
        self.state.read().clone()
    }

    /// Non-blocking row-level claim on a LinkState, modelling
    /// `SELECT ... FOR UPDATE SKIP LOCKED`: returns `None` instead of
    /// waiting if another reconciler pass already holds the row, so
    /// overlapping passes partition the work instead of serialising on it.
    pub fn try_lock_link_state(&self, id: LinkStateId) -> Option<LinkRowGuard> {
        let lock = {
            let mut locks = self.link_locks.lock();
            locks.entry(id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        let guard = lock.try_lock_owned().ok()?;
        Some(LinkRowGuard { guard, link_state_id: id })
    }

    /// Blocking variant for callers (e.g. a single-lab LiveEdit batch) that
    /// must wait rather than skip.
    pub async fn lock_link_state(&self, id: LinkStateId) -> LinkRowGuard {
        let lock = {
            let mut locks = self.link_locks.lock();
            locks.entry(id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        let guard = lock.lock_owned().await;
        LinkRowGuard { guard, link_state_id: id }
    }

    /// Upserts an InterfaceMapping (ON CONFLICT DO UPDATE on its `(lab,
    /// node, linux_interface)` key): always succeeds, last writer wins.
    pub async fn upsert_interface_mapping(&self, mapping: InterfaceMapping) -> Result<(), StorageError> {
        self.apply(Event::InterfaceMappingUpserted {
            lab_id: mapping.lab_id,
            node_id: mapping.node_id,
            linux_interface: mapping.linux_interface,
            ovs_port: mapping.ovs_port,
            bridge: mapping.bridge,
            vlan_tag: mapping.vlan_tag,
            vendor_interface_name: mapping.vendor_interface_name,
            last_verified_at: mapping.last_verified_at,
        })
        .await
    }

    /// Claims a `(lab, node, normalised_interface)` reservation for
    /// `link_state_id`. Idempotent if the same link state already holds it;
    /// a conflict if a different one does — the cross-row invariant in
    /// §3's invariant 1 checked transactionally against the read above.
    pub async fn claim_reservation(
        &self,
        lab_id: LabId,
        node_id: NodeId,
        normalised_interface: String,
        link_state_id: LinkStateId,
    ) -> Result<netlab_core::ReservationId, StorageError> {
        if let Some(existing) = self.reservation_for(lab_id, node_id, &normalised_interface) {
            if existing.link_state_id == link_state_id {
                return Ok(existing.id);
            }
            return Err(StorageError::Conflict(format!(
                "endpoint {node_id}:{normalised_interface} already claimed by {}",
                existing.link_state_id
            )));
        }

        let reservation_id = netlab_core::ReservationId::new();
        self.apply(Event::ReservationClaimed {
            reservation_id,
            lab_id,
            node_id,
            normalised_interface,
            link_state_id,
        })
        .await?;
        Ok(reservation_id)
    }

    pub async fn release_reservation(&self, reservation_id: netlab_core::ReservationId) -> Result<(), StorageError> {
        self.apply(Event::ReservationReleased { reservation_id }).await
    }
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
