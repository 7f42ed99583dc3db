// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LinkReservations (§4.5): guarantees that exactly one desired-up
//! LinkState claims each `(lab, node, normalised-interface)`.
//!
//! Interface normalisation (vendor names like `Ethernet1` down to a
//! canonical `eth1`) is injected at construction rather than hardcoded —
//! Open Question in §9, resolved here by taking a `Fn(&str) -> String` so
//! callers can plug in whatever vendor table their deployment needs
//! without this crate knowing about vendor naming conventions.

use std::sync::Arc;

use netlab_core::{LabId, LinkEndpointReservation, LinkState, LinkStateId, NodeId};
use netlab_storage::Repository;

use crate::error::EngineError;

pub type NormaliseFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Counts reported by [`LinkReservations::reconcile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileCounts {
    pub checked: u32,
    pub claimed: u32,
    pub released: u32,
    pub orphans_removed: u32,
    pub conflicts: u32,
}

/// Drift counts for diagnostics, without performing any repair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriftCounts {
    pub missing: u32,
    pub orphaned: u32,
    pub conflicts: u32,
    pub total: u32,
}

/// A sampled row plus why it was flagged, for operator-facing diagnostics.
#[derive(Debug, Clone)]
pub struct HealthSample {
    pub link_state_id: LinkStateId,
    pub node_id: NodeId,
    pub interface: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Default)]
pub struct HealthSnapshot {
    pub counts: DriftCounts,
    pub missing: Vec<HealthSample>,
    pub orphaned: Vec<HealthSample>,
    pub conflicts: Vec<HealthSample>,
}

pub struct LinkReservations {
    repository: Arc<Repository>,
    normalise: NormaliseFn,
}

impl LinkReservations {
    pub fn new(repository: Arc<Repository>, normalise: NormaliseFn) -> Self {
        Self { repository, normalise }
    }

    /// The default normalisation table: lowercases and strips the
    /// long-form vendor prefixes this control plane has seen so far
    /// (`Ethernet` → `eth`, `GigabitEthernet` → `eth`). Anything else
    /// passes through unchanged.
    pub fn default_normaliser() -> NormaliseFn {
        Arc::new(|raw: &str| {
            let lower = raw.to_ascii_lowercase();
            for prefix in ["gigabitethernet", "fastethernet", "ethernet"] {
                if let Some(rest) = lower.strip_prefix(prefix) {
                    return format!("eth{rest}");
                }
            }
            lower
        })
    }

    fn expected_endpoints(&self, link_state: &LinkState) -> Vec<(NodeId, String)> {
        vec![
            (link_state.source.node_id, (self.normalise)(&link_state.source.interface)),
            (link_state.target.node_id, (self.normalise)(&link_state.target.interface)),
        ]
    }

    /// Legacy-fallback conflict scan: compares endpoint tuples directly
    /// against other links in the same lab, for rows not yet migrated to
    /// reservations.
    fn legacy_conflicts(&self, lab_id: LabId, link_state: &LinkState) -> Vec<String> {
        let expected = self.expected_endpoints(link_state);
        let mut conflicts: Vec<String> = self
            .repository
            .link_states_for_lab(lab_id)
            .into_iter()
            .filter(|other| other.id != link_state.id && other.desired_state == netlab_core::LinkDesiredState::Up)
            .filter(|other| {
                let other_endpoints = self.expected_endpoints(other);
                expected.iter().any(|e| other_endpoints.contains(e))
            })
            .map(|other| other.link_name)
            .collect();
        conflicts.sort();
        conflicts
    }

    /// Claims `link_state`'s two endpoints. A fast-path no-op when the
    /// existing reservations already match; otherwise pre-checks for
    /// conflicts, releases any prior reservation this link owned, then
    /// claims both endpoints fresh.
    pub async fn claim(&self, link_state: &LinkState) -> Result<(), EngineError> {
        let expected = self.expected_endpoints(link_state);

        let already_matches = expected.iter().all(|(node_id, iface)| {
            self.repository
                .reservation_for(link_state.lab_id, *node_id, iface)
                .map(|r| r.link_state_id == link_state.id)
                .unwrap_or(false)
        });
        if already_matches {
            return Ok(());
        }

        let conflicts = self.legacy_conflicts(link_state.lab_id, link_state);
        if !conflicts.is_empty() {
            return Err(EngineError::ReservationConflict(conflicts.join(", ")));
        }

        self.release(link_state).await?;

        for (node_id, iface) in expected {
            self.repository
                .claim_reservation(link_state.lab_id, node_id, iface, link_state.id)
                .await
                .map_err(|e| match e {
                    netlab_storage::StorageError::Conflict(msg) => EngineError::ReservationConflict(msg),
                    other => other.into(),
                })?;
        }
        Ok(())
    }

    /// Releases every reservation owned by `link_state`.
    pub async fn release(&self, link_state: &LinkState) -> Result<(), EngineError> {
        for (node_id, iface) in self.expected_endpoints(link_state) {
            if let Some(existing) = self.repository.reservation_for(link_state.lab_id, node_id, &iface) {
                if existing.link_state_id == link_state.id {
                    self.repository.release_reservation(existing.id).await?;
                }
            }
        }
        Ok(())
    }

    /// `claim` if desired-up, else `release`.
    pub async fn sync(&self, link_state: &LinkState) -> Result<(), EngineError> {
        if link_state.desired_state == netlab_core::LinkDesiredState::Up {
            self.claim(link_state).await
        } else {
            self.release(link_state).await
        }
    }

    /// Periodic repair pass across every link in `lab_id`: drops
    /// reservations whose link no longer exists or no longer desires up,
    /// re-claims desired-up links missing a reservation, and reports
    /// aggregate drift counts.
    pub async fn reconcile(&self, lab_id: LabId) -> ReconcileCounts {
        let mut counts = ReconcileCounts::default();
        let link_states = self.repository.link_states_for_lab(lab_id);
        counts.checked = link_states.len() as u32;

        for link_state in &link_states {
            if link_state.desired_state == netlab_core::LinkDesiredState::Up {
                match self.claim(link_state).await {
                    Ok(()) => counts.claimed += 1,
                    Err(EngineError::ReservationConflict(_)) => counts.conflicts += 1,
                    Err(_) => {}
                }
            } else if let Ok(()) = self.release(link_state).await {
                counts.released += 1;
            }
        }

        let live_ids: std::collections::HashSet<LinkStateId> = link_states.iter().map(|l| l.id).collect();
        for reservation in self.repository.snapshot().reservations.into_values() {
            if reservation.lab_id != lab_id {
                continue;
            }
            if !live_ids.contains(&reservation.link_state_id) {
                if (self.repository.release_reservation(reservation.id).await).is_ok() {
                    counts.orphans_removed += 1;
                }
            }
        }

        counts
    }

    pub fn reservation_drift_counts(&self, lab_id: LabId) -> DriftCounts {
        self.health_snapshot(lab_id, 0).counts
    }

    /// Same counts as `reservation_drift_counts` plus up to `sample_limit`
    /// sampled rows per category, for an operator troubleshooting view.
    pub fn health_snapshot(&self, lab_id: LabId, sample_limit: usize) -> HealthSnapshot {
        let mut snapshot = HealthSnapshot::default();
        let link_states = self.repository.link_states_for_lab(lab_id);
        let live_ids: std::collections::HashMap<LinkStateId, &LinkState> =
            link_states.iter().map(|l| (l.id, l)).collect();

        for link_state in &link_states {
            if link_state.desired_state != netlab_core::LinkDesiredState::Up {
                continue;
            }
            for (node_id, iface) in self.expected_endpoints(link_state) {
                match self.repository.reservation_for(lab_id, node_id, &iface) {
                    None => {
                        snapshot.counts.missing += 1;
                        if snapshot.missing.len() < sample_limit {
                            snapshot.missing.push(HealthSample {
                                link_state_id: link_state.id,
                                node_id,
                                interface: iface,
                                reason: "expected reservation absent",
                            });
                        }
                    }
                    Some(r) if r.link_state_id != link_state.id => {
                        snapshot.counts.conflicts += 1;
                        if snapshot.conflicts.len() < sample_limit {
                            snapshot.conflicts.push(HealthSample {
                                link_state_id: link_state.id,
                                node_id,
                                interface: iface,
                                reason: "endpoint claimed by a different link",
                            });
                        }
                    }
                    Some(_) => {}
                }
            }
        }

        for reservation in self.repository.snapshot().reservations.into_values() {
            if reservation.lab_id != lab_id {
                continue;
            }
            snapshot.counts.total += 1;
            let orphaned = match live_ids.get(&reservation.link_state_id) {
                Some(link_state) => link_state.desired_state != netlab_core::LinkDesiredState::Up,
                None => true,
            };
            if orphaned {
                snapshot.counts.orphaned += 1;
                if snapshot.orphaned.len() < sample_limit {
                    snapshot.orphaned.push(HealthSample {
                        link_state_id: reservation.link_state_id,
                        node_id: reservation.node_id,
                        interface: reservation.normalised_interface.clone(),
                        reason: "owning link no longer desires up",
                    });
                }
            }
        }

        snapshot
    }
}

fn _assert_type(_: &LinkEndpointReservation) {}
