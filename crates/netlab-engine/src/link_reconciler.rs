// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LinkReconciler (§4.7): a periodic pass that verifies every link still
//! matches what LinkState says it should be, repairs it through an
//! escalating ladder when it doesn't, and sweeps duplicate tunnels,
//! orphaned rows, and deleted-link overlays that LinkManager's happy-path
//! deploy/destroy never touches.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use netlab_core::{HostId, LabId, LinkActualState, LinkDesiredState, LinkState, LinkStateId};
use netlab_adapters::{PortStateDeclaration, RuntimeRouter};
use netlab_storage::{Event, Repository};
use netlab_wire::PortPairing;

use crate::error::EngineError;
use crate::link_manager::LinkManager;
use crate::oper;

pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub checked: u32,
    pub verified_ok: u32,
    pub repaired: u32,
    pub failed: u32,
    pub skipped_offline: u32,
    pub duplicate_tunnels_removed: u32,
    pub orphans_removed: u32,
    pub deleted_links_torn_down: u32,
    pub same_host_links_converged: u32,
}

pub struct LinkReconciler<C: netlab_core::Clock> {
    repository: Arc<Repository>,
    router: Arc<RuntimeRouter>,
    link_manager: Arc<LinkManager<C>>,
}

impl<C: netlab_core::Clock> LinkReconciler<C> {
    pub fn new(repository: Arc<Repository>, router: Arc<RuntimeRouter>, link_manager: Arc<LinkManager<C>>) -> Self {
        Self { repository, router, link_manager }
    }

    fn required_hosts_online(&self, link_state: &LinkState) -> bool {
        [link_state.source_host_id, link_state.target_host_id]
            .into_iter()
            .flatten()
            .all(|id| self.repository.get_host(&id).map(|h| h.is_online()).unwrap_or(false))
    }

    fn needs_attention(link_state: &LinkState) -> bool {
        if link_state.desired_state != LinkDesiredState::Up {
            return false;
        }
        matches!(link_state.actual_state, LinkActualState::Up | LinkActualState::Error)
            || (link_state.is_cross_host
                && (!link_state.source_vxlan_attached || !link_state.target_vxlan_attached))
    }

    /// One pass over every link in `lab_id` that needs attention.
    pub async fn reconcile_lab(&self, lab_id: LabId) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for link_state in self.repository.link_states_for_lab(lab_id) {
            if !Self::needs_attention(&link_state) {
                continue;
            }
            report.checked += 1;

            if !self.required_hosts_online(&link_state) {
                report.skipped_offline += 1;
                continue;
            }

            let Some(_guard) = self.repository.try_lock_link_state(link_state.id) else {
                continue;
            };

            match self.verify(&link_state).await {
                Ok(true) => {
                    report.verified_ok += 1;
                }
                Ok(false) => match self.repair(&link_state).await {
                    Ok(()) => report.repaired += 1,
                    Err(_) => report.failed += 1,
                },
                Err(_) => report.failed += 1,
            }

            if let Some(refreshed) = self.repository.get_link_state(&link_state.id) {
                let _ = oper::recompute_and_apply(&self.repository, &refreshed).await;
            }
        }

        report.duplicate_tunnels_removed = self.remove_duplicate_tunnels(lab_id).await;
        report.orphans_removed = self.sweep_orphans(lab_id).await;
        report.deleted_links_torn_down = self.teardown_deleted_links(lab_id).await;
        report.same_host_links_converged = self.converge_same_host_ports(lab_id).await;

        report
    }

    /// Reads VLAN tags off the wire and compares them to what LinkState
    /// says. Returns `Ok(true)` only when everything matches.
    async fn verify(&self, link_state: &LinkState) -> Result<bool, EngineError> {
        if !link_state.is_cross_host {
            let Some(host_id) = link_state.source_host_id else { return Ok(false) };
            let client = self.router.get(host_id)?;
            let (Some(expected_source), Some(expected_target)) =
                (link_state.source_vlan_tag, link_state.target_vlan_tag)
            else {
                return Ok(false);
            };
            if expected_source != expected_target {
                return Ok(false);
            }
            let source_port = self.mapped_port(link_state.lab_id, link_state.source.node_id, &link_state.source.interface);
            let target_port = self.mapped_port(link_state.lab_id, link_state.target.node_id, &link_state.target.interface);
            let (Some(source_port), Some(target_port)) = (source_port, target_port) else { return Ok(false) };

            let actual_source = client.get_port_vlan(&source_port).await?;
            let actual_target = client.get_port_vlan(&target_port).await?;
            return Ok(actual_source == Some(expected_source) && actual_target == Some(expected_target));
        }

        if !link_state.source_vxlan_attached || !link_state.target_vxlan_attached {
            return Ok(false);
        }
        let Some(tunnel) = self.tunnel_for(link_state.id) else { return Ok(false) };
        let (Some(source_host), Some(target_host)) = (link_state.source_host_id, link_state.target_host_id) else {
            return Ok(false);
        };
        let source_client = self.router.get(source_host)?;
        let target_client = self.router.get(target_host)?;
        let source_ok = source_client.get_port_vlan(&tunnel.port_name).await?.is_some();
        let target_ok = target_client.get_port_vlan(&tunnel.port_name).await?.is_some();
        Ok(source_ok && target_ok)
    }

    fn tunnel_for(&self, link_state_id: LinkStateId) -> Option<netlab_core::VxlanTunnel> {
        self.repository.all_vxlan_tunnels().into_iter().find(|t| t.link_state_id == Some(link_state_id))
    }

    fn mapped_port(&self, lab_id: LabId, node_id: netlab_core::NodeId, iface: &str) -> Option<String> {
        let normalised = crate::reservations::LinkReservations::default_normaliser()(iface);
        self.repository.get_interface_mapping(lab_id, node_id, &normalised).map(|m| m.ovs_port)
    }

    /// Stop-on-first-success repair ladder: VLAN repair, then (cross-host)
    /// partial-attachment recovery, then full re-creation.
    async fn repair(&self, link_state: &LinkState) -> Result<(), EngineError> {
        if self.repair_vlan(link_state).await.is_ok() {
            return Ok(());
        }
        if link_state.is_cross_host && self.repair_partial_attachment(link_state).await.is_ok() {
            return Ok(());
        }
        self.link_manager.create_link(link_state).await
    }

    async fn repair_vlan(&self, link_state: &LinkState) -> Result<(), EngineError> {
        if !link_state.is_cross_host {
            let host_id = link_state.source_host_id.ok_or(EngineError::MissingPlacement)?;
            let tag = link_state.source_vlan_tag.ok_or(EngineError::MissingPlacement)?;
            let client = self.router.get(host_id)?;
            if let Some(port) = self.mapped_port(link_state.lab_id, link_state.source.node_id, &link_state.source.interface) {
                client.set_port_vlan(&port, tag).await?;
            }
            if let Some(port) = self.mapped_port(link_state.lab_id, link_state.target.node_id, &link_state.target.interface) {
                client.set_port_vlan(&port, tag).await?;
            }
            return Ok(());
        }

        let tunnel = self.tunnel_for(link_state.id).ok_or(EngineError::MissingPlacement)?;
        let source_host = link_state.source_host_id.ok_or(EngineError::MissingPlacement)?;
        let target_host = link_state.target_host_id.ok_or(EngineError::MissingPlacement)?;
        let source_tag = link_state.source_vlan_tag.ok_or(EngineError::MissingPlacement)?;
        let target_tag = link_state.target_vlan_tag.ok_or(EngineError::MissingPlacement)?;

        self.router.get(source_host)?.set_port_vlan(&tunnel.port_name, source_tag).await?;
        self.router.get(target_host)?.set_port_vlan(&tunnel.port_name, target_tag).await?;
        Ok(())
    }

    async fn repair_partial_attachment(&self, link_state: &LinkState) -> Result<(), EngineError> {
        let source_host = link_state.source_host_id.ok_or(EngineError::MissingPlacement)?;
        let target_host = link_state.target_host_id.ok_or(EngineError::MissingPlacement)?;
        let vni = link_state.vni.ok_or(EngineError::MissingPlacement)?;
        let source_host_row = self.repository.get_host(&source_host).ok_or(EngineError::NoRoute)?;
        let target_host_row = self.repository.get_host(&target_host).ok_or(EngineError::NoRoute)?;

        let mut source_attached = link_state.source_vxlan_attached;
        let mut target_attached = link_state.target_vxlan_attached;

        if !source_attached {
            let result = self
                .router
                .get(source_host)?
                .attach_overlay(netlab_wire::AttachOverlayRequest {
                    link_state_id: link_state.id.to_string(),
                    container: link_state.source.node_name.clone(),
                    interface: link_state.source.interface.clone(),
                    vni,
                    local_ip: source_host_row.overlay_ip().to_string(),
                    remote_ip: target_host_row.overlay_ip().to_string(),
                    mtu: None,
                })
                .await;
            source_attached = result.is_ok();
        }
        if !target_attached {
            let result = self
                .router
                .get(target_host)?
                .attach_overlay(netlab_wire::AttachOverlayRequest {
                    link_state_id: link_state.id.to_string(),
                    container: link_state.target.node_name.clone(),
                    interface: link_state.target.interface.clone(),
                    vni,
                    local_ip: target_host_row.overlay_ip().to_string(),
                    remote_ip: source_host_row.overlay_ip().to_string(),
                    mtu: None,
                })
                .await;
            target_attached = result.is_ok();
        }

        self.repository
            .apply(Event::LinkVxlanAttachmentChanged {
                link_state_id: link_state.id,
                source_vxlan_attached: source_attached,
                target_vxlan_attached: target_attached,
            })
            .await?;

        if source_attached && target_attached {
            self.repository
                .apply(Event::LinkActualStateChanged { link_state_id: link_state.id, actual_state: LinkActualState::Up })
                .await?;
            Ok(())
        } else {
            Err(EngineError::OverlayAttachFailed("partial recovery left at least one side unattached".into()))
        }
    }

    /// Groups non-cleanup tunnels by `(min_agent, max_agent, vni)`; any
    /// group with more than one row keeps the newest active one whose link
    /// still desires up, detaches the rest best-effort, and deletes them.
    async fn remove_duplicate_tunnels(&self, lab_id: LabId) -> u32 {
        let mut groups: HashMap<(HostId, HostId, u32), Vec<netlab_core::VxlanTunnel>> = HashMap::new();
        for tunnel in self.repository.all_vxlan_tunnels() {
            if tunnel.lab_id != lab_id || tunnel.status == netlab_core::TunnelStatus::Cleanup {
                continue;
            }
            groups.entry(tunnel.canonical_key()).or_default().push(tunnel);
        }

        let mut removed = 0;
        for (_, mut tunnels) in groups {
            if tunnels.len() <= 1 {
                continue;
            }
            tunnels.sort_by_key(|t| {
                let active = t
                    .link_state_id
                    .and_then(|id| self.repository.get_link_state(&id))
                    .map(|ls| ls.desired_state != LinkDesiredState::Deleted)
                    .unwrap_or(false);
                (active, t.created_at)
            });
            let keep = tunnels.pop();
            for duplicate in tunnels {
                let link_state_id = duplicate.link_state_id.map(|id| id.to_string()).unwrap_or_default();
                for host_id in [duplicate.agent_a, duplicate.agent_b] {
                    if let Ok(client) = self.router.get(host_id) {
                        let _ = client.detach_overlay(&link_state_id, "", &duplicate.port_name).await;
                    }
                }
                if self.repository.apply(Event::VxlanTunnelRemoved { tunnel_id: duplicate.id }).await.is_ok() {
                    removed += 1;
                }
            }
            drop(keep);
        }
        removed
    }

    /// LinkStates with no owning declaration and not currently up are torn
    /// down, including any tunnel they hold.
    async fn sweep_orphans(&self, lab_id: LabId) -> u32 {
        let mut removed = 0;
        for link_state in self.repository.link_states_for_lab(lab_id) {
            if link_state.link_definition_id.is_some() || link_state.actual_state == LinkActualState::Up {
                continue;
            }
            if self.required_hosts_online(&link_state) {
                let _ = self.link_manager.teardown_link(&link_state).await;
                if self.repository.apply(Event::LinkStateRemoved { link_state_id: link_state.id }).await.is_ok() {
                    removed += 1;
                }
            } else {
                for tunnel in self.repository.all_vxlan_tunnels() {
                    if tunnel.link_state_id == Some(link_state.id) {
                        let _ = self
                            .repository
                            .apply(Event::VxlanTunnelStatusChanged {
                                tunnel_id: tunnel.id,
                                status: netlab_core::TunnelStatus::Cleanup,
                                cleanup_reason: Some("required agent offline".into()),
                                updated_at: 0,
                            })
                            .await;
                    }
                }
            }
        }
        removed
    }

    /// `desired_state=deleted` rows are torn down the same way orphans are,
    /// except the row is only removed once teardown actually succeeds —
    /// a topology edit renaming or dropping an interface must not abandon
    /// a live overlay.
    async fn teardown_deleted_links(&self, lab_id: LabId) -> u32 {
        let mut removed = 0;
        for link_state in self.repository.link_states_for_lab(lab_id) {
            if link_state.desired_state != LinkDesiredState::Deleted {
                continue;
            }
            if !self.required_hosts_online(&link_state) {
                continue;
            }
            if self.link_manager.teardown_link(&link_state).await.is_ok()
                && self.repository.apply(Event::LinkStateRemoved { link_state_id: link_state.id }).await.is_ok()
            {
                removed += 1;
            }
        }
        removed
    }

    /// Batches every same-host link's (port-a, port-b, tag) triple per
    /// host and pushes it in one `declare_port_state` call per agent.
    async fn converge_same_host_ports(&self, lab_id: LabId) -> u32 {
        let mut by_host: HashMap<HostId, Vec<PortPairing>> = HashMap::new();

        for link_state in self.repository.link_states_for_lab(lab_id) {
            if link_state.is_cross_host || link_state.desired_state != LinkDesiredState::Up {
                continue;
            }
            let Some(host_id) = link_state.source_host_id else { continue };
            let Some(tag) = link_state.source_vlan_tag else { continue };
            if tag == 0 {
                continue;
            }
            let source_port = self.mapped_port(lab_id, link_state.source.node_id, &link_state.source.interface);
            let target_port = self.mapped_port(lab_id, link_state.target.node_id, &link_state.target.interface);
            if let (Some(port_a), Some(port_b)) = (source_port, target_port) {
                by_host.entry(host_id).or_default().push(PortPairing { port_a, port_b, vlan_tag: tag });
            }
        }

        let mut converged = 0;
        for (host_id, pairings) in by_host {
            if pairings.is_empty() {
                continue;
            }
            if let Ok(client) = self.router.get(host_id) {
                let count = pairings.len() as u32;
                if client.declare_port_state(PortStateDeclaration { lab_id, pairings }).await.is_ok() {
                    converged += count;
                }
            }
        }
        converged
    }
}
