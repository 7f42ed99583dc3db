// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LinkManager: creates and tears down same-host and cross-host links,
//! allocates deterministic VNIs and VLAN tags, and keeps VxlanTunnel rows
//! in sync with what's actually wired (§4.6).

use std::sync::Arc;

use netlab_core::{
    Clock, HostId, LabId, LinkActualState, LinkEndpoint, LinkState, LinkStateId, NodeId,
};
use netlab_storage::{Event, Repository};
use netlab_wire::AttachOverlayRequest;

use crate::error::EngineError;
use crate::reservations::LinkReservations;
use crate::vxlan_alloc::{allocate_vlan_tag, allocate_vni, vxlan_port_name};

/// Aggregate result of deploying every link in a lab: link creation
/// proceeds link-by-link and never aborts the batch on one failure,
/// consistent with the partial-success deploy policy.
#[derive(Debug, Clone, Default)]
pub struct LinkDeployOutcome {
    pub succeeded: u32,
    pub failed: u32,
    pub log: Vec<String>,
}

pub struct LinkManager<C: Clock> {
    repository: Arc<Repository>,
    router: Arc<netlab_adapters::RuntimeRouter>,
    reservations: Arc<LinkReservations>,
    clock: C,
}

impl<C: Clock> LinkManager<C> {
    pub fn new(
        repository: Arc<Repository>,
        router: Arc<netlab_adapters::RuntimeRouter>,
        reservations: Arc<LinkReservations>,
        clock: C,
    ) -> Self {
        Self { repository, router, reservations, clock }
    }

    fn resolve_host(&self, lab_id: LabId, node_id: NodeId) -> Option<HostId> {
        self.repository.get_placement(lab_id, node_id).map(|p| p.host_id)
    }

    /// Creates (or re-creates) every desired-up link in `lab_id`, same-host
    /// or cross-host as their endpoint placement dictates.
    pub async fn deploy_lab_links(&self, lab_id: LabId) -> LinkDeployOutcome {
        let mut outcome = LinkDeployOutcome::default();
        for link_state in self.repository.link_states_for_lab(lab_id) {
            if link_state.desired_state != netlab_core::LinkDesiredState::Up {
                continue;
            }
            match self.create_link(&link_state).await {
                Ok(()) => {
                    outcome.succeeded += 1;
                    outcome.log.push(format!("link {} up", link_state.link_name));
                }
                Err(e) => {
                    outcome.failed += 1;
                    outcome.log.push(format!("link {} failed: {e}", link_state.link_name));
                }
            }
        }
        outcome
    }

    /// Dispatches to same-host or cross-host creation based on resolved
    /// endpoint placement. Fails fast, without touching the agent, when
    /// placement for either endpoint is unknown.
    pub async fn create_link(&self, link_state: &LinkState) -> Result<(), EngineError> {
        let source_host = self.resolve_host(link_state.lab_id, link_state.source.node_id);
        let target_host = self.resolve_host(link_state.lab_id, link_state.target.node_id);

        let (source_host, target_host) = match (source_host, target_host) {
            (Some(s), Some(t)) => (s, t),
            _ => {
                self.set_error(
                    link_state.id,
                    "Missing host placement for one or more endpoints".to_string(),
                )
                .await?;
                return Err(EngineError::MissingPlacement);
            }
        };

        if let Err(e) = self.reservations.claim(link_state).await {
            self.set_error(link_state.id, e.to_string()).await?;
            return Err(e);
        }

        if source_host == target_host {
            self.create_same_host(link_state, source_host).await
        } else {
            self.create_cross_host(link_state, source_host, target_host).await
        }
    }

    async fn set_error(&self, link_state_id: LinkStateId, message: String) -> Result<(), EngineError> {
        self.repository.apply(Event::LinkActualStateChanged {
            link_state_id,
            actual_state: LinkActualState::Error,
        })
        .await?;
        self.repository.apply(Event::LinkErrorSet { link_state_id, error_message: Some(message) }).await?;
        Ok(())
    }

    fn mapped_port(&self, lab_id: LabId, endpoint: &LinkEndpoint) -> Option<String> {
        let iface = (LinkReservations::default_normaliser())(&endpoint.interface);
        self.repository
            .get_interface_mapping(lab_id, endpoint.node_id, &iface)
            .map(|m| m.ovs_port)
    }

    /// Same-host: the controller allocates the local VLAN tag (there is no
    /// agent RPC that hands one back, unlike `attach_overlay`) and pushes
    /// it onto both container ports with `set_port_vlan`.
    async fn create_same_host(&self, link_state: &LinkState, host_id: HostId) -> Result<(), EngineError> {
        let client = self.router.get(host_id)?;
        let tag = allocate_vlan_tag(link_state.lab_id, &link_state.link_name);

        let source_port = self.mapped_port(link_state.lab_id, &link_state.source);
        let target_port = self.mapped_port(link_state.lab_id, &link_state.target);

        if let Some(port) = &source_port {
            client.set_port_vlan(port, tag).await?;
        }
        if let Some(port) = &target_port {
            client.set_port_vlan(port, tag).await?;
        }

        self.repository.apply(Event::LinkHostsAssigned {
            link_state_id: link_state.id,
            source_host_id: Some(host_id),
            target_host_id: Some(host_id),
            is_cross_host: false,
        })
        .await?;
        self.repository.apply(Event::LinkVlanTagsAssigned {
            link_state_id: link_state.id,
            source_vlan_tag: Some(tag),
            target_vlan_tag: Some(tag),
        })
        .await?;
        self.repository.apply(Event::LinkCarrierChanged {
            link_state_id: link_state.id,
            source_carrier_state: netlab_core::CarrierState::On,
            target_carrier_state: netlab_core::CarrierState::On,
        })
        .await?;
        self.repository
            .apply(Event::LinkActualStateChanged { link_state_id: link_state.id, actual_state: LinkActualState::Up })
            .await?;
        self.repository.apply(Event::LinkErrorSet { link_state_id: link_state.id, error_message: None }).await?;
        Ok(())
    }

    async fn create_cross_host(
        &self,
        link_state: &LinkState,
        source_host_id: HostId,
        target_host_id: HostId,
    ) -> Result<(), EngineError> {
        let vni = allocate_vni(link_state.lab_id, &link_state.link_name);
        let port_name = vxlan_port_name(link_state.lab_id, &link_state.link_name);

        let source_client = self.router.get(source_host_id)?;
        let target_client = self.router.get(target_host_id)?;
        let source_host = self.repository.get_host(&source_host_id).ok_or(EngineError::NoRoute)?;
        let target_host = self.repository.get_host(&target_host_id).ok_or(EngineError::NoRoute)?;

        self.repository.apply(Event::LinkHostsAssigned {
            link_state_id: link_state.id,
            source_host_id: Some(source_host_id),
            target_host_id: Some(target_host_id),
            is_cross_host: true,
        })
        .await?;
        self.repository.apply(Event::LinkVniAssigned { link_state_id: link_state.id, vni }).await?;

        let source_result = source_client
            .attach_overlay(AttachOverlayRequest {
                link_state_id: link_state.id.to_string(),
                container: link_state.source.node_name.clone(),
                interface: link_state.source.interface.clone(),
                vni,
                local_ip: source_host.overlay_ip().to_string(),
                remote_ip: target_host.overlay_ip().to_string(),
                mtu: None,
            })
            .await;
        let target_result = target_client
            .attach_overlay(AttachOverlayRequest {
                link_state_id: link_state.id.to_string(),
                container: link_state.target.node_name.clone(),
                interface: link_state.target.interface.clone(),
                vni,
                local_ip: target_host.overlay_ip().to_string(),
                remote_ip: source_host.overlay_ip().to_string(),
                mtu: None,
            })
            .await;

        let source_attached = source_result.is_ok();
        let target_attached = target_result.is_ok();

        self.repository.apply(Event::LinkVlanTagsAssigned {
            link_state_id: link_state.id,
            source_vlan_tag: source_result.as_ref().ok().map(|r| r.vlan_tag),
            target_vlan_tag: target_result.as_ref().ok().map(|r| r.vlan_tag),
        })
        .await?;
        self.set_vxlan_attached(link_state.id, source_attached, target_attached).await?;

        if !source_attached || !target_attached {
            let message = format!(
                "overlay attach failed: source={:?} target={:?}",
                source_result.err(),
                target_result.err()
            );
            self.set_error(link_state.id, message.clone()).await?;
            return Err(EngineError::OverlayAttachFailed(message));
        }

        self.repository.apply(Event::LinkCarrierChanged {
            link_state_id: link_state.id,
            source_carrier_state: netlab_core::CarrierState::On,
            target_carrier_state: netlab_core::CarrierState::On,
        })
        .await?;
        self.repository
            .apply(Event::LinkActualStateChanged { link_state_id: link_state.id, actual_state: LinkActualState::Up })
            .await?;
        self.repository.apply(Event::LinkErrorSet { link_state_id: link_state.id, error_message: None }).await?;

        self.create_or_refresh_tunnel(link_state.lab_id, link_state.id, source_host_id, target_host_id, vni, &port_name)
            .await?;
        Ok(())
    }

    /// Applies an agent's carrier-state callback (§6): finds the link
    /// state whose source or target endpoint matches `(node, interface)`,
    /// updates that side's carrier while leaving the other side alone,
    /// propagates the same carrier state to the peer endpoint's agent so
    /// its OVS port reflects reality, and recomputes derived oper state.
    /// Returns the updated link state id.
    pub async fn apply_carrier_report(
        &self,
        lab_id: LabId,
        node: &str,
        interface: &str,
        carrier_state: netlab_core::CarrierState,
    ) -> Result<LinkStateId, EngineError> {
        let link_state = self
            .repository
            .link_states_for_lab(lab_id)
            .into_iter()
            .find(|ls| {
                (ls.source.node_name == node && ls.source.interface == interface)
                    || (ls.target.node_name == node && ls.target.interface == interface)
            })
            .ok_or_else(|| EngineError::LinkEndpointNotFound {
                node: node.to_string(),
                interface: interface.to_string(),
            })?;

        let is_source = link_state.source.node_name == node && link_state.source.interface == interface;
        let (source_carrier_state, target_carrier_state) = if is_source {
            (carrier_state, link_state.target_carrier_state)
        } else {
            (link_state.source_carrier_state, carrier_state)
        };

        self.repository
            .apply(Event::LinkCarrierChanged { link_state_id: link_state.id, source_carrier_state, target_carrier_state })
            .await?;

        let peer = if is_source { &link_state.target } else { &link_state.source };
        if let Some(placement) = self.repository.get_placement(lab_id, peer.node_id) {
            if let Ok(client) = self.router.get(placement.host_id) {
                let op = format!("set-carrier:{}:{}", peer.interface, carrier_state);
                let _ = client.node_action(netlab_core::JobId::new(), lab_id, &peer.node_name, &op).await;
            }
        }

        let refreshed = self.repository.get_link_state(&link_state.id).ok_or(EngineError::NoRoute)?;
        crate::oper::recompute_and_apply(&self.repository, &refreshed).await?;
        Ok(link_state.id)
    }

    async fn set_vxlan_attached(
        &self,
        link_state_id: LinkStateId,
        source: bool,
        target: bool,
    ) -> Result<(), EngineError> {
        self.repository
            .apply(Event::LinkVxlanAttachmentChanged {
                link_state_id,
                source_vxlan_attached: source,
                target_vxlan_attached: target,
            })
            .await?;
        Ok(())
    }

    async fn create_or_refresh_tunnel(
        &self,
        lab_id: LabId,
        link_state_id: LinkStateId,
        host_a: HostId,
        host_b: HostId,
        vni: u32,
        port_name: &str,
    ) -> Result<(), EngineError> {
        let existing = self
            .repository
            .all_vxlan_tunnels()
            .into_iter()
            .find(|t| t.link_state_id == Some(link_state_id));
        if existing.is_some() {
            return Ok(());
        }

        self.repository.apply(Event::VxlanTunnelCreated {
            tunnel_id: netlab_core::TunnelId::new(),
            lab_id,
            link_state_id: Some(link_state_id),
            agent_a: host_a,
            agent_b: host_b,
            vni,
            port_name: port_name.to_string(),
            created_at: self.clock.epoch_ms(),
        })
        .await?;
        Ok(())
    }

    /// Tears down every VxlanTunnel owned by `link_state_id`: marks each
    /// `cleanup`, calls `cleanup_orphans`-equivalent detach on every unique
    /// participating agent, then deletes the tunnel rows and clears the
    /// link's carrier/VLAN/VNI fields.
    pub async fn teardown_link(&self, link_state: &LinkState) -> Result<(), EngineError> {
        let tunnels: Vec<_> = self
            .repository
            .all_vxlan_tunnels()
            .into_iter()
            .filter(|t| t.link_state_id == Some(link_state.id))
            .collect();

        for tunnel in &tunnels {
            self.repository.apply(Event::VxlanTunnelStatusChanged {
                tunnel_id: tunnel.id,
                status: netlab_core::TunnelStatus::Cleanup,
                cleanup_reason: None,
                updated_at: self.clock.epoch_ms(),
            })
            .await?;

            for host_id in [tunnel.agent_a, tunnel.agent_b] {
                if let Ok(client) = self.router.get(host_id) {
                    let _ = client
                        .detach_overlay(
                            &link_state.id.to_string(),
                            &link_state.source.node_name,
                            &link_state.source.interface,
                        )
                        .await;
                }
            }
            self.repository.apply(Event::VxlanTunnelRemoved { tunnel_id: tunnel.id }).await?;
        }

        self.reservations.release(link_state).await?;

        self.set_vxlan_attached(link_state.id, false, false).await?;
        self.repository.apply(Event::LinkVlanTagsAssigned {
            link_state_id: link_state.id,
            source_vlan_tag: None,
            target_vlan_tag: None,
        })
        .await?;
        self.repository.apply(Event::LinkCarrierChanged {
            link_state_id: link_state.id,
            source_carrier_state: netlab_core::CarrierState::Off,
            target_carrier_state: netlab_core::CarrierState::Off,
        })
        .await?;
        self.repository
            .apply(Event::LinkActualStateChanged { link_state_id: link_state.id, actual_state: LinkActualState::Down })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netlab_adapters::{FakeAgentClient, RuntimeRouter};
    use netlab_core::{FakeClock, Link, LinkEndpoint, LinkId};
    use tempfile::tempdir;

    async fn repository() -> Arc<Repository> {
        let dir = tempdir().unwrap();
        let path = dir.keep().join("wal.jsonl");
        Arc::new(Repository::open(path, 0).unwrap())
    }

    fn link(lab_id: LabId, source_node: NodeId, target_node: NodeId) -> Link {
        Link {
            id: LinkId::new(),
            lab_id,
            link_name: "r1-r2".into(),
            source: LinkEndpoint { node_id: source_node, node_name: "r1".into(), interface: "eth1".into() },
            target: LinkEndpoint { node_id: target_node, node_name: "r2".into(), interface: "eth1".into() },
            mtu: None,
        }
    }

    async fn with_manager() -> (Arc<Repository>, LinkManager<FakeClock>, Arc<RuntimeRouter>, LabId, LinkState) {
        let repo = repository().await;
        let router = Arc::new(RuntimeRouter::new());
        let reservations = Arc::new(LinkReservations::new(repo.clone(), LinkReservations::default_normaliser()));
        let manager = LinkManager::new(repo.clone(), router.clone(), reservations, FakeClock::new());

        let lab_id = LabId::new();
        let source_node = NodeId::new();
        let target_node = NodeId::new();
        let link = link(lab_id, source_node, target_node);
        let link_state = LinkState::new(lab_id, &link);

        repo.apply(Event::LinkStateCreated {
            lab_id,
            link_state_id: link_state.id,
            link_definition_id: Some(link.id),
            link_name: link.link_name.clone(),
            source: link.source.clone(),
            target: link.target.clone(),
        })
        .await
        .unwrap();

        (repo, manager, router, lab_id, link_state)
    }

    #[tokio::test]
    async fn missing_placement_fails_fast_with_error_message() {
        let (repo, manager, _router, _lab_id, link_state) = with_manager().await;

        let err = manager.create_link(&link_state).await.unwrap_err();
        assert!(matches!(err, EngineError::MissingPlacement));

        let stored = repo.get_link_state(&link_state.id).unwrap();
        assert_eq!(stored.actual_state, LinkActualState::Error);
        assert_eq!(stored.error_message.as_deref(), Some("Missing host placement for one or more endpoints"));
    }

    #[tokio::test]
    async fn same_host_link_reaches_up_and_sets_matching_vlan_tags() {
        let (repo, manager, router, lab_id, link_state) = with_manager().await;
        let host_id = HostId::new();

        repo.apply(Event::HostRegistered {
            host_id,
            address: "http://10.0.0.5:7000".into(),
            capabilities: serde_json::Value::Null,
            image_sync_strategy: "pull".into(),
        })
        .await
        .unwrap();
        repo.apply(Event::PlacementSet { lab_id, node_id: link_state.source.node_id, host_id }).await.unwrap();
        repo.apply(Event::PlacementSet { lab_id, node_id: link_state.target.node_id, host_id }).await.unwrap();
        router.register(host_id, Arc::new(FakeAgentClient::new(host_id)));

        manager.create_link(&link_state).await.unwrap();

        let stored = repo.get_link_state(&link_state.id).unwrap();
        assert_eq!(stored.actual_state, LinkActualState::Up);
        assert!(!stored.is_cross_host);
        assert_eq!(stored.source_vlan_tag, stored.target_vlan_tag);
        assert!(stored.source_vlan_tag.is_some());
    }

    #[tokio::test]
    async fn cross_host_link_creates_a_tunnel_row() {
        let (repo, manager, router, lab_id, link_state) = with_manager().await;
        let host_a = HostId::new();
        let host_b = HostId::new();

        for (host_id, node_id) in [(host_a, link_state.source.node_id), (host_b, link_state.target.node_id)] {
            repo.apply(Event::HostRegistered {
                host_id,
                address: "http://10.0.0.5:7000".into(),
                capabilities: serde_json::Value::Null,
                image_sync_strategy: "pull".into(),
            })
            .await
            .unwrap();
            repo.apply(Event::PlacementSet { lab_id, node_id, host_id }).await.unwrap();
            router.register(host_id, Arc::new(FakeAgentClient::new(host_id)));
        }

        manager.create_link(&link_state).await.unwrap();

        let stored = repo.get_link_state(&link_state.id).unwrap();
        assert!(stored.is_cross_host);
        assert_eq!(stored.actual_state, LinkActualState::Up);
        assert_eq!(stored.vni, Some(allocate_vni(lab_id, &link_state.link_name)));

        let tunnels = repo.all_vxlan_tunnels();
        assert_eq!(tunnels.len(), 1);
        assert_eq!(tunnels[0].vni, stored.vni.unwrap());
    }

    #[tokio::test]
    async fn teardown_removes_tunnel_and_clears_carrier() {
        let (repo, manager, router, lab_id, link_state) = with_manager().await;
        let host_a = HostId::new();
        let host_b = HostId::new();
        for (host_id, node_id) in [(host_a, link_state.source.node_id), (host_b, link_state.target.node_id)] {
            repo.apply(Event::HostRegistered {
                host_id,
                address: "http://10.0.0.5:7000".into(),
                capabilities: serde_json::Value::Null,
                image_sync_strategy: "pull".into(),
            })
            .await
            .unwrap();
            repo.apply(Event::PlacementSet { lab_id, node_id, host_id }).await.unwrap();
            router.register(host_id, Arc::new(FakeAgentClient::new(host_id)));
        }
        manager.create_link(&link_state).await.unwrap();

        let refreshed = repo.get_link_state(&link_state.id).unwrap();
        manager.teardown_link(&refreshed).await.unwrap();

        assert!(repo.all_vxlan_tunnels().is_empty());
        let stored = repo.get_link_state(&link_state.id).unwrap();
        assert_eq!(stored.actual_state, LinkActualState::Down);
        assert_eq!(stored.source_carrier_state, netlab_core::CarrierState::Off);
        assert!(stored.source_vlan_tag.is_none());
    }

    #[tokio::test]
    async fn carrier_report_updates_only_the_reporting_side() {
        let (repo, manager, _router, lab_id, link_state) = with_manager().await;

        manager
            .apply_carrier_report(lab_id, "r1", "eth1", netlab_core::CarrierState::On)
            .await
            .unwrap();

        let stored = repo.get_link_state(&link_state.id).unwrap();
        assert_eq!(stored.source_carrier_state, netlab_core::CarrierState::On);
        assert_eq!(stored.target_carrier_state, netlab_core::CarrierState::Off);
    }

    #[tokio::test]
    async fn carrier_report_propagates_a_set_carrier_call_to_the_peer_agent() {
        let (repo, manager, router, lab_id, link_state) = with_manager().await;
        let peer_host = HostId::new();
        repo.apply(Event::HostRegistered {
            host_id: peer_host,
            address: "http://10.0.0.9:7000".into(),
            capabilities: serde_json::Value::Null,
            image_sync_strategy: "pull".into(),
        })
        .await
        .unwrap();
        repo.apply(Event::PlacementSet { lab_id, node_id: link_state.target.node_id, host_id: peer_host })
            .await
            .unwrap();
        let fake = Arc::new(FakeAgentClient::new(peer_host));
        router.register(peer_host, fake.clone());

        manager
            .apply_carrier_report(lab_id, "r1", "eth1", netlab_core::CarrierState::Off)
            .await
            .unwrap();

        let calls = fake.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(
            &calls[0],
            netlab_adapters::AgentCall::NodeAction { node, op, .. }
                if node == "r2" && op.contains("eth1") && op.contains("off")
        ));
    }

    #[tokio::test]
    async fn carrier_report_for_an_unknown_endpoint_fails() {
        let (_repo, manager, _router, lab_id, _link_state) = with_manager().await;

        let err = manager
            .apply_carrier_report(lab_id, "nope", "eth9", netlab_core::CarrierState::On)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::LinkEndpointNotFound { .. }));
    }
}
