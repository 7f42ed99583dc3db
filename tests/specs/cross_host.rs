//! S2 — a link whose endpoints sit on different hosts gets a VxlanTunnel
//! with the deterministic VNI and independently-chosen VLAN tags.

use crate::prelude::Harness;
use netlab_core::{JobAction, LinkActualState};
use netlab_engine::job_runner::JobRunOutcome;
use netlab_engine::vxlan_alloc::allocate_vni;

#[tokio::test]
async fn cross_host_link_gets_one_tunnel_with_the_deterministic_vni() {
    let h = Harness::new().await;
    let lab_id = h.create_lab("cross-host", "alice").await;
    let host_a = h.register_host("http://10.0.0.5:7000").await;
    let host_b = h.register_host("http://10.0.0.6:7000").await;

    let r1 = h.declare_node(lab_id, "r1", host_a).await;
    let r2 = h.declare_node(lab_id, "r2", host_b).await;
    h.declare_link(lab_id, "r1-r2", (r1, "r1", "eth1"), (r2, "r2", "eth1")).await;

    let outcome = h.run(lab_id, "alice", JobAction::Up).await;
    assert_eq!(outcome, JobRunOutcome::Completed);

    let link_states = h.repo.link_states_for_lab(lab_id);
    assert_eq!(link_states.len(), 1);
    let link_state = &link_states[0];
    assert!(link_state.is_cross_host);
    assert_eq!(link_state.actual_state, LinkActualState::Up);
    assert!(link_state.source_vxlan_attached);
    assert!(link_state.target_vxlan_attached);

    let expected_vni = allocate_vni(lab_id, "r1-r2");
    assert_eq!(link_state.vni, Some(expected_vni));
    assert!((1000..16_001_000).contains(&expected_vni));

    let tunnels = h.repo.all_vxlan_tunnels();
    assert_eq!(tunnels.len(), 1);
    let tunnel = &tunnels[0];
    assert_eq!(tunnel.vni, expected_vni);
    let participants = std::collections::HashSet::from([tunnel.agent_a, tunnel.agent_b]);
    assert_eq!(participants, std::collections::HashSet::from([host_a, host_b]));
    assert_eq!(tunnel.status, netlab_core::TunnelStatus::Active);
}

#[tokio::test]
async fn vni_allocation_is_deterministic_across_calls() {
    let lab_id = netlab_core::LabId::new();
    assert_eq!(allocate_vni(lab_id, "r1-r2"), allocate_vni(lab_id, "r1-r2"));
}
