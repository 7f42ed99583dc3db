//! S1 — deploying a two-node same-host lab brings both nodes up and the
//! link between them to `up` with a shared VLAN tag.

use crate::prelude::Harness;
use netlab_core::{JobAction, LinkActualState, NodeActualState};
use netlab_engine::job_runner::JobRunOutcome;

#[tokio::test]
async fn deploy_brings_up_two_nodes_and_their_link() {
    let h = Harness::new().await;
    let lab_id = h.create_lab("two-node", "alice").await;
    let host_id = h.register_host("http://10.0.0.5:7000").await;

    let r1 = h.declare_node(lab_id, "r1", host_id).await;
    let r2 = h.declare_node(lab_id, "r2", host_id).await;
    h.declare_link(lab_id, "r1-r2", (r1, "r1", "eth1"), (r2, "r2", "eth1")).await;

    let outcome = h.run(lab_id, "alice", JobAction::Up).await;
    assert_eq!(outcome, JobRunOutcome::Completed);

    assert_eq!(h.repo.get_node_state(lab_id, r1).unwrap().actual_state, NodeActualState::Running);
    assert_eq!(h.repo.get_node_state(lab_id, r2).unwrap().actual_state, NodeActualState::Running);

    let link_states = h.repo.link_states_for_lab(lab_id);
    assert_eq!(link_states.len(), 1);
    let link_state = &link_states[0];
    assert_eq!(link_state.actual_state, LinkActualState::Up);
    assert!(!link_state.is_cross_host);
    assert_eq!(link_state.source_vlan_tag, link_state.target_vlan_tag);
    let tag = link_state.source_vlan_tag.expect("vlan tag assigned");
    assert!((2..=4094).contains(&tag));
    assert_eq!(link_state.source_carrier_state, netlab_core::CarrierState::On);
    assert_eq!(link_state.target_carrier_state, netlab_core::CarrierState::On);
    assert!(link_state.oper_epoch >= 1);

    let fake = h.fake(host_id);
    assert_eq!(fake.call_count(), 1, "one deploy call for the whole lab");
}

#[tokio::test]
async fn down_job_tears_down_nodes_and_link() {
    let h = Harness::new().await;
    let lab_id = h.create_lab("teardown", "alice").await;
    let host_id = h.register_host("http://10.0.0.5:7000").await;
    let r1 = h.declare_node(lab_id, "r1", host_id).await;
    let r2 = h.declare_node(lab_id, "r2", host_id).await;
    h.declare_link(lab_id, "r1-r2", (r1, "r1", "eth1"), (r2, "r2", "eth1")).await;
    assert_eq!(h.run(lab_id, "alice", JobAction::Up).await, JobRunOutcome::Completed);

    for node_id in [r1, r2] {
        h.repo
            .apply(netlab_storage::Event::NodeDesiredStateSet {
                lab_id,
                node_id,
                desired_state: netlab_core::NodeDesiredState::Stopped,
            })
            .await
            .unwrap();
    }

    let outcome = h.run(lab_id, "alice", JobAction::Down).await;
    assert_eq!(outcome, JobRunOutcome::Completed);
    assert_eq!(h.repo.get_node_state(lab_id, r1).unwrap().actual_state, NodeActualState::Stopped);
    assert_eq!(h.repo.get_node_state(lab_id, r2).unwrap().actual_state, NodeActualState::Stopped);
    let link_state = &h.repo.link_states_for_lab(lab_id)[0];
    assert_eq!(link_state.actual_state, LinkActualState::Down);
    assert_eq!(link_state.source_carrier_state, netlab_core::CarrierState::Off);
}
