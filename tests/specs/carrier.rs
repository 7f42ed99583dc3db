//! S6 — a carrier-down callback from one agent on a cross-host link
//! propagates a matching set-carrier call to the peer's agent and flips
//! each endpoint's derived oper reason to reflect which side is down.

use netlab_adapters::AgentCall;
use netlab_core::{CarrierState, JobAction, OperReason, OperState};
use netlab_engine::job_runner::JobRunOutcome;

use crate::prelude::Harness;

#[tokio::test]
async fn carrier_off_propagates_to_the_peer_and_updates_oper_reasons() {
    let h = Harness::new().await;
    let lab_id = h.create_lab("carrier", "alice").await;
    let host_a = h.register_host("http://10.0.0.5:7000").await;
    let host_b = h.register_host("http://10.0.0.6:7000").await;

    let r1 = h.declare_node(lab_id, "r1", host_a).await;
    let r2 = h.declare_node(lab_id, "r2", host_b).await;
    h.declare_link(lab_id, "r1-r2", (r1, "r1", "eth1"), (r2, "r2", "eth1")).await;

    assert_eq!(h.run(lab_id, "alice", JobAction::Up).await, JobRunOutcome::Completed);

    let before = h.repo.link_states_for_lab(lab_id)[0].clone();
    assert_eq!(before.source_oper.state, OperState::Up);
    assert_eq!(before.target_oper.state, OperState::Up);

    h.link_manager.apply_carrier_report(lab_id, "r1", "eth1", CarrierState::Off).await.unwrap();

    let after = &h.repo.link_states_for_lab(lab_id)[0];
    assert_eq!(after.source_carrier_state, CarrierState::Off);
    assert_eq!(after.target_carrier_state, CarrierState::On);

    assert_eq!(after.source_oper.state, OperState::Down);
    assert_eq!(after.source_oper.reason, OperReason::LocalInterfaceDown);
    assert_eq!(after.target_oper.state, OperState::Down);
    assert_eq!(after.target_oper.reason, OperReason::PeerInterfaceDown);
    assert!(after.oper_epoch > before.oper_epoch);

    let node_actions: Vec<_> = h
        .fake(host_b)
        .calls()
        .into_iter()
        .filter(|call| matches!(call, AgentCall::NodeAction { .. }))
        .collect();
    assert_eq!(node_actions.len(), 1, "exactly one set-carrier call reached the peer agent");
    assert!(matches!(
        &node_actions[0],
        AgentCall::NodeAction { node, op, .. }
            if node == "r2" && op.contains("eth1") && op.contains("off")
    ));
}
