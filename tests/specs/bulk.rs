//! S3 — bulk-starting a lab with mixed node states only touches the nodes
//! that can actually accept the command, and queues a single sync job.

use crate::prelude::Harness;
use netlab_core::{NodeActualState, NodeDesiredState};
use netlab_storage::Event;
use netlab_wire::BulkStateResponse;

#[tokio::test]
async fn bulk_start_skips_transitional_and_already_running_nodes() {
    let h = Harness::new().await;
    let lab_id = h.create_lab("bulk", "alice").await;
    let host_id = h.register_host("http://10.0.0.5:7000").await;

    let r1 = h.declare_node(lab_id, "r1", host_id).await;
    let r2 = h.declare_node(lab_id, "r2", host_id).await;
    let r3 = h.declare_node(lab_id, "r3", host_id).await;
    let r4 = h.declare_node(lab_id, "r4", host_id).await;

    let states = [
        (r1, NodeActualState::Stopped),
        (r2, NodeActualState::Starting),
        (r3, NodeActualState::Running),
        (r4, NodeActualState::Error),
    ];
    for (node_id, actual_state) in states {
        h.repo
            .apply(Event::NodeActualStateChanged { lab_id, node_id, actual_state, entered_state_at: crate::prelude::epoch_ms() })
            .await
            .unwrap();
    }

    let response = h.jobs.bulk_set_desired_state(lab_id, "alice", NodeDesiredState::Running).await.unwrap();
    similar_asserts::assert_eq!(
        response,
        BulkStateResponse { affected: 2, skipped_transitional: 1, already_in_state: 1 }
    );

    assert_eq!(h.repo.get_node_state(lab_id, r1).unwrap().desired_state, NodeDesiredState::Running);
    assert_eq!(h.repo.get_node_state(lab_id, r4).unwrap().desired_state, NodeDesiredState::Running);

    let jobs = h.repo.all_jobs();
    assert_eq!(jobs.iter().filter(|j| matches!(j.action, netlab_core::JobAction::Sync)).count(), 1);
}

#[tokio::test]
async fn bulk_start_with_nothing_to_do_queues_no_job() {
    let h = Harness::new().await;
    let lab_id = h.create_lab("bulk-noop", "alice").await;
    let host_id = h.register_host("http://10.0.0.5:7000").await;
    let r1 = h.declare_node(lab_id, "r1", host_id).await;
    h.repo
        .apply(Event::NodeActualStateChanged {
            lab_id,
            node_id: r1,
            actual_state: NodeActualState::Running,
            entered_state_at: crate::prelude::epoch_ms(),
        })
        .await
        .unwrap();

    let response = h.jobs.bulk_set_desired_state(lab_id, "alice", NodeDesiredState::Running).await.unwrap();
    assert_eq!(response.affected, 0);
    assert_eq!(response.already_in_state, 1);
    assert!(h.repo.all_jobs().is_empty());
}
