//! S4 — three topology edits arriving within the debounce window collapse
//! into a single batched flush instead of three separate sync jobs.

use std::sync::Arc;
use std::time::Duration;

use crate::prelude::Harness;
use netlab_core::{NodeActualState, NodeDesiredState};
use netlab_engine::live_edit::{LiveEdit, LiveEditChange};
use netlab_storage::Event;

#[tokio::test]
async fn three_rapid_adds_coalesce_into_one_sync_job() {
    let h = Harness::new().await;
    let lab_id = h.create_lab("live-edit", "alice").await;
    let host_id = h.register_host("http://10.0.0.5:7000").await;
    let node_id = h.declare_node(lab_id, "r2", host_id).await;
    h.repo
        .apply(Event::LabStateChanged { lab_id, state: netlab_core::LabState::Running })
        .await
        .unwrap();
    h.repo
        .apply(Event::NodeActualStateChanged {
            lab_id,
            node_id,
            actual_state: NodeActualState::Undeployed,
            entered_state_at: 0,
        })
        .await
        .unwrap();

    let live_edit = Arc::new(
        LiveEdit::new(h.repo.clone(), h.router.clone(), h.jobs.clone(), netlab_core::FakeClock::new())
            .with_debounce_delay(Duration::from_millis(20)),
    );

    for _ in 0..3 {
        live_edit
            .submit_change(lab_id, LiveEditChange { added_node_ids: vec![node_id], removed_nodes: vec![] })
            .await;
    }

    tokio::time::sleep(Duration::from_millis(80)).await;

    assert_eq!(h.repo.get_node_state(lab_id, node_id).unwrap().actual_state, NodeActualState::Pending);
    assert_eq!(h.repo.get_node_state(lab_id, node_id).unwrap().desired_state, NodeDesiredState::Running);
    let jobs = h.repo.jobs_for_lab(lab_id);
    assert_eq!(jobs.len(), 1, "three edits inside the debounce window must coalesce into one job");
    assert!(matches!(jobs[0].action, netlab_core::JobAction::SyncNode { node_id: n } if n == node_id));
}
