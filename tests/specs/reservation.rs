//! S5 — two links that claim the same endpoint interface cannot both
//! reach `up`: the second deploy attempt is rejected with the first
//! link's name in the conflict message and the link lands in `error`.

use crate::prelude::Harness;
use netlab_core::LinkActualState;

#[tokio::test]
async fn a_conflicting_link_is_rejected_and_marked_as_error() {
    let h = Harness::new().await;
    let lab_id = h.create_lab("conflict", "alice").await;
    let host_id = h.register_host("http://10.0.0.5:7000").await;

    let r1 = h.declare_node(lab_id, "r1", host_id).await;
    let r2 = h.declare_node(lab_id, "r2", host_id).await;
    let r3 = h.declare_node(lab_id, "r3", host_id).await;

    h.declare_link(lab_id, "r1-r2", (r1, "r1", "eth1"), (r2, "r2", "eth1")).await;
    h.declare_link(lab_id, "r1-r3", (r1, "r1", "eth1"), (r3, "r3", "eth1")).await;

    let outcome = h.link_manager.deploy_lab_links(lab_id).await;
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.failed, 1);

    let link_states = h.repo.link_states_for_lab(lab_id);
    let up = link_states.iter().find(|l| l.actual_state == LinkActualState::Up).expect("one link came up");
    let errored = link_states.iter().find(|l| l.actual_state == LinkActualState::Error).expect("one link errored");
    assert_ne!(up.id, errored.id);

    let message = errored.error_message.as_deref().expect("error message set");
    assert!(message.contains("reservation conflict"), "message was: {message}");
    assert!(message.contains(&up.link_name), "message `{message}` should name the winning link `{}`", up.link_name);
}
