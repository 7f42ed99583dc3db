// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use netlab_core::{LabProvider, NodeKind};
use tempfile::tempdir;

fn lab_created(lab_id: LabId) -> Event {
    Event::LabCreated {
        lab_id,
        name: "demo".into(),
        owner: "alice".into(),
        provider: LabProvider::Docker,
        workspace_path: "/var/lib/netlab/demo".into(),
    }
}

#[tokio::test]
async fn apply_is_visible_immediately_and_survives_reopen() {
    let dir = tempdir().unwrap();
    let wal_path = dir.path().join("state.wal");
    let lab_id = LabId::new();

    {
        let repo = Repository::open(&wal_path, 0).unwrap();
        repo.apply(lab_created(lab_id)).await.unwrap();
        assert!(repo.get_lab(&lab_id).is_some());
    }

    let repo = Repository::open(&wal_path, 0).unwrap();
    assert!(repo.get_lab(&lab_id).is_some());
}

#[tokio::test]
async fn try_lock_link_state_returns_none_while_held() {
    let dir = tempdir().unwrap();
    let repo = Repository::open(dir.path().join("state.wal"), 0).unwrap();
    let link_state_id = LinkStateId::new();

    let guard = repo.try_lock_link_state(link_state_id).unwrap();
    assert!(repo.try_lock_link_state(link_state_id).is_none());
    drop(guard);
    assert!(repo.try_lock_link_state(link_state_id).is_some());
}

#[tokio::test]
async fn claim_reservation_is_idempotent_for_the_same_link_state() {
    let dir = tempdir().unwrap();
    let repo = Repository::open(dir.path().join("state.wal"), 0).unwrap();
    let lab_id = LabId::new();
    let node_id = NodeId::new();
    let link_state_id = LinkStateId::new();

    let first = repo
        .claim_reservation(lab_id, node_id, "eth1".into(), link_state_id)
        .await
        .unwrap();
    let second = repo
        .claim_reservation(lab_id, node_id, "eth1".into(), link_state_id)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn claim_reservation_conflicts_across_link_states() {
    let dir = tempdir().unwrap();
    let repo = Repository::open(dir.path().join("state.wal"), 0).unwrap();
    let lab_id = LabId::new();
    let node_id = NodeId::new();

    repo.claim_reservation(lab_id, node_id, "eth1".into(), LinkStateId::new())
        .await
        .unwrap();

    let err = repo
        .claim_reservation(lab_id, node_id, "eth1".into(), LinkStateId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));
}

#[tokio::test]
async fn upsert_interface_mapping_overwrites_the_same_key() {
    let dir = tempdir().unwrap();
    let repo = Repository::open(dir.path().join("state.wal"), 0).unwrap();
    let lab_id = LabId::new();
    let node_id = NodeId::new();

    let mapping = |bridge: &str| InterfaceMapping {
        lab_id,
        node_id,
        linux_interface: "eth1".into(),
        ovs_port: "veth0".into(),
        bridge: bridge.into(),
        vlan_tag: None,
        vendor_interface_name: None,
        last_verified_at: 0,
    };

    repo.upsert_interface_mapping(mapping("br0")).await.unwrap();
    repo.upsert_interface_mapping(mapping("br1")).await.unwrap();

    let stored = repo.get_interface_mapping(lab_id, node_id, "eth1").unwrap();
    assert_eq!(stored.bridge, "br1");
}

#[tokio::test]
async fn snapshot_reflects_applied_events() {
    let dir = tempdir().unwrap();
    let repo = Repository::open(dir.path().join("state.wal"), 0).unwrap();
    let lab_id = LabId::new();
    let node_id = NodeId::new();

    repo.apply(lab_created(lab_id)).await.unwrap();
    repo.apply(Event::NodeDeclared {
        lab_id,
        node_id,
        display_name: "r1".into(),
        container_name: "r1".into(),
        kind: NodeKind::Linux,
        image_ref: "alpine".into(),
    })
    .await
    .unwrap();

    let snapshot = repo.snapshot();
    assert!(snapshot.labs.contains_key(&lab_id));
    assert!(snapshot.nodes.contains_key(&node_id));
    let _ = LinkEndpoint { node_id, node_name: "r1".into(), interface: "eth1".into() };
}
