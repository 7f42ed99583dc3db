// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn canonical_key_is_order_independent() {
    let a = HostId::from_string("hst-a");
    let b = HostId::from_string("hst-b");

    let t1 = VxlanTunnel::builder().agent_a(a).agent_b(b).vni(42).build();
    let t2 = VxlanTunnel::builder().agent_a(b).agent_b(a).vni(42).build();

    assert_eq!(t1.canonical_key(), t2.canonical_key());
}

#[test]
fn canonical_key_differs_by_vni() {
    let a = HostId::new();
    let b = HostId::new();
    let t1 = VxlanTunnel::builder().agent_a(a).agent_b(b).vni(1).build();
    let t2 = VxlanTunnel::builder().agent_a(a).agent_b(b).vni(2).build();
    assert_ne!(t1.canonical_key(), t2.canonical_key());
}
