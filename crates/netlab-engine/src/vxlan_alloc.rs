// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic VNI and VXLAN port-name allocation (§4.6).
//!
//! The reference implementation module defining these two helpers wasn't
//! available for direct inspection; the formulas below come from the
//! distilled spec and are taken as authoritative — see DESIGN.md. Both are
//! pure functions of `(lab_id, link_name)` so a controller restart (or a
//! second replica) always derives the same VNI and port name without
//! coordinating with anyone.

use md5::{Digest, Md5};
use netlab_core::LabId;

const VNI_BASE: u32 = 1000;
const VNI_RANGE: u32 = 16_000_000;

/// 802.1Q tags 2..4094 are usable (0, 1, and 4095 are reserved/default).
const VLAN_BASE: u16 = 2;
const VLAN_RANGE: u16 = 4093;

fn key(lab_id: LabId, link_name: &str) -> String {
    format!("{lab_id}:{link_name}")
}

fn digest(lab_id: LabId, link_name: &str) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(key(lab_id, link_name).as_bytes());
    hasher.finalize().into()
}

/// `hash(lab_id ":" link_name) mod 16_000_000 + 1000`.
pub fn allocate_vni(lab_id: LabId, link_name: &str) -> u32 {
    let bytes = digest(lab_id, link_name);
    // Fold the 16-byte digest into a u64 via its first 8 bytes; uniform
    // enough over VNI_RANGE that distinct links collide only by the
    // duplicate-tunnel check's tolerance, not by construction.
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    let n = u64::from_be_bytes(buf);
    VNI_BASE + (n % VNI_RANGE as u64) as u32
}

/// `"vxlan-" + hex(md5(lab_id ":" link_name))[:8]` — 14 chars, within OVS
/// interface-name limits.
pub fn vxlan_port_name(lab_id: LabId, link_name: &str) -> String {
    let bytes = digest(lab_id, link_name);
    let hex: String = bytes.iter().take(4).map(|b| format!("{b:02x}")).collect();
    format!("vxlan-{hex}")
}

/// A same-host link's local VLAN tag, allocated the same deterministic way
/// as the cross-host VNI.
///
/// No RPC exists for "ask the agent to pick a tag and tell us what it
/// picked" — every agent call this crate makes either takes a tag
/// (`set_port_vlan`) or reports one the controller already recorded
/// (`get_port_vlan` for verification). Deriving the tag here, the same way
/// the VNI is derived, keeps the controller the single source of truth for
/// both same-host and cross-host links, which is what the repair ladder
/// assumes when it rewrites OVS tags from the value already in LinkState.
pub fn allocate_vlan_tag(lab_id: LabId, link_name: &str) -> u16 {
    let bytes = digest(lab_id, link_name);
    let mut buf = [0u8; 2];
    buf.copy_from_slice(&bytes[8..10]);
    let n = u16::from_be_bytes(buf);
    VLAN_BASE + (n % VLAN_RANGE)
}
