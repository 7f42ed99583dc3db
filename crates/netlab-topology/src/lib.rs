// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Topology declarations: the YAML a user submits for a lab, parsed into an
//! internal node/link graph and back again.
//!
//! LiveEdit and deploy both resolve a lab's declared topology through this
//! crate rather than touching YAML directly. Round-trip stability (YAML →
//! graph → JSON → graph → YAML produces the same YAML) is a tested
//! invariant, not an accident of `serde`'s defaults: every conversion stays
//! inside the strongly-typed [`Topology`] graph, never through a loose
//! `serde_json::Value`, so field order can't drift between formats.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod graph;
pub mod yaml;

pub use error::TopologyError;
pub use graph::{Topology, TopologyEndpoint, TopologyLink, TopologyNode};
pub use yaml::{from_graph_json, from_yaml, to_graph_json, to_yaml};
