// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-boundary types for the network-lab control plane.
//!
//! Everything here is a tagged-union `struct`/`enum` with `serde` derives:
//! the broadcaster's pub/sub frames (§4.3), the agent-facing RPC bodies
//! (§4.2/§6), the single inbound agent callback this crate terminates
//! (§6 carrier-state), and the WebSocket client control messages (§6). None
//! of it is transport: encoding/decoding over HTTP or a WebSocket frame is
//! `netlab-adapters`' and `netlab-daemon`'s job.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod agent_rpc;
pub mod broadcast;
pub mod bulk;
pub mod callback;
pub mod ws;

pub use agent_rpc::{
    AttachOverlayRequest, AttachOverlayResponse, CleanupOrphansRequest, DeployRequest,
    DestroyRequest, DetachOverlayRequest, HealthResponse, NodeActionRequest, PortPairing,
    ReconcileOverlayPortsRequest, ReconcileOverlayPortsResponse, SetPortVlanRequest,
    StatusRequest, StatusResponse, TopologyLinkWire, TopologyNodeWire, TopologyWire,
};
pub use broadcast::{BroadcastData, BroadcastFrame};
pub use bulk::{BulkStateRequest, BulkStateResponse, DesiredStateWire};
pub use callback::CarrierStateCallback;
pub use ws::{ClientMessage, ServerMessage};
