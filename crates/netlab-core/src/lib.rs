// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! netlab-core: the data model and pure decision logic for the network-lab
//! control plane.
//!
//! Nothing in this crate talks to a database, an agent, or the network:
//! every type here is a plain value, and every function in
//! [`state_machine`] is a pure mapping from inputs to a decision. I/O lives
//! in `netlab-storage` (persistence) and `netlab-adapters` (agent RPC);
//! orchestration lives in `netlab-engine`.

pub mod macros;

pub mod clock;
pub mod error;
pub mod host;
pub mod id;
pub mod ids;
pub mod interface_mapping;
pub mod job;
pub mod lab;
pub mod link;
pub mod node;
pub mod placement;
pub mod reservation;
pub mod state_machine;
pub mod vxlan;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{CategorizedError, ErrorCategory, HasCategory};
pub use host::{Host, HostStatus};
pub use id::{short, IdBuf};
pub use ids::{
    HostId, JobId, LabId, LinkId, LinkStateId, NodeId, ReservationId, TimerId, TunnelId,
};
pub use interface_mapping::InterfaceMapping;
pub use job::{Job, JobAction, JobLog, JobStatus};
pub use lab::{Lab, LabProvider, LabState};
pub use link::{
    CarrierState, EndpointOper, Link, LinkActualState, LinkDesiredState, LinkEndpoint, LinkState,
    OperReason, OperState,
};
pub use node::{Node, NodeActualState, NodeDesiredState, NodeKind, NodeState};
pub use placement::Placement;
pub use reservation::LinkEndpointReservation;
pub use state_machine::{
    BulkCommandOutcome, LabStateMachine, LinkStateMachine, NodeCommand, NodeStateCounts,
    NodeStateMachine,
};
pub use vxlan::{TunnelStatus, VxlanTunnel};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
