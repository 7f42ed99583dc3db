// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! netlab-adapters: the typed façade over a single agent's HTTP API
//! (§4.2), plus the routing, retry, and health-check machinery that sits
//! around it.
//!
//! Nothing here knows about the persistence layer or job orchestration —
//! `netlab-engine` owns turning an `AgentClient` call's outcome into a
//! state transition. This crate's job is to make calling an agent look
//! identical whether it's the real `HttpAgentClient` or the
//! `FakeAgentClient` test double.

pub mod client;
pub mod console;
pub mod error;
pub mod health;
pub mod http;
pub mod retry;
pub mod router;

pub use client::{
    policy_for, timeouts, AgentClient, AgentOperation, AgentResult, PortStateDeclaration,
    RetryPolicy, DEFAULT_BACKOFF_CAP, DEFAULT_MAX_ATTEMPTS,
};
pub use console::{proxy, ByteDuplex, ConsoleStream};
pub use error::AgentClientError;
pub use http::HttpAgentClient;
pub use retry::with_retry;
pub use router::RuntimeRouter;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{AgentCall, FakeAgentClient};
