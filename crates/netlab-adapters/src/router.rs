// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RuntimeRouter` — resolves a [`HostId`] to the [`AgentClient`] that
//! talks to it. One client per registered agent, built once at
//! registration time and reused for the agent's lifetime.

use netlab_core::HostId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::client::AgentClient;
use crate::error::AgentClientError;

/// Maps a registered agent to the client instance that reaches it. Tests
/// register `FakeAgentClient`s; production registers `HttpAgentClient`s
/// built from each host's `overlay_ip`/port at registration time.
#[derive(Clone, Default)]
pub struct RuntimeRouter {
    clients: Arc<RwLock<HashMap<HostId, Arc<dyn AgentClient>>>>,
}

impl RuntimeRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, host_id: HostId, client: Arc<dyn AgentClient>) {
        self.clients.write().insert(host_id, client);
    }

    pub fn deregister(&self, host_id: HostId) {
        self.clients.write().remove(&host_id);
    }

    pub fn get(&self, host_id: HostId) -> Result<Arc<dyn AgentClient>, AgentClientError> {
        self.clients
            .read()
            .get(&host_id)
            .cloned()
            .ok_or(AgentClientError::NoRoute(host_id))
    }

    pub fn registered_hosts(&self) -> Vec<HostId> {
        self.clients.read().keys().copied().collect()
    }
}
