// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registered agent hosts: the machines a lab's nodes and links are placed on.

use crate::ids::HostId;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

crate::simple_display! {
    HostStatus {
        Online => "online",
        Offline => "offline",
        Degraded => "degraded",
    }
}

/// Liveness of a host as tracked by the AgentClient health-check loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostStatus {
    Online,
    Offline,
    Degraded,
}

/// A machine running the remote agent that creates containers, links, and
/// VXLAN tunnels on the control plane's behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub id: HostId,
    pub address: String,
    pub capabilities: Json,
    pub image_sync_strategy: String,
    pub last_heartbeat: Option<u64>,
    pub status: HostStatus,
    pub resource_usage: Json,
    pub last_error: Option<String>,
    pub error_since: Option<u64>,
}

impl Host {
    /// The bare IP/hostname an overlay tunnel should dial, stripping any
    /// `scheme://` and `:port` suffix from `address`.
    pub fn overlay_ip(&self) -> &str {
        let without_scheme = self.address.split("://").next_back().unwrap_or(&self.address);
        without_scheme.split(':').next().unwrap_or(without_scheme)
    }

    pub fn is_online(&self) -> bool {
        self.status == HostStatus::Online
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct HostBuilder => Host {
        set { id: HostId = HostId::new() }
        into { address: String = "http://10.0.0.1:7000" }
        set { capabilities: Json = Json::Null }
        into { image_sync_strategy: String = "pull" }
        option { last_heartbeat: u64 = None }
        set { status: HostStatus = HostStatus::Online }
        set { resource_usage: Json = Json::Null }
        option { last_error: String = None }
        option { error_since: u64 = None }
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
