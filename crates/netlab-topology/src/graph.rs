// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The internal node/link graph a declared topology parses into.
//!
//! Ownership is strictly tree-shaped (Design Note §9 "Cyclic graphs"):
//! `Topology` owns its nodes and links, and a link's endpoints reference
//! node *names*, never a pointer back to a `TopologyNode` — resolving a
//! name to the node it names is the caller's job (ultimately the
//! persistence layer's, once a Link declaration is committed).

use crate::error::TopologyError;
use netlab_core::NodeKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A node declaration as it appears in topology YAML/JSON: `{name, kind,
/// image?}`. `kind` flattens [`NodeKind`]'s own tag so `{kind: "linux"}`
/// and `{kind: "router", vendor: "cisco"}` both parse directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyNode {
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// One declared endpoint: `{node, ifname}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyEndpoint {
    pub node: String,
    pub ifname: String,
}

/// A declared link: `{endpoints: [a, b], mtu?}`. `name` is optional on
/// input — an unnamed link is assigned a deterministic name from its
/// sorted endpoint pair at resolve time (see `Topology::resolved_name`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub endpoints: Vec<TopologyEndpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
}

impl TopologyLink {
    /// The link name to use downstream: the declared `name`, or a
    /// deterministic fallback derived from its endpoints so VNI/port-name
    /// allocation (§4.6) is stable even for links the user never named.
    pub fn resolved_name(&self) -> String {
        match &self.name {
            Some(n) => n.clone(),
            None => {
                let mut parts: Vec<String> = self
                    .endpoints
                    .iter()
                    .map(|e| format!("{}:{}", e.node, e.ifname))
                    .collect();
                parts.sort();
                parts.join("-")
            }
        }
    }
}

/// The full declared topology for one lab.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub nodes: Vec<TopologyNode>,
    #[serde(default)]
    pub links: Vec<TopologyLink>,
}

impl Topology {
    /// Structural validation: no duplicate node names, every link
    /// references exactly two existing nodes.
    pub fn validate(&self) -> Result<(), TopologyError> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.name.as_str()) {
                return Err(TopologyError::DuplicateNode(node.name.clone()));
            }
        }
        for link in &self.links {
            if link.endpoints.len() != 2 {
                return Err(TopologyError::WrongEndpointCount {
                    link_name: link.resolved_name(),
                    found: link.endpoints.len(),
                });
            }
            for endpoint in &link.endpoints {
                if !seen.contains(endpoint.node.as_str()) {
                    return Err(TopologyError::UnknownNode {
                        link_name: link.resolved_name(),
                        node_name: endpoint.node.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topo() -> Topology {
        Topology {
            nodes: vec![
                TopologyNode { name: "r1".into(), kind: NodeKind::Linux, image: None },
                TopologyNode { name: "r2".into(), kind: NodeKind::Linux, image: None },
            ],
            links: vec![TopologyLink {
                name: None,
                endpoints: vec![
                    TopologyEndpoint { node: "r1".into(), ifname: "eth1".into() },
                    TopologyEndpoint { node: "r2".into(), ifname: "eth1".into() },
                ],
                mtu: None,
            }],
        }
    }

    #[test]
    fn valid_topology_passes() {
        topo().validate().unwrap();
    }

    #[test]
    fn duplicate_node_name_rejected() {
        let mut t = topo();
        t.nodes.push(TopologyNode { name: "r1".into(), kind: NodeKind::Switch, image: None });
        assert!(matches!(t.validate(), Err(TopologyError::DuplicateNode(n)) if n == "r1"));
    }

    #[test]
    fn link_to_unknown_node_rejected() {
        let mut t = topo();
        t.links[0].endpoints[1].node = "r3".into();
        assert!(matches!(t.validate(), Err(TopologyError::UnknownNode { .. })));
    }

    #[test]
    fn wrong_endpoint_count_rejected() {
        let mut t = topo();
        t.links[0].endpoints.pop();
        assert!(matches!(t.validate(), Err(TopologyError::WrongEndpointCount { found: 1, .. })));
    }

    #[test]
    fn resolved_name_is_deterministic_for_unnamed_links() {
        let link = topo().links.remove(0);
        let a = link.resolved_name();
        let b = link.resolved_name();
        assert_eq!(a, b);
        assert_eq!(a, "r1:eth1-r2:eth1");
    }
}
