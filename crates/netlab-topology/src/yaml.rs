// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! YAML and graph-JSON (de)serialization of a [`Topology`].

use crate::error::TopologyError;
use crate::graph::Topology;

pub fn from_yaml(input: &str) -> Result<Topology, TopologyError> {
    let topo: Topology = serde_yaml::from_str(input)?;
    topo.validate()?;
    Ok(topo)
}

pub fn to_yaml(topology: &Topology) -> Result<String, TopologyError> {
    Ok(serde_yaml::to_string(topology)?)
}

pub fn from_graph_json(input: &str) -> Result<Topology, TopologyError> {
    let topo: Topology = serde_json::from_str(input)?;
    topo.validate()?;
    Ok(topo)
}

pub fn to_graph_json(topology: &Topology) -> Result<String, TopologyError> {
    Ok(serde_json::to_string_pretty(topology)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = "\
nodes:
- name: r1
  kind: linux
- name: r2
  kind: linux
links:
- endpoints:
  - node: r1
    ifname: eth1
  - node: r2
    ifname: eth1
";

    #[test]
    fn parses_the_scenario_s1_topology() {
        let topo = from_yaml(YAML).unwrap();
        assert_eq!(topo.nodes.len(), 2);
        assert_eq!(topo.links.len(), 1);
        assert_eq!(topo.links[0].endpoints[0].node, "r1");
    }

    #[test]
    fn yaml_json_yaml_round_trip_is_stable() {
        let topo = from_yaml(YAML).unwrap();
        let canonical_yaml = to_yaml(&topo).unwrap();

        let reparsed_from_yaml = from_yaml(&canonical_yaml).unwrap();
        let json = to_graph_json(&reparsed_from_yaml).unwrap();
        let from_json = from_graph_json(&json).unwrap();
        let round_tripped_yaml = to_yaml(&from_json).unwrap();

        assert_eq!(canonical_yaml, round_tripped_yaml);
    }

    #[test]
    fn rejects_invalid_topology_on_parse() {
        let bad = "\
nodes:
- name: r1
  kind: linux
links:
- endpoints:
  - node: r1
    ifname: eth1
  - node: r2
    ifname: eth1
";
        let err = from_yaml(bad).unwrap_err();
        assert!(matches!(err, TopologyError::UnknownNode { .. }));
    }
}
