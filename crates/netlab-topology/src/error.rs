// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use netlab_core::{ErrorCategory, HasCategory};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("invalid topology yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid topology json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("link {link_name:?} must have exactly two endpoints, found {found}")]
    WrongEndpointCount { link_name: String, found: usize },

    #[error("link {link_name:?} references unknown node {node_name:?}")]
    UnknownNode { link_name: String, node_name: String },

    #[error("duplicate node name {0:?}")]
    DuplicateNode(String),
}

impl HasCategory for TopologyError {
    fn category(&self) -> ErrorCategory {
        match self {
            TopologyError::Yaml(_) | TopologyError::Json(_) => ErrorCategory::Validation,
            TopologyError::WrongEndpointCount { .. }
            | TopologyError::UnknownNode { .. }
            | TopologyError::DuplicateNode(_) => ErrorCategory::Validation,
        }
    }
}
