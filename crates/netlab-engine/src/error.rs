// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestration layer's error taxonomy: wraps storage and agent
//! failures under the shared category, plus the engine's own invariant
//! violations (missing placement, reservation conflicts).

use netlab_adapters::AgentClientError;
use netlab_core::{ErrorCategory, HasCategory};
use netlab_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Agent(#[from] AgentClientError),

    #[error("missing host placement for one or more endpoints")]
    MissingPlacement,

    #[error("reservation conflict: {0}")]
    ReservationConflict(String),

    #[error("no route to agent for link")]
    NoRoute,

    #[error("overlay attach failed: {0}")]
    OverlayAttachFailed(String),

    #[error("no link state matches node {node} interface {interface}")]
    LinkEndpointNotFound { node: String, interface: String },
}

impl HasCategory for EngineError {
    fn category(&self) -> ErrorCategory {
        match self {
            EngineError::Storage(e) => e.category(),
            EngineError::Agent(e) => e.category(),
            EngineError::MissingPlacement
            | EngineError::ReservationConflict(_)
            | EngineError::LinkEndpointNotFound { .. } => ErrorCategory::Validation,
            EngineError::NoRoute | EngineError::OverlayAttachFailed(_) => ErrorCategory::Agent,
        }
    }
}
