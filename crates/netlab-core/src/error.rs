// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The closed error taxonomy shared by every crate in the workspace.
//!
//! Each crate defines its own `thiserror`-derived error enum for its own
//! failure modes and implements [`HasCategory`] so the taxonomy is enforced
//! by the type system rather than by convention at each call site.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::simple_display! {
    ErrorCategory {
        Network => "network",
        Timeout => "timeout",
        Authentication => "authentication",
        Authorisation => "authorisation",
        NotFound => "not_found",
        Validation => "validation",
        Conflict => "conflict",
        Server => "server",
        Agent => "agent",
        Unknown => "unknown",
    }
}

/// The closed set of error categories used across agent RPC, persistence,
/// and job-surfaced errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Timeout,
    Authentication,
    Authorisation,
    NotFound,
    Validation,
    Conflict,
    Server,
    Agent,
    Unknown,
}

impl ErrorCategory {
    /// Whether an operation in this category may be retried under the
    /// AgentClient backoff policy: only connection-level failures are.
    pub fn is_retriable(self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::Timeout)
    }
}

/// Implemented by every crate-local error enum so callers can map to the
/// shared taxonomy without matching on crate-specific variants.
pub trait HasCategory {
    fn category(&self) -> ErrorCategory;
}

/// A fully-formed error as it crosses a component boundary: category plus a
/// human-readable message and a structured details map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizedError {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(default)]
    pub details: HashMap<String, String>,
}

impl CategorizedError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self { category, message: message.into(), details: HashMap::new() }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Maps this error's category to an HTTP-style status code, for whatever
    /// thin boundary layer (out of scope) ends up exposing these over HTTP.
    pub fn status_code(&self) -> u16 {
        match self.category {
            ErrorCategory::Network | ErrorCategory::Timeout | ErrorCategory::Server => 503,
            ErrorCategory::NotFound => 404,
            ErrorCategory::Conflict => 409,
            ErrorCategory::Validation => 422,
            ErrorCategory::Authentication => 401,
            ErrorCategory::Authorisation => 403,
            ErrorCategory::Agent | ErrorCategory::Unknown => 500,
        }
    }
}

impl std::fmt::Display for CategorizedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

impl std::error::Error for CategorizedError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
