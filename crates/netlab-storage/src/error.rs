// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use netlab_core::{ErrorCategory, HasCategory};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("row locked: {0}")]
    Locked(String),

    #[error("wal io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wal serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("migration error: {0}")]
    Migration(#[from] crate::migration::MigrationError),
}

impl HasCategory for StorageError {
    fn category(&self) -> ErrorCategory {
        match self {
            StorageError::NotFound(_) => ErrorCategory::NotFound,
            StorageError::Conflict(_) | StorageError::Locked(_) => ErrorCategory::Conflict,
            StorageError::Io(_) | StorageError::Serde(_) | StorageError::Migration(_) => {
                ErrorCategory::Server
            }
        }
    }
}
