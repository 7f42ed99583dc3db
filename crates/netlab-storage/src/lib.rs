// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! netlab-storage: the durable store the rest of the control plane treats
//! as a relational database (§4.1).
//!
//! What's actually here is an append-only event log (the write-ahead
//! [`wal::Wal`]) plus an in-process [`state::MaterializedState`] cache kept
//! current by the same [`event::Event`]-driven dispatcher used for replay
//! after a restart. [`repository::Repository`] is the façade every other
//! crate talks to; it hides whether a read came from the cache or the log
//! replayed into it. Schema migrations for the durable store itself are out
//! of scope — [`migration`] only handles this crate's own on-disk snapshot
//! format evolving across releases.

pub mod error;
pub mod event;
pub mod migration;
pub mod repository;
pub mod state;
pub mod wal;

pub use error::StorageError;
pub use event::Event;
pub use migration::{Migration, MigrationError, MigrationRegistry};
pub use repository::{LinkRowGuard, Repository};
pub use state::MaterializedState;
pub use wal::{Wal, WalEntry};
