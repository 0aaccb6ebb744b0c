// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! prep-storage: durable run history, schedules, and policies.
//!
//! Layout: a JSONL event journal (the durability point), a JSON snapshot
//! for fast startup, materialized in-memory state replayed from both, and
//! per-run append-only log files.

mod journal;
mod run_log;
mod snapshot;
mod state;
mod store;

pub use journal::{Journal, JournalEntry, JournalError};
pub use run_log::{RunLogError, RunLogStore, RunLogWriter};
pub use snapshot::{Snapshot, SnapshotError};
pub use state::{MaterializedState, RunFilter};
pub use store::{EventStore, StoreError};
