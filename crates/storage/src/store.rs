// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event store: journal + snapshot + materialized state, behind one
//! lock.
//!
//! `record` is the engine's single mutation path: the event is journaled
//! first, then applied to the in-memory state. Readers see state only
//! through `with_state`, so they never observe an applied-but-unjournaled
//! change.

use crate::journal::{Journal, JournalError};
use crate::snapshot::{Snapshot, SnapshotError};
use crate::state::MaterializedState;
use parking_lot::Mutex;
use prep_core::Event;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Journal(#[from] JournalError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

struct Inner {
    journal: Journal,
    state: MaterializedState,
}

/// Durable, journaled state store.
pub struct EventStore {
    inner: Mutex<Inner>,
    snapshot_path: PathBuf,
}

impl EventStore {
    pub const JOURNAL_FILE: &'static str = "journal.jsonl";
    pub const SNAPSHOT_FILE: &'static str = "snapshot.json";

    /// Open the store under `data_dir`, recovering state from the snapshot
    /// (if any) plus every journal entry past its sequence number.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let snapshot_path = data_dir.join(Self::SNAPSHOT_FILE);
        let journal_path = data_dir.join(Self::JOURNAL_FILE);

        let snapshot = Snapshot::load(&snapshot_path)?;
        let (snap_seq, mut state) = match snapshot {
            Some(snap) => (snap.seq, snap.state),
            None => (0, MaterializedState::default()),
        };

        let (mut journal, entries) = Journal::open(&journal_path)?;
        journal.bump_seq_to(snap_seq);
        let mut replayed = 0usize;
        for entry in &entries {
            if entry.seq > snap_seq {
                state.apply_event(&entry.event);
                replayed += 1;
            }
        }
        info!(
            snapshot_seq = snap_seq,
            replayed,
            runs = state.runs.len(),
            schedules = state.schedules.len(),
            "event store opened",
        );

        Ok(Self {
            inner: Mutex::new(Inner { journal, state }),
            snapshot_path,
        })
    }

    /// Journal an event, then apply it to the materialized state. Returns
    /// the assigned sequence number.
    pub fn record(&self, event: &Event) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock();
        let seq = inner.journal.append(event)?;
        inner.state.apply_event(event);
        debug!(seq, event = event.name(), "recorded");
        Ok(seq)
    }

    /// Read the materialized state under the store lock.
    pub fn with_state<R>(&self, f: impl FnOnce(&MaterializedState) -> R) -> R {
        let inner = self.inner.lock();
        f(&inner.state)
    }

    /// Snapshot the current state and drop the journal entries it covers.
    /// Returns the sequence number the snapshot captured.
    pub fn checkpoint(&self) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock();
        let seq = inner.journal.seq();
        Snapshot::capture(seq, inner.state.clone()).save(&self.snapshot_path)?;
        inner.journal.truncate_through(seq)?;
        info!(seq, "checkpoint written");
        Ok(seq)
    }

    /// Highest journaled sequence number.
    pub fn seq(&self) -> u64 {
        self.inner.lock().journal.seq()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
