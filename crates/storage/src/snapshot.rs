// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic snapshots of the materialized state.
//!
//! A snapshot records the full state together with the journal sequence
//! number it covers. On startup the store loads the latest snapshot and
//! replays only the journal entries past that sequence, which keeps
//! restart time bounded regardless of history length.

use crate::MaterializedState;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Materialized state frozen at a journal sequence number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Journal sequence covered by this snapshot
    pub seq: u64,
    /// Wall-clock capture time, milliseconds since the Unix epoch
    pub taken_at_ms: u64,
    /// The complete materialized state
    pub state: MaterializedState,
}

impl Snapshot {
    pub fn capture(seq: u64, state: MaterializedState) -> Self {
        let taken_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            seq,
            taken_at_ms,
            state,
        }
    }

    /// Save the snapshot atomically (write to `.tmp`, sync, rename).
    ///
    /// A crash during save leaves the previous snapshot intact.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let bytes = serde_json::to_vec(self)?;
        let tmp_path = path.with_extension("tmp");
        let mut file = File::create(&tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp_path, path)?;

        Ok(())
    }

    /// Load the snapshot if one exists.
    ///
    /// Returns `Ok(None)` when the file is missing or corrupt. A corrupt
    /// snapshot is moved aside to a `.bak` file; the caller then rebuilds
    /// from the journal alone.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                let bak_path = rotate_bak_path(path);
                warn!(
                    error = %e,
                    path = %path.display(),
                    bak = %bak_path.display(),
                    "Corrupt snapshot, moving aside and rebuilding from journal",
                );
                fs::rename(path, &bak_path)?;
                Ok(None)
            }
        }
    }
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps at most [`MAX_BAK_FILES`] backups (`.bak`, `.bak.2`, `.bak.3`);
/// the oldest is dropped when the limit is reached.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let slots: Vec<PathBuf> = (1..=MAX_BAK_FILES)
        .map(|n| match n {
            1 => path.with_extension("bak"),
            n => path.with_extension(format!("bak.{n}")),
        })
        .collect();

    // Drop the last slot and shift the rest toward it, newest-first.
    if let Some(oldest) = slots.last() {
        let _ = fs::remove_file(oldest);
    }
    for pair in slots.windows(2).rev() {
        if pair[0].exists() {
            let _ = fs::rename(&pair[0], &pair[1]);
        }
    }

    slots[0].clone()
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
