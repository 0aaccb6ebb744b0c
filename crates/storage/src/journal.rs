// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL event journal.
//!
//! Every state change is appended here before it is applied, one JSON line
//! per event: `{"seq":N,"event":{...}}`. Each append is fsynced before it
//! returns. Recovery is snapshot + replay of entries after the snapshot's
//! sequence number.

use prep_core::Event;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur in journal operations
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialization helper for writing entries without cloning the event.
#[derive(Serialize)]
struct RecordRef<'a> {
    seq: u64,
    event: &'a Event,
}

#[derive(Deserialize)]
struct Record {
    seq: u64,
    event: Event,
}

/// A journaled event with its sequence number.
#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub seq: u64,
    pub event: Event,
}

/// Append-only JSONL journal of engine events.
pub struct Journal {
    file: File,
    path: PathBuf,
    /// Highest sequence number written
    seq: u64,
}

impl Journal {
    /// Open or create a journal, returning it together with every entry it
    /// holds.
    ///
    /// A torn tail (partial last line from an unclean shutdown) is dropped:
    /// the on-disk file is rotated to `.bak` and rewritten with only the
    /// parseable prefix.
    pub fn open(path: &Path) -> Result<(Self, Vec<JournalEntry>), JournalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let (entries, torn) = read_entries(&file)?;

        let file = if torn {
            drop(file);
            let bak_path = crate::snapshot::rotate_bak_path(path);
            warn!(
                path = %path.display(),
                bak = %bak_path.display(),
                valid_entries = entries.len(),
                "journal has a torn tail, rotating to .bak and keeping the valid prefix",
            );
            std::fs::rename(path, &bak_path)?;

            let mut clean = File::create(path)?;
            for entry in &entries {
                let record = RecordRef {
                    seq: entry.seq,
                    event: &entry.event,
                };
                let mut line = serde_json::to_vec(&record)?;
                line.push(b'\n');
                clean.write_all(&line)?;
            }
            clean.sync_all()?;
            drop(clean);

            OpenOptions::new()
                .create(true)
                .read(true)
                .append(true)
                .open(path)?
        } else {
            file
        };

        let seq = entries.last().map(|e| e.seq).unwrap_or(0);

        Ok((
            Self {
                file,
                path: path.to_owned(),
                seq,
            },
            entries,
        ))
    }

    /// Append an event and fsync it. Returns the assigned sequence number;
    /// once this returns the event is durable.
    pub fn append(&mut self, event: &Event) -> Result<u64, JournalError> {
        self.seq += 1;
        let record = RecordRef {
            seq: self.seq,
            event,
        };
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.sync_data()?;
        Ok(self.seq)
    }

    /// Highest sequence number written so far.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Raise the sequence counter to at least `floor`.
    ///
    /// A checkpoint truncates the file, so after a restart the file alone
    /// may understate how far numbering has advanced; the snapshot's
    /// sequence restores it.
    pub fn bump_seq_to(&mut self, floor: u64) {
        if floor > self.seq {
            self.seq = floor;
        }
    }

    /// Drop all entries with `seq <= through`, called after a snapshot has
    /// made them redundant. Rewrites via tmp + atomic rename.
    pub fn truncate_through(&mut self, through: u64) -> Result<(), JournalError> {
        let (entries, _) = read_entries(&self.file)?;
        let tmp_path = self.path.with_extension("tmp");

        {
            let mut tmp = File::create(&tmp_path)?;
            for entry in entries.iter().filter(|e| e.seq > through) {
                let record = RecordRef {
                    seq: entry.seq,
                    event: &entry.event,
                };
                let mut line = serde_json::to_vec(&record)?;
                line.push(b'\n');
                tmp.write_all(&line)?;
            }
            tmp.sync_all()?;
        }

        std::fs::rename(&tmp_path, &self.path)?;
        self.file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        Ok(())
    }
}

/// Read all parseable entries from the start of the file.
///
/// Returns `(entries, torn)` where `torn` is true when an unparseable line
/// was hit (reading stops there).
fn read_entries(file: &File) -> Result<(Vec<JournalEntry>, bool), JournalError> {
    let mut reader = BufReader::new(file.try_clone()?);
    reader.seek(SeekFrom::Start(0))?;

    let mut entries = Vec::new();
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::InvalidData => return Ok((entries, true)),
            Err(e) => return Err(e.into()),
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<Record>(trimmed) {
            Ok(record) => entries.push(JournalEntry {
                seq: record.seq,
                event: record.event,
            }),
            Err(_) => return Ok((entries, true)),
        }
    }

    Ok((entries, false))
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
