// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run append-only log files.
//!
//! Each run gets `<logs_dir>/<run_id>.log`. Handlers stream progress lines
//! into it while the run executes; listings and the dashboard read it back
//! after the fact. Log writes are best-effort output, not durability: a
//! lost line never affects run state.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hands out writers and readers for run log files.
#[derive(Debug, Clone)]
pub struct RunLogStore {
    dir: PathBuf,
}

impl RunLogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{run_id}.log"))
    }

    /// Open an append-mode writer for a run, creating the file (and the
    /// logs directory) on first use.
    pub fn writer(&self, run_id: &str) -> Result<RunLogWriter, RunLogError> {
        fs::create_dir_all(&self.dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(run_id))?;
        Ok(RunLogWriter { file })
    }

    /// Read a run's log, optionally trimmed to the last `tail` lines.
    /// A run that never wrote anything reads as empty.
    pub fn read(&self, run_id: &str, tail: Option<usize>) -> Result<String, RunLogError> {
        let path = self.path_for(run_id);
        if !path.exists() {
            return Ok(String::new());
        }
        let text = fs::read_to_string(&path)?;
        match tail {
            None | Some(0) => Ok(text),
            Some(n) => Ok(tail_lines(&text, n)),
        }
    }

    /// Append a single line outside any writer (recovery annotations).
    pub fn append_line(&self, run_id: &str, line: &str) -> Result<(), RunLogError> {
        self.writer(run_id)?.line(line)
    }
}

fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    let mut out = lines[start..].join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Append-only handle to one run's log file.
#[derive(Debug)]
pub struct RunLogWriter {
    file: File,
}

impl RunLogWriter {
    /// Append one line, adding the trailing newline.
    pub fn line(&mut self, text: &str) -> Result<(), RunLogError> {
        self.file.write_all(text.as_bytes())?;
        self.file.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), RunLogError> {
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "run_log_tests.rs"]
mod tests;
