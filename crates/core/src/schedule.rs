// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule definitions and cadence boundary math.
//!
//! A schedule owns *when* runs happen; the scheduler in the engine crate
//! owns *whether* a given tick fires. Interval boundaries are anchored
//! multiples of the period (never `now + seconds`), so a late tick does not
//! shift the cadence.

use crate::cron::CronExpr;
use crate::id::ScheduleId;
use crate::task::Options;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from validating a schedule definition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("interval must be at least 1 second")]
    ZeroInterval,
    #[error("schedule name must not be empty")]
    EmptyName,
    #[error(transparent)]
    Cron(#[from] crate::cron::CronError),
}

/// Cadence of a schedule. The tag determines which fields are meaningful;
/// the other kinds' fields simply do not exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScheduleKind {
    /// Fixed period anchored at `start_at_ms` (or creation time).
    Interval {
        seconds: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_at_ms: Option<u64>,
    },
    /// 5-field cron expression, evaluated in UTC.
    Cron { expr: CronExpr },
    /// Single fire at an absolute timestamp; disables itself afterwards.
    Once { run_at_ms: u64 },
}

impl ScheduleKind {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        match self {
            ScheduleKind::Interval { seconds: 0, .. } => Err(ScheduleError::ZeroInterval),
            _ => Ok(()),
        }
    }

    /// Next boundary strictly after `after_ms`.
    ///
    /// `anchor_ms` is the schedule's creation time, used as the interval
    /// anchor when no `start_at_ms` was given. Returns `None` when no
    /// boundary remains (a spent `once`, or an unsatisfiable cron).
    pub fn next_after(&self, after_ms: u64, anchor_ms: u64) -> Option<u64> {
        match self {
            ScheduleKind::Interval { seconds, start_at_ms } => {
                let period = seconds.saturating_mul(1_000).max(1);
                let anchor = start_at_ms.unwrap_or(anchor_ms);
                if after_ms < anchor {
                    Some(anchor)
                } else {
                    let elapsed = (after_ms - anchor) / period;
                    Some(anchor + (elapsed + 1) * period)
                }
            }
            ScheduleKind::Cron { expr } => expr.next_after_ms(after_ms),
            ScheduleKind::Once { run_at_ms } => (*run_at_ms > after_ms).then_some(*run_at_ms),
        }
    }

    /// Next boundary at or after `at_ms` (a boundary landing exactly on
    /// `at_ms` counts).
    pub fn next_at_or_after(&self, at_ms: u64, anchor_ms: u64) -> Option<u64> {
        self.next_after(at_ms.saturating_sub(1), anchor_ms)
    }

    /// The boundary a newly created schedule waits for.
    pub fn initial_next_run(&self, created_at_ms: u64) -> Option<u64> {
        match self {
            // A `once` in the past is due immediately rather than never
            ScheduleKind::Once { run_at_ms } => Some(*run_at_ms),
            _ => self.next_after(created_at_ms, created_at_ms),
        }
    }
}

/// Parameters for creating or editing a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub name: String,
    pub task_id: String,
    #[serde(flatten)]
    pub kind: ScheduleKind,
    #[serde(default)]
    pub options: Options,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub catch_up: bool,
}

fn default_true() -> bool {
    true
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.name.trim().is_empty() {
            return Err(ScheduleError::EmptyName);
        }
        self.kind.validate()
    }
}

/// A stored schedule.
///
/// `next_run_at_ms` and `last_run_at_ms` are owned exclusively by the
/// scheduler; the executor never touches them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub name: String,
    pub task_id: String,
    #[serde(flatten)]
    pub kind: ScheduleKind,
    #[serde(default)]
    pub options: Options,
    pub enabled: bool,
    #[serde(default)]
    pub catch_up: bool,
    pub created_at_ms: u64,
    pub next_run_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at_ms: Option<u64>,
}

impl Schedule {
    /// Build a schedule from a validated config.
    pub fn new(id: ScheduleId, config: ScheduleConfig, created_at_ms: u64) -> Self {
        let next_run_at_ms = config
            .kind
            .initial_next_run(created_at_ms)
            .unwrap_or(created_at_ms);
        Self {
            id,
            name: config.name,
            task_id: config.task_id,
            kind: config.kind,
            options: config.options,
            enabled: config.enabled,
            catch_up: config.catch_up,
            created_at_ms,
            next_run_at_ms,
            last_run_at_ms: None,
        }
    }

    /// Apply an edit, recomputing `next_run_at_ms` under the new cadence so
    /// it is never left stale from the prior configuration.
    ///
    /// An interval edit without an explicit `start_at_ms` is anchored at
    /// the edit instant. Later fires recompute from the same anchor, so
    /// the first post-edit gap already equals the new period instead of
    /// snapping back to the creation-time grid.
    pub fn apply_edit(&mut self, config: ScheduleConfig, now_ms: u64) {
        self.name = config.name;
        self.task_id = config.task_id;
        self.kind = match config.kind {
            ScheduleKind::Interval {
                seconds,
                start_at_ms: None,
            } => ScheduleKind::Interval {
                seconds,
                start_at_ms: Some(now_ms),
            },
            kind => kind,
        };
        self.options = config.options;
        self.enabled = config.enabled;
        self.catch_up = config.catch_up;
        match self.kind.initial_next_run(now_ms) {
            Some(next) => self.next_run_at_ms = next,
            None => self.enabled = false,
        }
    }

    /// Whether this schedule is due at `now_ms`.
    pub fn is_due(&self, now_ms: u64) -> bool {
        self.enabled && now_ms >= self.next_run_at_ms
    }

    /// Boundary strictly after `after_ms` under this schedule's cadence.
    pub fn next_after(&self, after_ms: u64) -> Option<u64> {
        self.kind.next_after(after_ms, self.created_at_ms)
    }

    /// Boundary at or after `at_ms` under this schedule's cadence.
    pub fn next_at_or_after(&self, at_ms: u64) -> Option<u64> {
        self.kind.next_at_or_after(at_ms, self.created_at_ms)
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
