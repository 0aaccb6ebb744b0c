// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run record and status state machine.

use crate::id::{RunId, ScheduleId};
use crate::task::Options;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Status of a run. Moves strictly forward:
/// `queued → running → {succeeded, failed, canceled}`, with `queued →
/// canceled` as the only shortcut (a run canceled before it ever started).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Succeeded | RunStatus::Failed | RunStatus::Canceled
        )
    }

    /// Whether a transition to `next` is legal.
    pub fn can_transition(self, next: RunStatus) -> bool {
        match self {
            RunStatus::Queued => matches!(next, RunStatus::Running | RunStatus::Canceled),
            RunStatus::Running => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Queued => write!(f, "queued"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Succeeded => write!(f, "succeeded"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// Attempted illegal status transition.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("run {run_id}: illegal status transition {from} -> {to}")]
pub struct RunStatusError {
    pub run_id: RunId,
    pub from: RunStatus,
    pub to: RunStatus,
}

/// One execution instance of a task.
///
/// Created when a submission passes validation and policy; mutated only by
/// the executor worker via [`Run::advance`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub task_id: String,
    /// Validated, normalized options the run executes with.
    pub options: Options,
    /// Schedule that fired this run; `None` for manual submissions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_id: Option<ScheduleId>,
    /// Who asked for this run ("scheduler" or an operator name).
    pub triggered_by: String,
    pub status: RunStatus,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    /// Failure summary for `failed` runs (full detail lives in the run log).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Run {
    pub fn new(
        id: RunId,
        task_id: impl Into<String>,
        options: Options,
        schedule_id: Option<ScheduleId>,
        triggered_by: impl Into<String>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            task_id: task_id.into(),
            options,
            schedule_id,
            triggered_by: triggered_by.into(),
            status: RunStatus::Queued,
            created_at_ms,
            started_at_ms: None,
            finished_at_ms: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_manual(&self) -> bool {
        self.schedule_id.is_none()
    }

    /// Timestamp used for newest-first ordering in listings.
    pub fn sort_key_ms(&self) -> u64 {
        self.started_at_ms.unwrap_or(self.created_at_ms)
    }

    /// Advance the status, recording the matching timestamp.
    ///
    /// Rejects any transition [`RunStatus::can_transition`] does not allow,
    /// so replayed journals and racing callers cannot move a run backward.
    pub fn advance(&mut self, to: RunStatus, at_ms: u64) -> Result<(), RunStatusError> {
        if !self.status.can_transition(to) {
            return Err(RunStatusError {
                run_id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        match to {
            RunStatus::Running => self.started_at_ms = Some(at_ms),
            _ => self.finished_at_ms = Some(at_ms),
        }
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
