// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable events: every state change the engine persists.
//!
//! Serializes with a `{"type": "run:queued", ...fields}` format. The
//! journal stores these; `MaterializedState` replays them.

use crate::id::{RunId, ScheduleId};
use crate::run::{Run, RunStatus};
use crate::schedule::Schedule;
use serde::{Deserialize, Serialize};

/// State-changing events, journaled before they are applied.
///
/// Ownership discipline: `run:*` events are written only by the executor,
/// `schedule:fired`/`schedule:recomputed` only by the scheduler, the rest
/// only by API calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- runs --
    #[serde(rename = "run:queued")]
    RunQueued { run: Run },

    #[serde(rename = "run:started")]
    RunStarted { run_id: RunId, at_ms: u64 },

    /// Terminal transition: `status` must be succeeded/failed/canceled.
    #[serde(rename = "run:finished")]
    RunFinished {
        run_id: RunId,
        status: RunStatus,
        at_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    // -- schedules --
    #[serde(rename = "schedule:created")]
    ScheduleCreated { schedule: Schedule },

    #[serde(rename = "schedule:updated")]
    ScheduleUpdated { schedule: Schedule },

    #[serde(rename = "schedule:deleted")]
    ScheduleDeleted { schedule_id: ScheduleId },

    /// A schedule submitted a run. `next_run_at_ms = None` disables the
    /// schedule (a spent `once`, or a cadence with no future boundary).
    #[serde(rename = "schedule:fired")]
    ScheduleFired {
        schedule_id: ScheduleId,
        run_id: RunId,
        at_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        next_run_at_ms: Option<u64>,
    },

    /// Startup catch-up recompute that did not fire.
    #[serde(rename = "schedule:recomputed")]
    ScheduleRecomputed {
        schedule_id: ScheduleId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        next_run_at_ms: Option<u64>,
    },

    // -- policy --
    #[serde(rename = "policy:set")]
    PolicySet {
        task_id: String,
        allow_dangerous: bool,
    },
}

impl Event {
    /// Short name for tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Event::RunQueued { .. } => "run:queued",
            Event::RunStarted { .. } => "run:started",
            Event::RunFinished { .. } => "run:finished",
            Event::ScheduleCreated { .. } => "schedule:created",
            Event::ScheduleUpdated { .. } => "schedule:updated",
            Event::ScheduleDeleted { .. } => "schedule:deleted",
            Event::ScheduleFired { .. } => "schedule:fired",
            Event::ScheduleRecomputed { .. } => "schedule:recomputed",
            Event::PolicySet { .. } => "policy:set",
        }
    }

    /// The run this event concerns, if any.
    pub fn run_id(&self) -> Option<&RunId> {
        match self {
            Event::RunQueued { run } => Some(&run.id),
            Event::RunStarted { run_id, .. } | Event::RunFinished { run_id, .. } => Some(run_id),
            Event::ScheduleFired { run_id, .. } => Some(run_id),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
