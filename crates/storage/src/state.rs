// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state replayed from the journal.
//!
//! Holds every run, schedule, and task policy. Mutation happens only in
//! [`MaterializedState::apply_event`], so replaying the journal from the
//! last snapshot reproduces exactly the state at the crash point.

use prep_core::{Event, Run, RunId, RunStatus, Schedule, TaskPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Which runs a listing should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunFilter {
    #[default]
    All,
    /// Runs submitted by an operator.
    Manual,
    /// Runs fired by a schedule.
    Scheduled,
}

impl RunFilter {
    fn matches(self, run: &Run) -> bool {
        match self {
            RunFilter::All => true,
            RunFilter::Manual => run.is_manual(),
            RunFilter::Scheduled => !run.is_manual(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterializedState {
    pub runs: HashMap<String, Run>,
    pub schedules: HashMap<String, Schedule>,
    #[serde(default)]
    pub policies: HashMap<String, TaskPolicy>,
}

impl MaterializedState {
    /// Get a run by ID or unique prefix (like git commit hashes).
    pub fn get_run(&self, id: &str) -> Option<&Run> {
        if let Some(run) = self.runs.get(id) {
            return Some(run);
        }

        let mut matches = self.runs.iter().filter(|(k, _)| k.starts_with(id));
        match (matches.next(), matches.next()) {
            // Only unambiguous prefixes resolve
            (Some((_, run)), None) => Some(run),
            _ => None,
        }
    }

    /// Get a schedule by ID or unique prefix.
    pub fn get_schedule(&self, id: &str) -> Option<&Schedule> {
        if let Some(schedule) = self.schedules.get(id) {
            return Some(schedule);
        }

        let mut matches = self.schedules.iter().filter(|(k, _)| k.starts_with(id));
        match (matches.next(), matches.next()) {
            (Some((_, schedule)), None) => Some(schedule),
            _ => None,
        }
    }

    /// List runs newest-first, optionally narrowed by origin and a free-text
    /// search over run ID, task ID, status, and task title. `title_of`
    /// resolves a task ID to its display title; the catalog lives above
    /// this crate.
    pub fn list_runs<'a, F>(
        &'a self,
        filter: RunFilter,
        search: Option<&str>,
        mut title_of: F,
    ) -> Vec<&'a Run>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let needle = search.map(str::to_lowercase);
        let mut runs: Vec<&Run> = self
            .runs
            .values()
            .filter(|run| filter.matches(run))
            .filter(|run| match &needle {
                None => true,
                Some(needle) => {
                    run.id.as_str().to_lowercase().contains(needle.as_str())
                        || run.task_id.to_lowercase().contains(needle.as_str())
                        || run.status.to_string().contains(needle.as_str())
                        || title_of(&run.task_id)
                            .is_some_and(|t| t.to_lowercase().contains(needle.as_str()))
                }
            })
            .collect();
        runs.sort_by(|a, b| {
            b.sort_key_ms()
                .cmp(&a.sort_key_ms())
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        runs
    }

    /// The queued or running run a schedule already has in flight, if any.
    /// Schedules never stack runs, so at most one can be active.
    pub fn active_run_for_schedule(&self, schedule_id: &str) -> Option<&Run> {
        self.runs.values().find(|run| {
            !run.is_terminal()
                && run
                    .schedule_id
                    .as_ref()
                    .is_some_and(|sid| sid.as_str() == schedule_id)
        })
    }

    /// Runs that were mid-execution when the process died.
    pub fn interrupted_runs(&self) -> Vec<RunId> {
        self.runs
            .values()
            .filter(|run| run.status == RunStatus::Running)
            .map(|run| run.id.clone())
            .collect()
    }

    /// Queued runs in submission order, for re-enqueueing at startup.
    pub fn queued_runs(&self) -> Vec<&Run> {
        let mut queued: Vec<&Run> = self
            .runs
            .values()
            .filter(|run| run.status == RunStatus::Queued)
            .collect();
        queued.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        queued
    }

    /// Effective policy for a task. Tasks without an explicit entry get the
    /// default (dangerous options locked).
    pub fn policy_for(&self, task_id: &str) -> TaskPolicy {
        self.policies.get(task_id).copied().unwrap_or_default()
    }

    /// Apply a single event.
    ///
    /// Must be infallible: the journal has already accepted the event, so a
    /// record that no longer applies cleanly is logged and skipped rather
    /// than aborting replay.
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::RunQueued { run } => {
                self.runs.insert(run.id.to_string(), run.clone());
            }
            Event::RunStarted { run_id, at_ms } => {
                self.advance_run(run_id, RunStatus::Running, *at_ms, None);
            }
            Event::RunFinished {
                run_id,
                status,
                at_ms,
                error,
            } => {
                self.advance_run(run_id, *status, *at_ms, error.clone());
            }

            Event::ScheduleCreated { schedule } | Event::ScheduleUpdated { schedule } => {
                self.schedules
                    .insert(schedule.id.to_string(), schedule.clone());
            }
            Event::ScheduleDeleted { schedule_id } => {
                self.schedules.remove(schedule_id.as_str());
            }
            Event::ScheduleFired {
                schedule_id,
                at_ms,
                next_run_at_ms,
                ..
            } => {
                if let Some(schedule) = self.schedules.get_mut(schedule_id.as_str()) {
                    schedule.last_run_at_ms = Some(*at_ms);
                    match next_run_at_ms {
                        Some(next) => schedule.next_run_at_ms = *next,
                        None => schedule.enabled = false,
                    }
                }
            }
            Event::ScheduleRecomputed {
                schedule_id,
                next_run_at_ms,
            } => {
                if let Some(schedule) = self.schedules.get_mut(schedule_id.as_str()) {
                    match next_run_at_ms {
                        Some(next) => schedule.next_run_at_ms = *next,
                        None => schedule.enabled = false,
                    }
                }
            }

            Event::PolicySet {
                task_id,
                allow_dangerous,
            } => {
                self.policies.insert(
                    task_id.clone(),
                    TaskPolicy {
                        allow_dangerous: *allow_dangerous,
                    },
                );
            }
        }
    }

    fn advance_run(&mut self, run_id: &RunId, to: RunStatus, at_ms: u64, error: Option<String>) {
        let Some(run) = self.runs.get_mut(run_id.as_str()) else {
            warn!(run_id = %run_id, "event references unknown run, skipping");
            return;
        };
        if let Err(e) = run.advance(to, at_ms) {
            warn!(error = %e, "stale run transition in journal, skipping");
            return;
        }
        if error.is_some() {
            run.error = error;
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
