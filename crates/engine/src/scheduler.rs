// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule evaluation: the periodic tick and the restart recompute.
//!
//! A tick fires each due schedule at most once, no matter how many
//! boundaries elapsed since the last pass; the recorded `next_run_at`
//! always lands strictly in the future. A schedule whose previous run is
//! still queued or running skips the boundary without advancing, so it
//! retries on the next tick instead of stacking runs.

use crate::error::EngineError;
use crate::executor::Executor;
use crate::gate;
use crate::registry::TaskRegistry;
use prep_core::{Clock, Event, IdGen, Run, RunId, Schedule};
use prep_storage::EventStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

pub(crate) struct Scheduler {
    store: Arc<EventStore>,
    registry: Arc<TaskRegistry>,
    executor: Arc<Executor>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGen>,
    wake: Notify,
    stopping: AtomicBool,
}

impl Scheduler {
    pub(crate) fn new(
        store: Arc<EventStore>,
        registry: Arc<TaskRegistry>,
        executor: Arc<Executor>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGen>,
    ) -> Self {
        Self {
            store,
            registry,
            executor,
            clock,
            ids,
            wake: Notify::new(),
            stopping: AtomicBool::new(false),
        }
    }

    /// One scheduler pass: fire every due schedule once.
    pub(crate) fn tick(&self) -> Result<Vec<RunId>, EngineError> {
        let now = self.clock.epoch_ms();
        let mut due: Vec<Schedule> = self.store.with_state(|state| {
            state
                .schedules
                .values()
                .filter(|s| s.is_due(now))
                .cloned()
                .collect()
        });
        due.sort_by(|a, b| {
            a.next_run_at_ms
                .cmp(&b.next_run_at_ms)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });

        let mut fired = Vec::new();
        for schedule in due {
            if let Some(run_id) = self.fire(&schedule, now)? {
                fired.push(run_id);
            }
        }
        Ok(fired)
    }

    /// Fire one due schedule, or skip it while its previous run is active.
    fn fire(&self, schedule: &Schedule, now_ms: u64) -> Result<Option<RunId>, EngineError> {
        let active = self
            .store
            .with_state(|state| state.active_run_for_schedule(schedule.id.as_str()).is_some());
        if active {
            // next_run_at stays put; the next tick retries
            debug!(
                schedule_id = %schedule.id,
                "previous run still active, holding this boundary",
            );
            return Ok(None);
        }

        // Advances past every boundary that elapsed while we were away
        let next = schedule.next_after(now_ms);

        let options = match self
            .registry
            .validate_submission(&schedule.task_id, &schedule.options)
            .and_then(|options| {
                let def = self.registry.definition(&schedule.task_id)?;
                let policy = self
                    .store
                    .with_state(|state| state.policy_for(&schedule.task_id));
                gate::authorize(def, &options, &policy)?;
                Ok(options)
            }) {
            Ok(options) => options,
            Err(e) => {
                // The schedule still advances so a broken one cannot wedge
                // the tick loop retrying the same boundary forever.
                warn!(
                    schedule_id = %schedule.id,
                    error = %e,
                    "schedule cannot fire, advancing without a run",
                );
                self.store.record(&Event::ScheduleRecomputed {
                    schedule_id: schedule.id.clone(),
                    next_run_at_ms: next,
                })?;
                return Ok(None);
            }
        };

        let run_id = RunId::new(self.ids.next());
        let run = Run::new(
            run_id.clone(),
            schedule.task_id.clone(),
            options,
            Some(schedule.id.clone()),
            "scheduler",
            now_ms,
        );
        self.store.record(&Event::RunQueued { run })?;
        self.store.record(&Event::ScheduleFired {
            schedule_id: schedule.id.clone(),
            run_id: run_id.clone(),
            at_ms: now_ms,
            next_run_at_ms: next,
        })?;
        self.executor.enqueue(run_id.clone());
        info!(
            schedule_id = %schedule.id,
            run_id = %run_id,
            next_run_at_ms = next,
            "schedule fired",
        );
        Ok(Some(run_id))
    }

    /// Restart reconciliation for schedules whose `next_run_at` passed
    /// while the daemon was down.
    ///
    /// `catch_up` schedules keep the stale cursor, so the missed boundary
    /// fires exactly once on the first tick. The rest jump to the first
    /// boundary at or after `now` without running anything.
    pub(crate) fn recompute_after_restart(&self) -> Result<(), EngineError> {
        let now = self.clock.epoch_ms();
        let stale: Vec<Schedule> = self.store.with_state(|state| {
            state
                .schedules
                .values()
                .filter(|s| s.enabled && s.next_run_at_ms < now && !s.catch_up)
                .cloned()
                .collect()
        });

        for schedule in stale {
            let next = schedule.next_at_or_after(now);
            info!(
                schedule_id = %schedule.id,
                stale_next_run_at_ms = schedule.next_run_at_ms,
                next_run_at_ms = next,
                "skipping boundaries missed while down",
            );
            self.store.record(&Event::ScheduleRecomputed {
                schedule_id: schedule.id.clone(),
                next_run_at_ms: next,
            })?;
        }
        Ok(())
    }

    pub(crate) fn shutdown(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    /// Tick on a fixed period until shutdown.
    pub(crate) async fn tick_loop(self: Arc<Self>, period: Duration) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(period) => {}
                _ = self.wake.notified() => {}
            }
            if self.stopping.load(Ordering::SeqCst) {
                break;
            }
            if let Err(e) = self.tick() {
                error!(error = %e, "scheduler tick failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
