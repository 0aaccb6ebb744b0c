// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine facade.
//!
//! Owns the store, registry, executor, and scheduler; the daemon talks
//! only to this type. `open` performs crash recovery before anything can
//! observe the state; `start` spawns the worker and tick loops.

use crate::error::EngineError;
use crate::executor::Executor;
use crate::gate;
use crate::registry::TaskRegistry;
use crate::scheduler::Scheduler;
use parking_lot::Mutex;
use prep_core::{
    Clock, Event, IdGen, Options, Run, RunId, RunStatus, Schedule, ScheduleConfig, ScheduleId,
    TaskCatalog, TaskPolicy,
};
use prep_storage::{EventStore, RunFilter, RunLogStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Engine settings supplied by the daemon.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding the journal, snapshot, and run logs.
    pub data_dir: PathBuf,
    /// Scheduler tick period.
    pub tick_interval: Duration,
}

impl EngineConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            tick_interval: Duration::from_secs(1),
        }
    }
}

pub struct Engine {
    store: Arc<EventStore>,
    registry: Arc<TaskRegistry>,
    logs: RunLogStore,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGen>,
    executor: Arc<Executor>,
    scheduler: Arc<Scheduler>,
    tick_interval: Duration,
    loops: Mutex<Vec<JoinHandle<()>>>,
}

impl Engine {
    /// Open the engine, running crash recovery.
    ///
    /// Recovery order matters: interrupted runs are failed first, queued
    /// runs re-enter the queue in submission order, and only then are
    /// stale schedules reconciled, so a schedule whose run survived the
    /// restart as `queued` is still seen as active by the first tick.
    pub fn open(
        config: EngineConfig,
        registry: TaskRegistry,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGen>,
    ) -> Result<Self, EngineError> {
        let store = Arc::new(EventStore::open(&config.data_dir)?);
        let logs = RunLogStore::new(config.data_dir.join("logs"));
        let registry = Arc::new(registry);

        let executor = Arc::new(Executor::new(
            store.clone(),
            registry.clone(),
            logs.clone(),
            clock.clone(),
        ));
        let scheduler = Arc::new(Scheduler::new(
            store.clone(),
            registry.clone(),
            executor.clone(),
            clock.clone(),
            ids.clone(),
        ));

        let engine = Self {
            store,
            registry,
            logs,
            clock,
            ids,
            executor,
            scheduler,
            tick_interval: config.tick_interval,
            loops: Mutex::new(Vec::new()),
        };
        engine.recover()?;
        Ok(engine)
    }

    fn recover(&self) -> Result<(), EngineError> {
        let interrupted = self.store.with_state(|state| state.interrupted_runs());
        let at_ms = self.clock.epoch_ms();
        for run_id in interrupted {
            warn!(run_id = %run_id, "run was interrupted by restart, marking failed");
            self.store.record(&Event::RunFinished {
                run_id: run_id.clone(),
                status: RunStatus::Failed,
                at_ms,
                error: Some("interrupted by daemon restart".to_string()),
            })?;
            self.logs
                .append_line(run_id.as_str(), "[engine] interrupted by daemon restart")?;
        }

        let queued: Vec<RunId> = self
            .store
            .with_state(|state| state.queued_runs().iter().map(|r| r.id.clone()).collect());
        for run_id in queued {
            info!(run_id = %run_id, "re-enqueueing run that survived restart");
            self.executor.enqueue(run_id);
        }

        self.scheduler.recompute_after_restart()
    }

    /// Spawn the worker and tick loops. Requires a tokio runtime.
    pub fn start(&self) {
        let mut loops = self.loops.lock();
        loops.push(tokio::spawn(self.executor.clone().worker_loop()));
        loops.push(tokio::spawn(
            self.scheduler.clone().tick_loop(self.tick_interval),
        ));
    }

    /// Stop both loops. The running handler (if any) finishes its run
    /// first; nothing new starts afterwards.
    pub async fn shutdown(&self) {
        self.executor.shutdown();
        self.scheduler.shutdown();
        let handles: Vec<JoinHandle<()>> = self.loops.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }

    // -- runs --

    /// Validate, authorize, and queue a manual run.
    pub fn submit(
        &self,
        task_id: &str,
        raw: &Options,
        triggered_by: &str,
    ) -> Result<Run, EngineError> {
        let options = self.registry.validate_submission(task_id, raw)?;
        let def = self.registry.definition(task_id)?;
        let policy = self.store.with_state(|state| state.policy_for(task_id));
        gate::authorize(def, &options, &policy)?;

        let run = Run::new(
            RunId::new(self.ids.next()),
            task_id,
            options,
            None,
            triggered_by,
            self.clock.epoch_ms(),
        );
        self.store.record(&Event::RunQueued { run: run.clone() })?;
        self.executor.enqueue(run.id.clone());
        info!(run_id = %run.id, task_id, triggered_by, "run submitted");
        Ok(run)
    }

    /// Cancel a run by ID or unique prefix.
    pub fn cancel(&self, run_id: &str) -> Result<(), EngineError> {
        let run = self.get_run(run_id)?;
        self.executor.cancel(&run)
    }

    /// Fetch a run by ID or unique prefix.
    pub fn get_run(&self, run_id: &str) -> Result<Run, EngineError> {
        self.store
            .with_state(|state| state.get_run(run_id).cloned())
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))
    }

    /// List runs newest-first.
    pub fn list_runs(&self, filter: RunFilter, search: Option<&str>) -> Vec<Run> {
        self.store.with_state(|state| {
            state
                .list_runs(filter, search, |task_id| self.registry.title_of(task_id))
                .into_iter()
                .cloned()
                .collect()
        })
    }

    /// Read a run's log, optionally only the last `tail` lines.
    pub fn run_log(&self, run_id: &str, tail: Option<usize>) -> Result<String, EngineError> {
        let run = self.get_run(run_id)?;
        Ok(self.logs.read(run.id.as_str(), tail)?)
    }

    // -- schedules --

    pub fn create_schedule(&self, mut config: ScheduleConfig) -> Result<Schedule, EngineError> {
        config.validate()?;
        config.options = self
            .registry
            .validate_submission(&config.task_id, &config.options)?;
        self.authorize_schedule(&config)?;

        let schedule = Schedule::new(
            ScheduleId::new(self.ids.next()),
            config,
            self.clock.epoch_ms(),
        );
        self.store.record(&Event::ScheduleCreated {
            schedule: schedule.clone(),
        })?;
        info!(schedule_id = %schedule.id, name = %schedule.name, "schedule created");
        Ok(schedule)
    }

    pub fn update_schedule(
        &self,
        schedule_id: &str,
        mut config: ScheduleConfig,
    ) -> Result<Schedule, EngineError> {
        config.validate()?;
        config.options = self
            .registry
            .validate_submission(&config.task_id, &config.options)?;
        self.authorize_schedule(&config)?;

        let mut schedule = self.get_schedule(schedule_id)?;
        schedule.apply_edit(config, self.clock.epoch_ms());
        self.store.record(&Event::ScheduleUpdated {
            schedule: schedule.clone(),
        })?;
        info!(schedule_id = %schedule.id, "schedule updated");
        Ok(schedule)
    }

    pub fn delete_schedule(&self, schedule_id: &str) -> Result<(), EngineError> {
        let schedule = self.get_schedule(schedule_id)?;
        self.store.record(&Event::ScheduleDeleted {
            schedule_id: schedule.id.clone(),
        })?;
        info!(schedule_id = %schedule.id, "schedule deleted");
        Ok(())
    }

    pub fn get_schedule(&self, schedule_id: &str) -> Result<Schedule, EngineError> {
        self.store
            .with_state(|state| state.get_schedule(schedule_id).cloned())
            .ok_or_else(|| EngineError::ScheduleNotFound(schedule_id.to_string()))
    }

    /// All schedules, sorted by name.
    pub fn list_schedules(&self) -> Vec<Schedule> {
        self.store.with_state(|state| {
            let mut schedules: Vec<Schedule> = state.schedules.values().cloned().collect();
            schedules.sort_by(|a, b| a.name.cmp(&b.name));
            schedules
        })
    }

    fn authorize_schedule(&self, config: &ScheduleConfig) -> Result<(), EngineError> {
        let def = self.registry.definition(&config.task_id)?;
        let policy = self
            .store
            .with_state(|state| state.policy_for(&config.task_id));
        gate::authorize(def, &config.options, &policy)
    }

    // -- policy --

    pub fn set_policy(&self, task_id: &str, allow_dangerous: bool) -> Result<(), EngineError> {
        self.registry.definition(task_id)?;
        self.store.record(&Event::PolicySet {
            task_id: task_id.to_string(),
            allow_dangerous,
        })?;
        info!(task_id, allow_dangerous, "policy updated");
        Ok(())
    }

    pub fn policy(&self, task_id: &str) -> TaskPolicy {
        self.store.with_state(|state| state.policy_for(task_id))
    }

    // -- misc --

    pub fn catalog(&self) -> &TaskCatalog {
        self.registry.catalog()
    }

    /// Run one scheduler pass immediately, outside the timer.
    pub fn tick(&self) -> Result<Vec<RunId>, EngineError> {
        self.scheduler.tick()
    }

    /// Snapshot state and truncate the journal.
    pub fn checkpoint(&self) -> Result<u64, EngineError> {
        Ok(self.store.checkpoint()?)
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
