// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for the behavioral specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use async_trait::async_trait;
use prep_core::test_support::task_def;
use prep_core::{Clock, CountingIdGen, FakeClock, Options, Run, ScheduleConfig, ScheduleKind};
use prep_core::{RunStatus, TaskCatalog};
use prep_engine::{Engine, EngineConfig, HandlerError, TaskContext, TaskHandler, TaskRegistry};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const T0: u64 = 1_704_067_200_000; // 2024-01-01T00:00:00Z
pub const HOUR: u64 = 3_600_000;

pub const POLL_INTERVAL: Duration = Duration::from_millis(10);
pub const WAIT_MAX: Duration = Duration::from_secs(5);

/// Handler that writes one log line and succeeds.
pub struct Echo;

#[async_trait]
impl TaskHandler for Echo {
    async fn execute(&self, ctx: &mut TaskContext) -> Result<(), HandlerError> {
        ctx.log(&format!("task {} ran", ctx.task_id));
        Ok(())
    }
}

/// Handler that always fails with a fixed message.
pub struct Failing;

#[async_trait]
impl TaskHandler for Failing {
    async fn execute(&self, _ctx: &mut TaskContext) -> Result<(), HandlerError> {
        Err(HandlerError::new("nothing to dedupe"))
    }
}

/// Handler that runs until its cancel token is raised.
pub struct UntilCanceled;

#[async_trait]
impl TaskHandler for UntilCanceled {
    async fn execute(&self, ctx: &mut TaskContext) -> Result<(), HandlerError> {
        while !ctx.is_canceled() {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        Ok(())
    }
}

/// Catalog with the three tasks the specs use. `categorize` and `dedupe`
/// carry the usual option set; `hold` blocks until canceled.
pub fn catalog() -> TaskCatalog {
    let mut catalog = TaskCatalog::default();
    for task_id in ["categorize", "dedupe", "hold"] {
        let def = task_def(task_id);
        catalog.tasks.insert(def.task_id.clone(), def);
    }
    catalog
}

pub fn registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new(catalog());
    registry.register("categorize", Arc::new(Echo)).unwrap();
    registry.register("dedupe", Arc::new(Failing)).unwrap();
    registry.register("hold", Arc::new(UntilCanceled)).unwrap();
    registry
}

/// Open an engine over `dir`. Runs get IDs `{id_prefix}-1`, `{id_prefix}-2`,
/// and so on; restarts in the same test must use a fresh prefix so IDs do
/// not collide with runs already in the journal.
pub fn boot(dir: &Path, clock: &FakeClock, id_prefix: &str) -> Engine {
    let mut config = EngineConfig::new(dir);
    config.tick_interval = Duration::from_millis(20);
    Engine::open(
        config,
        registry(),
        Arc::new(clock.clone()),
        Arc::new(CountingIdGen::new(id_prefix)),
    )
    .unwrap()
}

pub fn hourly_config(name: &str, task_id: &str, catch_up: bool) -> ScheduleConfig {
    ScheduleConfig {
        name: name.to_string(),
        task_id: task_id.to_string(),
        kind: ScheduleKind::Interval {
            seconds: 3_600,
            start_at_ms: None,
        },
        options: Options::new(),
        enabled: true,
        catch_up,
    }
}

/// Poll until the run reaches a terminal status.
pub async fn wait_terminal(engine: &Engine, run_id: &str) -> Run {
    let deadline = tokio::time::Instant::now() + WAIT_MAX;
    loop {
        let run = engine.get_run(run_id).unwrap();
        if run.is_terminal() {
            return run;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("run {run_id} still {:?} after {WAIT_MAX:?}", run.status);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Poll until the run is observed running.
pub async fn wait_running(engine: &Engine, run_id: &str) {
    let deadline = tokio::time::Instant::now() + WAIT_MAX;
    loop {
        let run = engine.get_run(run_id).unwrap();
        if run.status == RunStatus::Running {
            return;
        }
        if run.is_terminal() {
            panic!("run {run_id} went terminal ({:?}) before running", run.status);
        }
        if tokio::time::Instant::now() > deadline {
            panic!("run {run_id} still {:?} after {WAIT_MAX:?}", run.status);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Convenience for asserting against the state clock.
pub fn now_ms(clock: &FakeClock) -> u64 {
    clock.epoch_ms()
}
