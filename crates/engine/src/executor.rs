// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FIFO run queue and the single worker that drains it.
//!
//! One run executes at a time. The worker marks a run `running`, hands it
//! to the registered handler in a spawned task (so a panic is contained),
//! then records the terminal status. Cancellation of a queued run is
//! recorded directly; cancellation of the running run raises its token
//! and waits for the handler to yield.

use crate::error::EngineError;
use crate::handler::TaskContext;
use crate::registry::TaskRegistry;
use parking_lot::Mutex;
use prep_core::{CancelToken, Clock, Event, Run, RunId, RunStatus};
use prep_storage::{EventStore, RunLogStore};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{error, info, warn};

pub(crate) struct Executor {
    store: Arc<EventStore>,
    registry: Arc<TaskRegistry>,
    logs: RunLogStore,
    clock: Arc<dyn Clock>,
    queue: Mutex<VecDeque<RunId>>,
    /// Cancel tokens of runs currently executing, keyed by run ID.
    cancels: Mutex<HashMap<String, CancelToken>>,
    wake: Notify,
    stopping: AtomicBool,
}

impl Executor {
    pub(crate) fn new(
        store: Arc<EventStore>,
        registry: Arc<TaskRegistry>,
        logs: RunLogStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            registry,
            logs,
            clock,
            queue: Mutex::new(VecDeque::new()),
            cancels: Mutex::new(HashMap::new()),
            wake: Notify::new(),
            stopping: AtomicBool::new(false),
        }
    }

    /// Add an already-recorded queued run to the back of the queue.
    pub(crate) fn enqueue(&self, run_id: RunId) {
        self.queue.lock().push_back(run_id);
        self.wake.notify_one();
    }

    /// Cancel a run. `run_id` must be fully resolved.
    pub(crate) fn cancel(&self, run: &Run) -> Result<(), EngineError> {
        match run.status {
            RunStatus::Queued => {
                // Terminal event first, then drop it from the queue; the
                // worker also skips anything no longer queued.
                self.store.record(&Event::RunFinished {
                    run_id: run.id.clone(),
                    status: RunStatus::Canceled,
                    at_ms: self.clock.epoch_ms(),
                    error: None,
                })?;
                self.queue.lock().retain(|id| id.as_str() != run.id.as_str());
                info!(run_id = %run.id, "queued run canceled");
                Ok(())
            }
            RunStatus::Running => {
                if let Some(token) = self.cancels.lock().get(run.id.as_str()) {
                    token.cancel();
                    info!(run_id = %run.id, "cancellation requested");
                }
                Ok(())
            }
            status => Err(EngineError::NotCancelable {
                run_id: run.id.to_string(),
                status,
            }),
        }
    }

    pub(crate) fn shutdown(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    /// Drain the queue until shutdown.
    pub(crate) async fn worker_loop(self: Arc<Self>) {
        loop {
            if self.stopping.load(Ordering::SeqCst) {
                break;
            }
            let next = self.queue.lock().pop_front();
            let Some(run_id) = next else {
                self.wake.notified().await;
                continue;
            };
            if let Err(e) = self.execute_one(&run_id).await {
                error!(run_id = %run_id, error = %e, "failed to record run outcome");
            }
        }
    }

    async fn execute_one(&self, run_id: &RunId) -> Result<(), EngineError> {
        let run = self
            .store
            .with_state(|state| state.runs.get(run_id.as_str()).cloned());
        let Some(run) = run else {
            warn!(run_id = %run_id, "queued run vanished from state");
            return Ok(());
        };
        // Canceled while waiting in the queue
        if run.status != RunStatus::Queued {
            return Ok(());
        }

        // Token goes in before the start record, so a cancel arriving at
        // any point from here on either wins the start transition or
        // finds a token to raise.
        let cancel = CancelToken::new();
        self.cancels
            .lock()
            .insert(run.id.to_string(), cancel.clone());
        if !self.start(&run)? {
            self.cancels.lock().remove(run.id.as_str());
            info!(run_id = %run.id, "run canceled before it started");
            return Ok(());
        }
        info!(run_id = %run.id, task_id = %run.task_id, "run started");

        let outcome = self.run_handler(&run, cancel.clone()).await;
        self.cancels.lock().remove(run.id.as_str());

        // A raised token wins over whatever the handler returned: the
        // operator asked for a stop and got one.
        let (status, error) = if cancel.is_canceled() {
            (RunStatus::Canceled, None)
        } else {
            match outcome {
                Ok(()) => (RunStatus::Succeeded, None),
                Err(message) => (RunStatus::Failed, Some(message)),
            }
        };

        self.store.record(&Event::RunFinished {
            run_id: run.id.clone(),
            status,
            at_ms: self.clock.epoch_ms(),
            error: error.clone(),
        })?;
        match status {
            RunStatus::Failed => {
                warn!(run_id = %run.id, error = error.as_deref().unwrap_or(""), "run failed")
            }
            _ => info!(run_id = %run.id, status = %status, "run finished"),
        }
        Ok(())
    }

    /// Record the start transition and confirm it applied.
    ///
    /// A cancel can land between the queued check and the start record;
    /// the state rejects the stale transition, and the handler must never
    /// execute for a run that finished as canceled without starting.
    fn start(&self, run: &Run) -> Result<bool, EngineError> {
        self.store.record(&Event::RunStarted {
            run_id: run.id.clone(),
            at_ms: self.clock.epoch_ms(),
        })?;
        let status = self
            .store
            .with_state(|state| state.runs.get(run.id.as_str()).map(|r| r.status));
        Ok(status == Some(RunStatus::Running))
    }

    async fn run_handler(&self, run: &Run, cancel: CancelToken) -> Result<(), String> {
        let Some(handler) = self.registry.handler_for(&run.task_id) else {
            return Err(format!("no handler registered for task {}", run.task_id));
        };
        let log = self
            .logs
            .writer(run.id.as_str())
            .map_err(|e| format!("cannot open run log: {e}"))?;
        let mut ctx = TaskContext::new(
            run.id.clone(),
            run.task_id.clone(),
            run.options.clone(),
            cancel,
            log,
        );

        // Own task so a handler panic cannot take the worker down
        let joined = tokio::spawn(async move { handler.execute(&mut ctx).await }).await;
        match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) if e.is_panic() => Err("task handler panicked".to_string()),
            Err(_) => Err("task handler aborted".to_string()),
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
