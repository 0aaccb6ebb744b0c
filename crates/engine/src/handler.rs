// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The task handler trait and the context handlers run with.

use async_trait::async_trait;
use prep_core::{CancelToken, Options, RunId};
use prep_storage::RunLogWriter;
use thiserror::Error;
use tracing::warn;

/// A handler failure. Carries only the operator-facing summary; anything
/// longer belongs in the run log.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(e: std::io::Error) -> Self {
        Self(e.to_string())
    }
}

/// Everything a handler gets for one run: its validated options, a cancel
/// token to poll at safe stopping points, and the run's log file.
pub struct TaskContext {
    pub run_id: RunId,
    pub task_id: String,
    /// Normalized options (every declared option present, defaults filled).
    pub options: Options,
    pub cancel: CancelToken,
    log: RunLogWriter,
}

impl TaskContext {
    pub fn new(
        run_id: RunId,
        task_id: impl Into<String>,
        options: Options,
        cancel: CancelToken,
        log: RunLogWriter,
    ) -> Self {
        Self {
            run_id,
            task_id: task_id.into(),
            options,
            cancel,
            log,
        }
    }

    /// Append a line to the run log. Log output is best-effort; a write
    /// failure is reported through tracing, not to the handler.
    pub fn log(&mut self, line: &str) {
        if let Err(e) = self.log.line(line) {
            warn!(run_id = %self.run_id, error = %e, "run log write failed");
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_canceled()
    }
}

/// Executes one run of a task.
///
/// Handlers are registered per task ID. The worker calls `execute` with a
/// fresh context; a handler that notices `ctx.is_canceled()` should stop
/// at the next safe point and return (its return value is then ignored,
/// the run records as canceled).
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn execute(&self, ctx: &mut TaskContext) -> Result<(), HandlerError>;
}
