// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use prep_core::run::RunStatus;
use prep_core::schedule::ScheduleError;
use prep_core::task::OptionError;
use prep_storage::{RunLogError, StoreError};
use thiserror::Error;

/// Errors the engine surfaces to its callers.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown task: {0}")]
    UnknownTask(String),
    #[error("run not found: {0}")]
    RunNotFound(String),
    #[error("schedule not found: {0}")]
    ScheduleNotFound(String),
    #[error("run {run_id} is {status}, only queued or running runs can be canceled")]
    NotCancelable { run_id: String, status: RunStatus },
    #[error("option {option:?} of task {task_id} is dangerous and locked by policy")]
    PolicyDenied { task_id: String, option: String },
    #[error(transparent)]
    Option(#[from] OptionError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    RunLog(#[from] RunLogError),
}
