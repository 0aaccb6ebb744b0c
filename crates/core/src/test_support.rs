// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders shared by this crate's tests and (via the `test-support`
//! feature) by other crates' tests.

use crate::id::{RunId, ScheduleId};
use crate::run::Run;
use crate::schedule::{Schedule, ScheduleConfig, ScheduleKind};
use crate::task::{OptionKind, OptionSpec, Options, TaskDefinition};
use serde_json::json;

/// A task definition with a dangerous `apply_changes` flag, a `dry_run`
/// toggle, and a `batch_size` integer (the usual shape of a maintenance
/// task).
pub fn task_def(task_id: &str) -> TaskDefinition {
    TaskDefinition {
        task_id: task_id.to_string(),
        title: format!("{task_id} (test)"),
        options: vec![
            OptionSpec {
                key: "dry_run".into(),
                kind: OptionKind::Boolean,
                default: json!(true),
                dangerous: false,
                choices: None,
            },
            OptionSpec {
                key: "apply_changes".into(),
                kind: OptionKind::Boolean,
                default: json!(false),
                dangerous: true,
                choices: None,
            },
            OptionSpec {
                key: "batch_size".into(),
                kind: OptionKind::Integer,
                default: json!(25),
                dangerous: false,
                choices: None,
            },
        ],
        command: None,
    }
}

/// A queued manual run with empty options.
pub fn manual_run(id: &str, task_id: &str, created_at_ms: u64) -> Run {
    Run::new(
        RunId::new(id),
        task_id,
        Options::new(),
        None,
        "test",
        created_at_ms,
    )
}

/// A queued schedule-triggered run.
pub fn scheduled_run(id: &str, task_id: &str, schedule_id: &str, created_at_ms: u64) -> Run {
    Run::new(
        RunId::new(id),
        task_id,
        Options::new(),
        Some(ScheduleId::new(schedule_id)),
        "scheduler",
        created_at_ms,
    )
}

/// An enabled interval schedule anchored at its creation time.
pub fn interval_schedule(id: &str, task_id: &str, seconds: u64, created_at_ms: u64) -> Schedule {
    Schedule::new(
        ScheduleId::new(id),
        ScheduleConfig {
            name: format!("{id} (test)"),
            task_id: task_id.to_string(),
            kind: ScheduleKind::Interval {
                seconds,
                start_at_ms: None,
            },
            options: Options::new(),
            enabled: true,
            catch_up: false,
        },
        created_at_ms,
    )
}
