// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manual runs: submit, execute, log, cancel, list.

use crate::prelude::*;
use prep_core::{FakeClock, Options, RunStatus};
use prep_storage::RunFilter;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn submitted_run_executes_and_logs() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    let engine = boot(dir.path(), &clock, "run");
    engine.start();

    let run = engine.submit("categorize", &Options::new(), "alex").unwrap();
    let done = wait_terminal(&engine, run.id.as_str()).await;

    assert_eq!(done.status, RunStatus::Succeeded);
    assert_eq!(done.error, None);
    assert!(done.started_at_ms.is_some());
    assert!(done.finished_at_ms.is_some());

    let log = engine.run_log(run.id.as_str(), None).unwrap();
    assert!(log.contains("task categorize ran"));

    engine.shutdown().await;
}

#[tokio::test]
async fn failing_handler_marks_the_run_failed() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    let engine = boot(dir.path(), &clock, "run");
    engine.start();

    let run = engine.submit("dedupe", &Options::new(), "alex").unwrap();
    let done = wait_terminal(&engine, run.id.as_str()).await;

    assert_eq!(done.status, RunStatus::Failed);
    assert_eq!(done.error.as_deref(), Some("nothing to dedupe"));

    engine.shutdown().await;
}

#[tokio::test]
async fn cancel_stops_a_running_task() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    let engine = boot(dir.path(), &clock, "run");
    engine.start();

    let run = engine.submit("hold", &Options::new(), "alex").unwrap();
    wait_running(&engine, run.id.as_str()).await;

    engine.cancel(run.id.as_str()).unwrap();
    let done = wait_terminal(&engine, run.id.as_str()).await;

    assert_eq!(done.status, RunStatus::Canceled);
    assert_eq!(done.error, None);

    engine.shutdown().await;
}

#[tokio::test]
async fn runs_list_newest_first_and_search_by_title() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    let engine = boot(dir.path(), &clock, "run");
    engine.start();

    let first = engine.submit("categorize", &Options::new(), "alex").unwrap();
    wait_terminal(&engine, first.id.as_str()).await;
    clock.advance(Duration::from_secs(60));
    let second = engine.submit("dedupe", &Options::new(), "alex").unwrap();
    wait_terminal(&engine, second.id.as_str()).await;

    let all = engine.list_runs(RunFilter::All, None);
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, second.id);
    assert_eq!(all[1].id, first.id);

    // task_def titles are "<task_id> (test)", so title search finds by name.
    let hits = engine.list_runs(RunFilter::All, Some("dedupe (test)"));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, second.id);

    let manual = engine.list_runs(RunFilter::Manual, None);
    assert_eq!(manual.len(), 2);
    assert!(engine.list_runs(RunFilter::Scheduled, None).is_empty());

    engine.shutdown().await;
}

#[tokio::test]
async fn run_log_tail_returns_the_last_lines() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    let engine = boot(dir.path(), &clock, "run");
    engine.start();

    let run = engine.submit("categorize", &Options::new(), "alex").unwrap();
    wait_terminal(&engine, run.id.as_str()).await;

    let tail = engine.run_log(run.id.as_str(), Some(1)).unwrap();
    assert_eq!(tail.trim(), "task categorize ran");

    engine.shutdown().await;
}
