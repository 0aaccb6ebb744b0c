// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpointing: snapshot plus journal tail reproduce the same state.

use crate::prelude::*;
use prep_core::{FakeClock, Options, RunStatus};
use prep_storage::RunFilter;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn restart_replays_the_journal() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    {
        let engine = boot(dir.path(), &clock, "a");
        engine.start();
        let run = engine.submit("categorize", &Options::new(), "alex").unwrap();
        wait_terminal(&engine, run.id.as_str()).await;
        engine.shutdown().await;
    }

    let engine = boot(dir.path(), &clock, "b");
    let runs = engine.list_runs(RunFilter::All, None);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Succeeded);
}

#[tokio::test]
async fn checkpoint_truncates_the_journal_but_keeps_the_state() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    {
        let engine = boot(dir.path(), &clock, "a");
        engine.start();
        let run = engine.submit("categorize", &Options::new(), "alex").unwrap();
        wait_terminal(&engine, run.id.as_str()).await;
        engine.shutdown().await;
        engine.checkpoint().unwrap();
    }

    let journal = std::fs::read_to_string(dir.path().join("journal.jsonl")).unwrap();
    assert!(journal.is_empty());
    assert!(dir.path().join("snapshot.json").exists());

    let engine = boot(dir.path(), &clock, "b");
    assert_eq!(engine.list_runs(RunFilter::All, None).len(), 1);
}

#[tokio::test]
async fn events_after_a_checkpoint_survive_the_next_restart() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    {
        let engine = boot(dir.path(), &clock, "a");
        engine.start();
        let first = engine.submit("categorize", &Options::new(), "alex").unwrap();
        wait_terminal(&engine, first.id.as_str()).await;
        engine.checkpoint().unwrap();

        // Post-checkpoint events land in the fresh journal tail.
        clock.advance(Duration::from_secs(60));
        let second = engine.submit("dedupe", &Options::new(), "alex").unwrap();
        wait_terminal(&engine, second.id.as_str()).await;
        engine.shutdown().await;
    }

    let engine = boot(dir.path(), &clock, "b");
    let runs = engine.list_runs(RunFilter::All, None);
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].task_id, "dedupe");
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert_eq!(runs[1].task_id, "categorize");
    assert_eq!(runs[1].status, RunStatus::Succeeded);

    // A second checkpoint folds the tail into the snapshot.
    engine.checkpoint().unwrap();
    let engine2 = boot(dir.path(), &clock, "c");
    assert_eq!(engine2.list_runs(RunFilter::All, None).len(), 2);
}
