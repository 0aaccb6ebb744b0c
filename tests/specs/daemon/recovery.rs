// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash recovery: interrupted runs fail, queued runs survive.

use crate::prelude::*;
use prep_core::test_support::manual_run;
use prep_core::{Event, FakeClock, RunStatus};
use prep_storage::EventStore;
use tempfile::TempDir;

#[tokio::test]
async fn interrupted_run_is_failed_and_queued_run_survives() {
    let dir = TempDir::new().unwrap();

    // Simulate a crash: a run was mid-execution and another was waiting
    // when the process died, so the journal ends without their finishes.
    {
        let store = EventStore::open(dir.path()).unwrap();
        let mid_flight = manual_run("a-1", "categorize", T0);
        store
            .record(&Event::RunQueued {
                run: mid_flight.clone(),
            })
            .unwrap();
        store
            .record(&Event::RunStarted {
                run_id: mid_flight.id,
                at_ms: T0 + 10,
            })
            .unwrap();
        store
            .record(&Event::RunQueued {
                run: manual_run("a-2", "categorize", T0 + 20),
            })
            .unwrap();
    }

    let clock = FakeClock::at_epoch_ms(T0 + HOUR);
    let engine = boot(dir.path(), &clock, "b");

    let interrupted = engine.get_run("a-1").unwrap();
    assert_eq!(interrupted.status, RunStatus::Failed);
    assert_eq!(
        interrupted.error.as_deref(),
        Some("interrupted by daemon restart")
    );
    let log = engine.run_log("a-1", None).unwrap();
    assert!(log.contains("interrupted by daemon restart"));

    // The queued run was re-enqueued and executes once the worker starts.
    engine.start();
    let survivor = wait_terminal(&engine, "a-2").await;
    assert_eq!(survivor.status, RunStatus::Succeeded);

    engine.shutdown().await;
}

#[tokio::test]
async fn finished_runs_are_untouched_by_recovery() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);

    let run_id = {
        let engine = boot(dir.path(), &clock, "a");
        engine.start();
        let run = engine
            .submit("categorize", &prep_core::Options::new(), "alex")
            .unwrap();
        wait_terminal(&engine, run.id.as_str()).await;
        engine.shutdown().await;
        run.id
    };

    clock.advance(std::time::Duration::from_secs(60));
    let engine = boot(dir.path(), &clock, "b");
    let run = engine.get_run(run_id.as_str()).unwrap();
    assert_eq!(run.status, RunStatus::Succeeded);
    assert_eq!(run.error, None);
}
