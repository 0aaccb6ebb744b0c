// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler boundaries, overlap holds, and one-shot schedules.
//!
//! These specs drive `tick()` by hand with a fake clock instead of
//! starting the timer loop, so every firing decision is deterministic.

use crate::prelude::*;
use prep_core::{FakeClock, Options, ScheduleKind};
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn schedule_fires_on_its_boundary() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    let engine = boot(dir.path(), &clock, "run");

    let schedule = engine
        .create_schedule(hourly_config("hourly categorize", "categorize", false))
        .unwrap();
    assert_eq!(schedule.next_run_at_ms, T0 + HOUR);

    assert!(engine.tick().unwrap().is_empty());

    clock.advance(Duration::from_secs(3_600));
    let fired = engine.tick().unwrap();
    assert_eq!(fired.len(), 1);

    let run = engine.get_run(fired[0].as_str()).unwrap();
    assert_eq!(run.task_id, "categorize");
    assert_eq!(run.triggered_by, "scheduler");
    assert_eq!(run.schedule_id.as_ref(), Some(&schedule.id));

    let schedule = engine.get_schedule(schedule.id.as_str()).unwrap();
    assert_eq!(schedule.next_run_at_ms, T0 + 2 * HOUR);
    assert_eq!(schedule.last_run_at_ms, Some(T0 + HOUR));
}

#[tokio::test]
async fn boundary_is_held_while_the_previous_run_is_active() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    let engine = boot(dir.path(), &clock, "run");

    let schedule = engine
        .create_schedule(hourly_config("hourly hold", "hold", false))
        .unwrap();

    // No worker loop is running, so the fired run stays queued.
    clock.advance(Duration::from_secs(3_600));
    let fired = engine.tick().unwrap();
    assert_eq!(fired.len(), 1);

    clock.advance(Duration::from_secs(3_600));
    assert!(engine.tick().unwrap().is_empty());
    let held = engine.get_schedule(schedule.id.as_str()).unwrap();
    assert_eq!(held.next_run_at_ms, T0 + 2 * HOUR);

    // Once the run is terminal the held boundary fires on the next tick.
    engine.cancel(fired[0].as_str()).unwrap();
    let fired = engine.tick().unwrap();
    assert_eq!(fired.len(), 1);
    let after = engine.get_schedule(schedule.id.as_str()).unwrap();
    assert_eq!(after.next_run_at_ms, T0 + 3 * HOUR);
}

#[tokio::test]
async fn once_schedule_disables_after_firing() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    let engine = boot(dir.path(), &clock, "run");

    let mut config = hourly_config("tonight only", "categorize", false);
    config.kind = ScheduleKind::Once {
        run_at_ms: T0 + HOUR,
    };
    let schedule = engine.create_schedule(config).unwrap();

    clock.advance(Duration::from_secs(3_600));
    assert_eq!(engine.tick().unwrap().len(), 1);

    let after = engine.get_schedule(schedule.id.as_str()).unwrap();
    assert!(!after.enabled);

    clock.advance(Duration::from_secs(3_600));
    assert!(engine.tick().unwrap().is_empty());
}

#[tokio::test]
async fn updating_a_schedule_recomputes_its_cursor() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    let engine = boot(dir.path(), &clock, "run");

    let schedule = engine
        .create_schedule(hourly_config("hourly categorize", "categorize", false))
        .unwrap();

    clock.advance(Duration::from_secs(1_800));
    let mut config = hourly_config("every two hours", "categorize", false);
    config.kind = ScheduleKind::Interval {
        seconds: 7_200,
        start_at_ms: None,
    };
    let updated = engine
        .update_schedule(schedule.id.as_str(), config)
        .unwrap();

    assert_eq!(updated.name, "every two hours");
    assert_eq!(updated.next_run_at_ms, T0 + 1_800_000 + 2 * HOUR);

    // The fire after the edit advances by the full new period.
    clock.advance(Duration::from_secs(2 * 3_600));
    assert_eq!(engine.tick().unwrap().len(), 1);
    let after = engine.get_schedule(schedule.id.as_str()).unwrap();
    assert_eq!(after.next_run_at_ms, T0 + 1_800_000 + 4 * HOUR);
}

#[tokio::test]
async fn deleted_schedule_never_fires_again() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    let engine = boot(dir.path(), &clock, "run");

    let schedule = engine
        .create_schedule(hourly_config("hourly categorize", "categorize", false))
        .unwrap();
    engine.delete_schedule(schedule.id.as_str()).unwrap();

    clock.advance(Duration::from_secs(3_600));
    assert!(engine.tick().unwrap().is_empty());
    assert!(engine.list_schedules().is_empty());
}

#[tokio::test]
async fn scheduled_run_inherits_the_schedule_options() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    let engine = boot(dir.path(), &clock, "run");

    let mut config = hourly_config("small batches", "categorize", false);
    config.options = Options::new();
    config
        .options
        .insert("batch_size".into(), serde_json::json!(5));
    engine.create_schedule(config).unwrap();

    clock.advance(Duration::from_secs(3_600));
    let fired = engine.tick().unwrap();
    let run = engine.get_run(fired[0].as_str()).unwrap();
    assert_eq!(run.options.get("batch_size"), Some(&serde_json::json!(5)));
    assert_eq!(run.options.get("dry_run"), Some(&serde_json::json!(true)));
}
