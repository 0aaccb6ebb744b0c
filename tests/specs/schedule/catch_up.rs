// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Missed boundaries: collapse while live, skip or catch up across restarts.

use crate::prelude::*;
use prep_core::FakeClock;
use prep_storage::RunFilter;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn missed_boundaries_collapse_to_a_single_fire() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    let engine = boot(dir.path(), &clock, "run");

    let schedule = engine
        .create_schedule(hourly_config("hourly categorize", "categorize", false))
        .unwrap();

    // Three boundaries elapse between ticks; exactly one run fires and the
    // cursor lands past all of them.
    clock.advance(Duration::from_secs(3 * 3_600 + 600));
    let fired = engine.tick().unwrap();
    assert_eq!(fired.len(), 1);

    let after = engine.get_schedule(schedule.id.as_str()).unwrap();
    assert_eq!(after.next_run_at_ms, T0 + 4 * HOUR);
}

#[tokio::test]
async fn downtime_is_skipped_unless_the_schedule_catches_up() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    {
        let engine = boot(dir.path(), &clock, "a");
        engine
            .create_schedule(hourly_config("skipper", "categorize", false))
            .unwrap();
        engine
            .create_schedule(hourly_config("catcher", "categorize", true))
            .unwrap();
    }

    // Five and a half hours of downtime.
    clock.advance(Duration::from_secs(5 * 3_600 + 1_800));
    let engine = boot(dir.path(), &clock, "b");

    // The skipper's cursor was moved forward during recovery, before any tick.
    let schedules = engine.list_schedules();
    let skipper = schedules.iter().find(|s| s.name == "skipper").unwrap();
    let catcher = schedules.iter().find(|s| s.name == "catcher").unwrap();
    assert_eq!(skipper.next_run_at_ms, T0 + 6 * HOUR);
    assert_eq!(catcher.next_run_at_ms, T0 + HOUR);

    // Only the catcher fires, once, and both cursors end up aligned.
    let fired = engine.tick().unwrap();
    assert_eq!(fired.len(), 1);
    let run = engine.get_run(fired[0].as_str()).unwrap();
    assert_eq!(run.schedule_id.as_ref(), Some(&catcher.id));

    let schedules = engine.list_schedules();
    for schedule in &schedules {
        assert_eq!(schedule.next_run_at_ms, T0 + 6 * HOUR);
    }
    assert_eq!(engine.list_runs(RunFilter::Scheduled, None).len(), 1);
}

#[tokio::test]
async fn boundary_landing_on_the_restart_instant_still_fires() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    {
        let engine = boot(dir.path(), &clock, "a");
        engine
            .create_schedule(hourly_config("hourly categorize", "categorize", false))
            .unwrap();
    }

    // Restart exactly on a boundary. Recovery recomputes to that same
    // instant, so the first tick fires it.
    clock.advance(Duration::from_secs(5 * 3_600));
    let engine = boot(dir.path(), &clock, "b");

    let schedule = &engine.list_schedules()[0];
    assert_eq!(schedule.next_run_at_ms, T0 + 5 * HOUR);

    let fired = engine.tick().unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(
        engine.list_schedules()[0].next_run_at_ms,
        T0 + 6 * HOUR
    );
}

#[tokio::test]
async fn once_schedule_fires_exactly_once_across_restarts() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    {
        let engine = boot(dir.path(), &clock, "a");
        let mut config = hourly_config("tonight only", "categorize", true);
        config.kind = prep_core::ScheduleKind::Once {
            run_at_ms: T0 + 2 * HOUR,
        };
        engine.create_schedule(config).unwrap();

        // Restart before the boundary changes nothing.
        clock.advance(Duration::from_secs(3_600));
    }
    {
        let engine = boot(dir.path(), &clock, "b");
        assert!(engine.tick().unwrap().is_empty());
        clock.advance(Duration::from_secs(3_600));
        assert_eq!(engine.tick().unwrap().len(), 1);
    }

    // Restarts after the fire never produce another run.
    clock.advance(Duration::from_secs(3_600));
    let engine = boot(dir.path(), &clock, "c");
    assert!(engine.tick().unwrap().is_empty());
    assert_eq!(engine.list_runs(RunFilter::Scheduled, None).len(), 1);
}

#[tokio::test]
async fn disabled_schedule_is_left_alone_by_recovery() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    {
        let engine = boot(dir.path(), &clock, "a");
        let mut config = hourly_config("paused", "categorize", false);
        config.enabled = false;
        engine.create_schedule(config).unwrap();
    }

    clock.advance(Duration::from_secs(10 * 3_600));
    let engine = boot(dir.path(), &clock, "b");

    let schedule = &engine.list_schedules()[0];
    assert!(!schedule.enabled);
    assert_eq!(schedule.next_run_at_ms, T0 + HOUR);
    assert!(engine.tick().unwrap().is_empty());
}
