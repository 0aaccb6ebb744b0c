// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dangerous-option gate, end to end.

use crate::prelude::*;
use prep_core::{FakeClock, Options, RunStatus};
use prep_engine::EngineError;
use serde_json::json;
use tempfile::TempDir;

fn dangerous_options() -> Options {
    let mut options = Options::new();
    options.insert("apply_changes".into(), json!(true));
    options
}

#[tokio::test]
async fn dangerous_option_is_denied_until_policy_allows_it() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    let engine = boot(dir.path(), &clock, "run");
    engine.start();

    let err = engine
        .submit("categorize", &dangerous_options(), "alex")
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::PolicyDenied { ref option, .. } if option == "apply_changes"
    ));

    engine.set_policy("categorize", true).unwrap();
    let run = engine
        .submit("categorize", &dangerous_options(), "alex")
        .unwrap();
    let done = wait_terminal(&engine, run.id.as_str()).await;
    assert_eq!(done.status, RunStatus::Succeeded);

    engine.shutdown().await;
}

#[tokio::test]
async fn dangerous_option_set_to_its_default_is_not_gated() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    let engine = boot(dir.path(), &clock, "run");

    // Explicit false matches the default, so the gate lets it through.
    let mut options = Options::new();
    options.insert("apply_changes".into(), json!(false));
    let run = engine.submit("categorize", &options, "alex").unwrap();
    assert_eq!(run.status, RunStatus::Queued);
}

#[tokio::test]
async fn schedule_with_dangerous_option_is_denied_at_creation() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    let engine = boot(dir.path(), &clock, "sch");

    let mut config = hourly_config("risky", "categorize", false);
    config.options = dangerous_options();
    let err = engine.create_schedule(config).unwrap_err();
    assert!(matches!(err, EngineError::PolicyDenied { .. }));
    assert!(engine.list_schedules().is_empty());
}

#[tokio::test]
async fn policy_survives_restart() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::at_epoch_ms(T0);
    {
        let engine = boot(dir.path(), &clock, "a");
        engine.set_policy("categorize", true).unwrap();
    }

    let engine = boot(dir.path(), &clock, "b");
    assert!(engine.policy("categorize").allow_dangerous);
    let run = engine
        .submit("categorize", &dangerous_options(), "alex")
        .unwrap();
    assert_eq!(run.status, RunStatus::Queued);
}
