// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! prepd: the scheduling and run-execution daemon.
//!
//! Owns the engine loops (run worker + scheduler tick) and a periodic
//! checkpoint task; stops cleanly on SIGINT/SIGTERM.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use prep_daemon::{startup, Config, LifecycleError};
use prep_engine::Engine;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

/// Checkpoint interval: bounds journal replay time after a crash.
const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("prepd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("prepd {}", env!("CARGO_PKG_VERSION"));
                println!("Task scheduling and run-execution daemon");
                println!();
                println!("USAGE:");
                println!("    prepd");
                println!();
                println!("Runs until SIGINT/SIGTERM. State lives under $PREP_STATE_DIR");
                println!("(default: the user state directory). The task catalog is read");
                println!("from $PREP_TASKS_FILE or <config dir>/prep/tasks.toml.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: prepd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;
    let _log_guard = setup_logging(&config)?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting prepd");

    let daemon = match startup(&config) {
        Ok(daemon) => daemon,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("prepd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "failed to start daemon");
            return Err(e.into());
        }
    };

    daemon.engine.start();
    spawn_checkpoint(daemon.engine.clone());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    info!(state_dir = %config.state_dir.display(), "daemon ready");
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    daemon.shutdown().await;
    info!("daemon stopped");
    Ok(())
}

/// Periodically snapshot state and truncate the journal.
fn spawn_checkpoint(engine: Arc<Engine>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CHECKPOINT_INTERVAL);
        // The immediate first tick would checkpoint an empty delta
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = engine.checkpoint() {
                error!(error = %e, "checkpoint failed");
            }
        }
    });
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
