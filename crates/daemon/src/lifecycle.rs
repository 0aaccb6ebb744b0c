// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: configuration, startup, shutdown.

use crate::command_handler::CommandHandler;
use fs2::FileExt;
use prep_core::{SystemClock, TaskCatalog, UuidIdGen};
use prep_engine::{Engine, EngineConfig, EngineError, TaskRegistry};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/prep)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Journal, snapshot, and run logs live here
    pub data_dir: PathBuf,
    /// Task catalog file
    pub tasks_path: PathBuf,
}

impl Config {
    /// Resolve paths for the user-level daemon.
    ///
    /// `PREP_STATE_DIR` takes priority (tests use it for isolation), then
    /// the platform state directory, then `~/.local/state/prep`. The task
    /// catalog defaults to `<config dir>/prep/tasks.toml`, overridable
    /// with `PREP_TASKS_FILE`.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = state_dir()?;
        let tasks_path = match std::env::var("PREP_TASKS_FILE") {
            Ok(path) => PathBuf::from(path),
            Err(_) => dirs::config_dir()
                .ok_or(LifecycleError::NoStateDir)?
                .join("prep")
                .join("tasks.toml"),
        };

        Ok(Self {
            lock_path: state_dir.join("prepd.pid"),
            version_path: state_dir.join("prepd.version"),
            log_path: state_dir.join("prepd.log"),
            data_dir: state_dir.join("data"),
            tasks_path,
            state_dir,
        })
    }
}

fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("PREP_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(dir) = dirs::state_dir() {
        return Ok(dir.join("prep"));
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state/prep"))
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,
    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),
    #[error("task catalog error: {0}")]
    Catalog(#[from] prep_core::CatalogError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A started daemon: the engine plus the files that mark it as running.
pub struct DaemonState {
    pub config: Config,
    pub engine: Arc<Engine>,
    // Held to keep the exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
}

impl DaemonState {
    /// Graceful shutdown: stop the loops, take a final checkpoint so the
    /// next startup replays nothing, and remove the PID/version files.
    pub async fn shutdown(&self) {
        self.engine.shutdown().await;
        match self.engine.checkpoint() {
            Ok(seq) => info!(seq, "final shutdown checkpoint saved"),
            Err(e) => warn!(error = %e, "failed to save shutdown checkpoint"),
        }

        for path in [&self.config.lock_path, &self.config.version_path] {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(path = %path.display(), error = %e, "failed to remove file");
                }
            }
        }
        info!("daemon shutdown complete");
    }
}

/// Start the daemon: take the lock, load the catalog, open the engine.
///
/// Does not spawn the engine loops; the caller does that once it is ready
/// to serve.
pub fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Lock before touching anything else so a second daemon cannot race.
    // Avoid truncating before the lock is held, that would wipe the
    // running daemon's PID.
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    let catalog = if config.tasks_path.exists() {
        TaskCatalog::load(&config.tasks_path)?
    } else {
        warn!(
            path = %config.tasks_path.display(),
            "no task catalog found, starting with an empty one",
        );
        TaskCatalog::default()
    };
    info!(
        tasks = catalog.tasks.len(),
        path = %config.tasks_path.display(),
        "task catalog loaded",
    );

    let mut registry = TaskRegistry::new(catalog.clone());
    for def in catalog.iter() {
        if let Some(command) = &def.command {
            registry.register(&def.task_id, Arc::new(CommandHandler::new(command)))?;
        }
    }

    let engine = Engine::open(
        EngineConfig::new(&config.data_dir),
        registry,
        Arc::new(SystemClock),
        Arc::new(UuidIdGen),
    )?;

    Ok(DaemonState {
        config: config.clone(),
        engine: Arc::new(engine),
        lock_file,
    })
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
