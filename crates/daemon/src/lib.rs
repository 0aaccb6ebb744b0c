// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! prep-daemon: the `prepd` background process.
//!
//! Composition root for the engine: resolves the state directory, takes
//! the daemon lock, loads the task catalog, binds subprocess handlers,
//! and runs the engine loops until a shutdown signal.

mod command_handler;
mod lifecycle;

pub use command_handler::CommandHandler;
pub use lifecycle::{startup, Config, DaemonState, LifecycleError};
