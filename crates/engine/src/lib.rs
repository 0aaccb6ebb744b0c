// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! prep-engine: run execution and scheduling.
//!
//! [`Engine`] is the process-wide facade: it owns the event store, the
//! task registry, the FIFO run queue with its single worker, and the
//! scheduler tick loop. Everything the daemon exposes goes through it.

mod engine;
mod error;
mod executor;
mod gate;
mod handler;
mod registry;
mod scheduler;

pub use engine::{Engine, EngineConfig};
pub use error::EngineError;
pub use gate::authorize;
pub use handler::{HandlerError, TaskContext, TaskHandler};
pub use registry::TaskRegistry;
