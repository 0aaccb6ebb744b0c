// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! prep-core: domain types for the Prep maintenance automation engine

pub mod cancel;
pub mod clock;
pub mod cron;
pub mod event;
pub mod id;
pub mod policy;
pub mod run;
pub mod schedule;
pub mod task;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use cancel::CancelToken;
pub use clock::{Clock, FakeClock, SystemClock};
pub use cron::{CronError, CronExpr};
pub use event::Event;
pub use id::{CountingIdGen, IdGen, RunId, ScheduleId, UuidIdGen};
pub use policy::TaskPolicy;
pub use run::{Run, RunStatus, RunStatusError};
pub use schedule::{Schedule, ScheduleConfig, ScheduleError, ScheduleKind};
pub use task::{
    CatalogError, OptionError, OptionKind, OptionSpec, Options, TaskCatalog, TaskDefinition,
};
