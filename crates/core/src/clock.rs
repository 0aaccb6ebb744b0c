// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for deterministic time in tests.
//!
//! All engine components read time through a [`Clock`] so tests can drive
//! the scheduler and executor with a [`FakeClock`] instead of sleeping.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of current time.
///
/// `now()` is monotonic and used for in-process deadlines; `epoch_ms()` is
/// wall-clock milliseconds and is what gets persisted in run and schedule
/// records.
pub trait Clock: Send + Sync + 'static {
    /// Current monotonic instant.
    fn now(&self) -> Instant;

    /// Current wall-clock time as milliseconds since the Unix epoch.
    fn epoch_ms(&self) -> u64;
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

#[derive(Debug)]
struct FakeClockInner {
    now: Instant,
    epoch_ms: u64,
}

/// Manually advanced clock for tests.
///
/// Clones share the same underlying time, so a clock handed to the engine
/// can still be advanced from the test body.
#[derive(Debug, Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeClockInner>>,
}

impl FakeClock {
    /// Create a fake clock starting at an arbitrary fixed wall time.
    pub fn new() -> Self {
        // 2024-01-01T00:00:00Z, a Monday. Convenient for cron tests.
        Self::at_epoch_ms(1_704_067_200_000)
    }

    /// Create a fake clock starting at the given wall time.
    pub fn at_epoch_ms(epoch_ms: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClockInner {
                now: Instant::now(),
                epoch_ms,
            })),
        }
    }

    /// Advance both monotonic and wall time.
    pub fn advance(&self, by: Duration) {
        let mut inner = self.inner.lock();
        inner.now += by;
        inner.epoch_ms += by.as_millis() as u64;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().now
    }

    fn epoch_ms(&self) -> u64 {
        self.inner.lock().epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
