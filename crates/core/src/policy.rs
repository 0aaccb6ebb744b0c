// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task safety policy.

use serde::{Deserialize, Serialize};

/// Policy flags for one task.
///
/// The default posture is safe: dangerous options stay blocked until an
/// operator explicitly flips `allow_dangerous` for the task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPolicy {
    #[serde(default)]
    pub allow_dangerous: bool,
}
