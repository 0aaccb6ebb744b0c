// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Policy gate for dangerous options.

use crate::error::EngineError;
use prep_core::{Options, TaskDefinition, TaskPolicy};

/// Check a normalized submission against the task's policy.
///
/// A dangerous option only trips the gate when it is effectively engaged
/// (truthy and different from its default). The first locked option found
/// is reported; the caller rejects the whole submission, nothing is
/// silently stripped.
pub fn authorize(
    def: &TaskDefinition,
    options: &Options,
    policy: &TaskPolicy,
) -> Result<(), EngineError> {
    if policy.allow_dangerous {
        return Ok(());
    }
    for spec in &def.options {
        if !spec.dangerous {
            continue;
        }
        if let Some(value) = options.get(&spec.key) {
            if spec.is_effective(value) {
                return Err(EngineError::PolicyDenied {
                    task_id: def.task_id.clone(),
                    option: spec.key.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
