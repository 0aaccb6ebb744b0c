// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task registry: the immutable catalog plus the handlers that execute it.

use crate::error::EngineError;
use crate::handler::TaskHandler;
use prep_core::{Options, TaskCatalog, TaskDefinition};
use std::collections::HashMap;
use std::sync::Arc;

/// Catalog of known tasks with their registered handlers.
///
/// The catalog is fixed at startup; handler registration happens before
/// the engine starts accepting submissions.
pub struct TaskRegistry {
    catalog: TaskCatalog,
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl TaskRegistry {
    pub fn new(catalog: TaskCatalog) -> Self {
        Self {
            catalog,
            handlers: HashMap::new(),
        }
    }

    /// Attach a handler to a catalog task.
    pub fn register(
        &mut self,
        task_id: &str,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<(), EngineError> {
        if self.catalog.get(task_id).is_none() {
            return Err(EngineError::UnknownTask(task_id.to_string()));
        }
        self.handlers.insert(task_id.to_string(), handler);
        Ok(())
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    pub fn definition(&self, task_id: &str) -> Result<&TaskDefinition, EngineError> {
        self.catalog
            .get(task_id)
            .ok_or_else(|| EngineError::UnknownTask(task_id.to_string()))
    }

    pub fn handler_for(&self, task_id: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(task_id).cloned()
    }

    /// Display title for listings; `None` for tasks not in the catalog
    /// (runs can outlive their task definitions).
    pub fn title_of(&self, task_id: &str) -> Option<String> {
        self.catalog.get(task_id).map(|def| def.title.clone())
    }

    /// Validate and normalize a submission's options for a task.
    pub fn validate_submission(
        &self,
        task_id: &str,
        raw: &Options,
    ) -> Result<Options, EngineError> {
        Ok(self.definition(task_id)?.validate_options(raw)?)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
