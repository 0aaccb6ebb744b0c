// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task catalog: declarative task definitions and option validation.
//!
//! The catalog is loaded once at startup (typically from `tasks.toml`) and
//! never mutated. Option values arrive as raw JSON from the caller and are
//! coerced to their declared kind before a run is ever created; unknown keys
//! and type mismatches are rejected up front.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Normalized option map, in catalog declaration order.
pub type Options = IndexMap<String, Value>;

/// Declared type of a task option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptionKind {
    Boolean,
    Integer,
    Number,
    String,
    Choice,
    MultiChoice,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKind::Boolean => write!(f, "boolean"),
            OptionKind::Integer => write!(f, "integer"),
            OptionKind::Number => write!(f, "number"),
            OptionKind::String => write!(f, "string"),
            OptionKind::Choice => write!(f, "choice"),
            OptionKind::MultiChoice => write!(f, "multi-choice"),
        }
    }
}

/// Errors from validating submitted options against a task definition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionError {
    #[error("unknown option: {key}")]
    UnknownKey { key: String },
    #[error("option {key} must be a {expected}")]
    TypeMismatch { key: String, expected: OptionKind },
    #[error("option {key}: {value:?} is not one of the allowed choices")]
    InvalidChoice { key: String, value: String },
}

/// Errors from loading or sanity-checking a task catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("task {task}: {message}")]
    Invalid { task: String, message: String },
}

/// A single declared option on a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionSpec {
    pub key: String,
    pub kind: OptionKind,
    /// Value used when the caller omits the option. `null` means the option
    /// simply has no value until supplied.
    #[serde(default)]
    pub default: Value,
    /// Dangerous options can cause destructive changes in the external
    /// recipe service and are gated by per-task policy.
    #[serde(default)]
    pub dangerous: bool,
    /// Allowed values for `choice` / `multi-choice` options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}

impl OptionSpec {
    /// Coerce a raw JSON value to this option's declared kind.
    pub fn coerce(&self, raw: &Value) -> Result<Value, OptionError> {
        let mismatch = || OptionError::TypeMismatch {
            key: self.key.clone(),
            expected: self.kind,
        };

        match self.kind {
            OptionKind::Boolean => match raw {
                Value::Bool(b) => Ok(Value::Bool(*b)),
                // Form submissions arrive as strings
                Value::String(s) => match s.to_ascii_lowercase().as_str() {
                    "true" | "1" | "on" | "yes" => Ok(Value::Bool(true)),
                    "false" | "0" | "off" | "no" => Ok(Value::Bool(false)),
                    _ => Err(mismatch()),
                },
                _ => Err(mismatch()),
            },
            OptionKind::Integer => match raw {
                Value::Number(n) => n.as_i64().map(Value::from).ok_or_else(mismatch),
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| mismatch()),
                _ => Err(mismatch()),
            },
            OptionKind::Number => match raw {
                Value::Number(n) => n.as_f64().map(Value::from).ok_or_else(mismatch),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::from)
                    .map_err(|_| mismatch()),
                _ => Err(mismatch()),
            },
            OptionKind::String => match raw {
                Value::String(s) => Ok(Value::String(s.clone())),
                _ => Err(mismatch()),
            },
            OptionKind::Choice => match raw {
                Value::String(s) if self.allows_choice(s) => Ok(Value::String(s.clone())),
                Value::String(s) => Err(OptionError::InvalidChoice {
                    key: self.key.clone(),
                    value: s.clone(),
                }),
                _ => Err(mismatch()),
            },
            OptionKind::MultiChoice => match raw {
                Value::Array(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            Value::String(s) if self.allows_choice(s) => {
                                out.push(Value::String(s.clone()));
                            }
                            Value::String(s) => {
                                return Err(OptionError::InvalidChoice {
                                    key: self.key.clone(),
                                    value: s.clone(),
                                });
                            }
                            _ => return Err(mismatch()),
                        }
                    }
                    Ok(Value::Array(out))
                }
                _ => Err(mismatch()),
            },
        }
    }

    fn allows_choice(&self, value: &str) -> bool {
        self.choices
            .as_ref()
            .is_some_and(|choices| choices.iter().any(|c| c == value))
    }

    /// Whether a normalized value actually engages this option.
    ///
    /// Dangerous behavior is only gated when the option is set to something
    /// truthy that differs from its declared default; submitting the default
    /// (or an explicit "off") is always allowed.
    pub fn is_effective(&self, value: &Value) -> bool {
        if *value == self.default {
            return false;
        }
        match value {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
        }
    }
}

/// A task in the catalog: identity, display title, declared options, and
/// (optionally) the command the daemon runs for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Task ID (injected from the catalog map key)
    #[serde(skip)]
    pub task_id: String,
    pub title: String,
    #[serde(default)]
    pub options: Vec<OptionSpec>,
    /// Shell command the daemon's subprocess handler runs for this task.
    /// Absent for tasks whose handlers are registered in code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl TaskDefinition {
    /// Look up a declared option by key.
    pub fn option(&self, key: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|o| o.key == key)
    }

    /// Validate and normalize raw options against this definition.
    ///
    /// Unknown keys are rejected. Values are coerced to their declared kind.
    /// Omitted (or explicitly null) options take their declared default. The
    /// result contains every declared option, in declaration order.
    pub fn validate_options(&self, raw: &Options) -> Result<Options, OptionError> {
        for key in raw.keys() {
            if self.option(key).is_none() {
                return Err(OptionError::UnknownKey { key: key.clone() });
            }
        }

        let mut normalized = Options::new();
        for spec in &self.options {
            let value = match raw.get(&spec.key) {
                Some(Value::Null) | None => spec.default.clone(),
                Some(value) => spec.coerce(value)?,
            };
            normalized.insert(spec.key.clone(), value);
        }
        Ok(normalized)
    }

    /// Sanity-check the definition itself (run once at catalog load).
    fn check(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for spec in &self.options {
            if !seen.insert(spec.key.as_str()) {
                return Err(format!("duplicate option key {:?}", spec.key));
            }
            let needs_choices =
                matches!(spec.kind, OptionKind::Choice | OptionKind::MultiChoice);
            let has_choices = spec.choices.as_ref().is_some_and(|c| !c.is_empty());
            if needs_choices && !has_choices {
                return Err(format!("option {:?} declares no choices", spec.key));
            }
            if !needs_choices && spec.choices.is_some() {
                return Err(format!(
                    "option {:?} has choices but kind {}",
                    spec.key, spec.kind
                ));
            }
        }
        Ok(())
    }
}

/// The immutable task catalog, loaded at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskCatalog {
    #[serde(default)]
    pub tasks: IndexMap<String, TaskDefinition>,
}

impl TaskCatalog {
    /// Parse a catalog from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, CatalogError> {
        let mut catalog: TaskCatalog = toml::from_str(text)?;
        for (id, def) in &mut catalog.tasks {
            def.task_id = id.clone();
            def.check().map_err(|message| CatalogError::Invalid {
                task: id.clone(),
                message,
            })?;
        }
        Ok(catalog)
    }

    /// Load a catalog from a TOML file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn get(&self, task_id: &str) -> Option<&TaskDefinition> {
        self.tasks.get(task_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.tasks.values()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
