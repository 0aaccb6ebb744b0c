// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess handler for catalog tasks that declare a `command`.
//!
//! The command runs under `bash -c` with the run's options exported as
//! `PREP_OPT_<KEY>` environment variables. Stdout and stderr stream into
//! the run log as they arrive. A raised cancel token kills the child.

use async_trait::async_trait;
use prep_engine::{HandlerError, TaskContext, TaskHandler};
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::warn;

/// How often the handler polls the cancel token while the child runs.
const CANCEL_POLL: Duration = Duration::from_millis(200);

pub struct CommandHandler {
    command: String,
}

impl CommandHandler {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

/// Environment representation of an option value.
///
/// Scalars render bare (`true`, `25`, `weeknight`); arrays from
/// multi-choice options join with commas; anything else falls back to
/// JSON text.
fn env_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

fn env_key(option_key: &str) -> String {
    format!("PREP_OPT_{}", option_key.replace('-', "_").to_uppercase())
}

fn spawn_line_reader(
    stream: Option<impl AsyncRead + Unpin + Send + 'static>,
    tx: mpsc::Sender<String>,
) {
    let Some(stream) = stream else { return };
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
}

#[async_trait]
impl TaskHandler for CommandHandler {
    async fn execute(&self, ctx: &mut TaskContext) -> Result<(), HandlerError> {
        let mut cmd = Command::new("bash");
        cmd.arg("-c")
            .arg(&self.command)
            .env("PREP_RUN_ID", ctx.run_id.as_str())
            .env("PREP_TASK_ID", &ctx.task_id)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &ctx.options {
            cmd.env(env_key(key), env_value(value));
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| HandlerError::new(format!("failed to spawn command: {e}")))?;

        let (tx, mut rx) = mpsc::channel::<String>(64);
        spawn_line_reader(child.stdout.take(), tx.clone());
        spawn_line_reader(child.stderr.take(), tx);

        let mut killed = false;
        // Interval rather than a sleep in the select arm, so steady output
        // cannot starve the cancel check
        let mut poll = tokio::time::interval(CANCEL_POLL);
        loop {
            tokio::select! {
                line = rx.recv() => match line {
                    Some(line) => ctx.log(&line),
                    // Both pipes closed; the child is done or dying
                    None => break,
                },
                _ = poll.tick() => {
                    if ctx.is_canceled() && !killed {
                        killed = true;
                        if let Err(e) = child.start_kill() {
                            warn!(run_id = %ctx.run_id, error = %e, "failed to kill child");
                        }
                        ctx.log("[prepd] canceled, terminating command");
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| HandlerError::new(format!("failed to reap command: {e}")))?;

        // The executor records the run as canceled regardless of what we
        // return once the token is raised
        if ctx.is_canceled() {
            return Ok(());
        }
        if status.success() {
            Ok(())
        } else {
            match status.code() {
                Some(code) => Err(HandlerError::new(format!("command exited with code {code}"))),
                None => Err(HandlerError::new("command killed by signal")),
            }
        }
    }
}

#[cfg(test)]
#[path = "command_handler_tests.rs"]
mod tests;
