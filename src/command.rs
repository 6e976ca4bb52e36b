// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Execution of external control-plane CLIs (`eksctl`, `aws`, `helm`, `kubectl`).
//!
//! Providers never spawn processes directly. They build argument vectors and
//! hand them to a [`CommandRunner`], which makes argument construction and
//! output parsing testable with a recording fake.
//!
//! Every call is synchronous from the pipeline's point of view and is never
//! retried here.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

use crate::metrics::record_external_operation;

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error (tools often log progress here even on success)
    pub stderr: String,
}

impl CommandOutput {
    /// Output with the given stdout and empty stderr.
    #[must_use]
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// Errors raised while running an external command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The program could not be started
    #[error("Failed to execute {program}: {reason}")]
    Spawn {
        /// Program name
        program: String,
        /// OS error
        reason: String,
    },

    /// The program exited with a non-zero status
    #[error("{program} exited with status {status}: {stderr}")]
    Failed {
        /// Program name
        program: String,
        /// Exit status (-1 when terminated by a signal)
        status: i32,
        /// Trimmed standard error
        stderr: String,
    },

    /// The program's output could not be parsed
    #[error("Failed to parse {program} output: {reason}")]
    Parse {
        /// Program name
        program: String,
        /// Parser error
        reason: String,
    },
}

impl CommandError {
    /// Returns true if the failure output contains `marker`.
    ///
    /// Providers use this to map well-known service error codes
    /// (e.g. `EntityAlreadyExists`) onto typed boundary errors.
    #[must_use]
    pub fn mentions(&self, marker: &str) -> bool {
        match self {
            Self::Failed { stderr, .. } => stderr.contains(marker),
            Self::Spawn { .. } | Self::Parse { .. } => false,
        }
    }
}

/// Runs an external program to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, returning its output on a zero exit status.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Spawn`] if the program cannot be started and
    /// [`CommandError::Failed`] if it exits non-zero.
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CommandError>;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    envs: Vec<(String, String)>,
}

impl ProcessRunner {
    /// Create a runner that inherits the current environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an environment variable to every spawned process.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
        let operation = args.first().map_or("", String::as_str);
        debug!(program = %program, args = ?args, "Running external command");

        let started = Instant::now();
        let output = tokio::process::Command::new(program)
            .args(args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CommandError::Spawn {
                program: program.to_string(),
                reason: e.to_string(),
            });

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                record_external_operation(program, operation, "error", started.elapsed());
                return Err(e);
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if output.status.success() {
            record_external_operation(program, operation, "success", started.elapsed());
            Ok(CommandOutput { stdout, stderr })
        } else {
            record_external_operation(program, operation, "error", started.elapsed());
            let status = output.status.code().unwrap_or(-1);
            warn!(program = %program, status = status, stderr = %stderr, "External command failed");
            Err(CommandError::Failed {
                program: program.to_string(),
                status,
                stderr,
            })
        }
    }
}

/// Parse JSON printed on stdout by `program`.
///
/// # Errors
///
/// Returns [`CommandError::Parse`] if stdout is not valid JSON for `T`.
pub fn parse_json<T: DeserializeOwned>(
    program: &str,
    output: &CommandOutput,
) -> Result<T, CommandError> {
    serde_json::from_str(&output.stdout).map_err(|e| CommandError::Parse {
        program: program.to_string(),
        reason: e.to_string(),
    })
}

/// Convert string slices into the owned argument vector runners expect.
#[must_use]
pub fn args<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod command_tests;
