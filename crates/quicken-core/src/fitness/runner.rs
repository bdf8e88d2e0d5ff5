//! Test runner seam
//!
//! The evaluator depends on [`TestRunner`] only. [`ProcessRunner`] shells out
//! to a configurable command; tests substitute an in-process double.

use crate::config::PATH_PLACEHOLDER;
use crate::error::ExecutionError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Raw output of one test run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    /// Report text the status tokens are extracted from
    pub report: String,
    /// Wall-clock time of the whole invocation, startup included
    pub elapsed: Duration,
}

impl RunOutput {
    /// Create run output
    #[inline]
    #[must_use]
    pub fn new(report: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            report: report.into(),
            elapsed,
        }
    }
}

/// Runs the tests contained in a source file
///
/// Implementations must execute afresh on every call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Execute the tests in `path` and return the report
    async fn run(&self, path: &Path) -> Result<RunOutput, ExecutionError>;
}

/// Runner that spawns an external command per evaluation
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    command: Vec<String>,
    timeout: Option<Duration>,
    working_dir: Option<PathBuf>,
}

impl ProcessRunner {
    /// Create runner from a command template
    ///
    /// Every `{path}` argument is replaced with the file under test; if no
    /// argument contains the placeholder the path is appended.
    #[must_use]
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            timeout: None,
            working_dir: None,
        }
    }

    /// Kill the run and fail after `timeout`
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run commands from `dir` instead of the current directory
    #[inline]
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Command line for a given test file
    pub fn command_line(&self, path: &Path) -> Result<Vec<String>, ExecutionError> {
        if self.command.is_empty() {
            return Err(ExecutionError::EmptyCommand);
        }
        let path = path.to_string_lossy();
        let mut substituted = false;
        let mut line: Vec<String> = self
            .command
            .iter()
            .map(|arg| {
                if arg.contains(PATH_PLACEHOLDER) {
                    substituted = true;
                    arg.replace(PATH_PLACEHOLDER, &path)
                } else {
                    arg.clone()
                }
            })
            .collect();
        if !substituted {
            line.push(path.into_owned());
        }
        Ok(line)
    }
}

#[async_trait]
impl TestRunner for ProcessRunner {
    async fn run(&self, path: &Path) -> Result<RunOutput, ExecutionError> {
        let line = self.command_line(path)?;
        let (program, args) = line.split_first().ok_or(ExecutionError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(command = ?line, "running tests");
        let start = Instant::now();
        let child = cmd.spawn().map_err(|source| ExecutionError::Spawn {
            program: program.clone(),
            source,
        })?;

        let waited = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ExecutionError::Timeout(limit))?,
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|source| ExecutionError::io_error(path, source))?;
        let elapsed = start.elapsed();

        if !output.stderr.is_empty() {
            tracing::trace!(stderr = %String::from_utf8_lossy(&output.stderr), "runner stderr");
        }
        tracing::debug!(
            status = ?output.status.code(),
            elapsed_ms = elapsed.as_millis() as u64,
            "test run finished"
        );

        Ok(RunOutput {
            report: String::from_utf8_lossy(&output.stdout).into_owned(),
            elapsed,
        })
    }
}
