#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Notebook execution and namespace extraction.

use std::{ffi::OsString, path::Path, sync::LazyLock, time::Duration};

use anyhow::{Context, Result};
use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{
    namespace::{Namespace, ProbeRequest},
    util::Interpreter,
};
use crate::{
    constants::{ERROR_TAIL_LINES, PROBE_SCRIPT},
    notebook::Notebook,
    process::{self, ProcessError, StdinSource},
};

/// Matches terminal colour escape sequences in tracebacks.
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("ANSI escape pattern is valid")
});

/// Result of running the notebook end to end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether every cell ran without error within the deadline.
    successful: bool,
    /// What went wrong, if anything.
    error:      Option<String>,
    /// `stdout` stream output of the executed cells.
    output:     String,
}

impl ExecutionResult {
    /// A successful run.
    pub fn succeeded(output: impl Into<String>) -> Self {
        Self {
            successful: true,
            error:      None,
            output:     output.into(),
        }
    }

    /// A failed run.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            successful: false,
            error:      Some(error.into()),
            output:     String::new(),
        }
    }

    /// Whether execution succeeded.
    pub fn successful(&self) -> bool {
        self.successful
    }

    /// Error message, if execution failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Captured cell output.
    pub fn output(&self) -> &str {
        &self.output
    }
}

/// Strips colour codes and keeps the last `ERROR_TAIL_LINES` lines.
pub fn summarize_error(stderr: &str) -> String {
    let clean = ANSI_ESCAPE.replace_all(stderr, "");
    let lines: Vec<&str> = clean.trim().lines().collect();
    let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[start..].iter().join("\n")
}

/// Runs notebooks through `nbconvert` and the namespace probe.
#[derive(Debug, Clone)]
pub struct Executor {
    /// How Python is launched.
    interpreter: Interpreter,
    /// Bound on each subprocess.
    timeout:     Duration,
    /// Jupyter kernel to execute with.
    kernel:      String,
}

impl Executor {
    /// Creates an executor.
    pub fn new(interpreter: Interpreter, timeout: Duration, kernel: impl Into<String>) -> Self {
        Self {
            interpreter,
            timeout,
            kernel: kernel.into(),
        }
    }

    /// Executes every code cell of the notebook at `path` in one kernel
    /// session. Errors and timeouts are captured, never returned.
    pub async fn execute(&self, path: &Path) -> ExecutionResult {
        tracing::info!("Executing {}", path.display());
        match self.try_execute(path).await {
            Ok(result) => result,
            Err(err) => {
                let message = match err.downcast_ref::<ProcessError>() {
                    Some(ProcessError::TimedOut { limit, .. }) => {
                        format!("Notebook execution timed out after {} seconds", limit.as_secs())
                    }
                    None => format!("{err:#}"),
                };
                tracing::warn!("{message}");
                ExecutionResult::failed(message)
            }
        }
    }

    /// Runs `nbconvert --execute`, writing the executed notebook to stdout.
    async fn try_execute(&self, path: &Path) -> Result<ExecutionResult> {
        let secs = self.timeout.as_secs().max(1);
        let dir = working_dir(path);
        let target = match (dir, path.file_name()) {
            (Some(_), Some(name)) => name.to_os_string(),
            _ => path.as_os_str().to_os_string(),
        };
        let extra: Vec<OsString> = vec![
            "--to".into(),
            "notebook".into(),
            "--execute".into(),
            "--stdout".into(),
            format!("--ExecutePreprocessor.timeout={secs}").into(),
            format!("--ExecutePreprocessor.kernel_name={}", self.kernel).into(),
            target,
        ];
        let (program, args) = self.interpreter.module_command("nbconvert", &extra);

        let collected = process::run_collect(
            &program,
            &args,
            StdinSource::Null,
            dir,
            &headless_env(),
            Some(self.timeout),
        )
        .await?;

        if !collected.status.success() {
            return Ok(ExecutionResult::failed(summarize_error(&collected.stderr_lossy())));
        }

        let executed = Notebook::parse(path, &collected.stdout_lossy())
            .context("nbconvert did not produce an executed notebook")?;
        Ok(ExecutionResult::succeeded(executed.stdout_text()))
    }

    /// Re-executes each code cell of the notebook read from `path` in a fresh
    /// interpreter, inside the notebook's directory, and describes the
    /// requested names. Any failure yields an empty namespace.
    pub async fn extract_namespace(
        &self,
        path: &Path,
        notebook: &Notebook,
        request: ProbeRequest,
    ) -> Namespace {
        tracing::info!("Extracting namespace from {} code cells", notebook.code_cells().count());
        match self.try_extract(path, notebook, request).await {
            Ok(namespace) => {
                for err in namespace.cell_errors() {
                    tracing::warn!("Code cell {} raised during re-execution:\n{}", err.cell, err.error);
                }
                namespace
            }
            Err(err) => {
                tracing::warn!("Could not inspect the submission's namespace: {err:#}");
                Namespace::empty()
            }
        }
    }

    /// Feeds the probe its request on stdin and parses its report.
    async fn try_extract(
        &self,
        path: &Path,
        notebook: &Notebook,
        request: ProbeRequest,
    ) -> Result<Namespace> {
        let request = request.with_cells(notebook.code_sources());
        let payload = serde_json::to_vec(&request).context("could not serialize probe request")?;
        let (program, args) = self.interpreter.code_command(PROBE_SCRIPT);

        let collected = process::run_collect(
            &program,
            &args,
            StdinSource::Bytes(payload),
            working_dir(path),
            &headless_env(),
            Some(self.timeout),
        )
        .await?;

        Namespace::from_probe_output(&collected.stdout_lossy()).with_context(|| {
            format!("probe stderr:\n{}", summarize_error(&collected.stderr_lossy()))
        })
    }
}

/// Directory relative paths in the notebook resolve against, matching the
/// kernel `nbconvert` starts. `None` means the current directory.
fn working_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|dir| !dir.as_os_str().is_empty())
}

/// Environment that keeps plotting libraries off the display.
fn headless_env() -> Vec<(OsString, OsString)> {
    vec![("MPLBACKEND".into(), "Agg".into())]
}
