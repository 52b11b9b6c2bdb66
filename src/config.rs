#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use bon::Builder;

use crate::constants::{DEFAULT_KERNEL, DEFAULT_NOTEBOOK, DEFAULT_TIMEOUT};

/// Environment variable naming the submission notebook.
const NOTEBOOK_ENV: &str = "NBGRADE_NOTEBOOK";
/// Environment variable holding the execution timeout in seconds.
const TIMEOUT_ENV: &str = "NBGRADE_TIMEOUT_SECS";
/// Environment variable naming the Jupyter kernel.
const KERNEL_ENV: &str = "NBGRADE_KERNEL";
/// Environment variable pinning the Python interpreter.
const PYTHON_ENV: &str = "NBGRADE_PYTHON";

/// Settings for a single grading run.
#[derive(Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct GraderConfig {
    /// Path to the submitted notebook.
    #[builder(into, default = PathBuf::from(DEFAULT_NOTEBOOK))]
    notebook:     PathBuf,
    /// Bound on notebook execution, and separately on the namespace probe.
    #[builder(default = DEFAULT_TIMEOUT)]
    timeout:      Duration,
    /// Jupyter kernel name handed to `nbconvert`.
    #[builder(default = DEFAULT_KERNEL.to_string())]
    kernel:       String,
    /// Interpreter to use instead of discovering `uv`/`python3`.
    #[builder(into)]
    python:       Option<PathBuf>,
    /// Where to write a Gradescope `results.json`, if anywhere.
    #[builder(into)]
    results_json: Option<PathBuf>,
    /// Whether to print the results table.
    #[builder(default = true)]
    show_table:   bool,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GraderConfig {
    /// Builds a configuration from `NBGRADE_*` environment variables, falling
    /// back to defaults for anything unset or blank.
    pub fn from_env() -> Result<Self> {
        let timeout = match non_blank_env(TIMEOUT_ENV) {
            Some(secs) => Duration::from_secs(
                secs.parse::<u64>()
                    .with_context(|| format!("{TIMEOUT_ENV} must be a whole number of seconds"))?,
            ),
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self::builder()
            .notebook(non_blank_env(NOTEBOOK_ENV).unwrap_or_else(|| DEFAULT_NOTEBOOK.to_string()))
            .timeout(timeout)
            .kernel(non_blank_env(KERNEL_ENV).unwrap_or_else(|| DEFAULT_KERNEL.to_string()))
            .maybe_python(non_blank_env(PYTHON_ENV).map(PathBuf::from))
            .build())
    }

    /// Path to the submitted notebook.
    pub fn notebook(&self) -> &std::path::Path {
        self.notebook.as_path()
    }

    /// Execution and probe timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Jupyter kernel name.
    pub fn kernel(&self) -> &str {
        &self.kernel
    }

    /// Pinned Python interpreter, if any.
    pub fn python(&self) -> Option<&std::path::Path> {
        self.python.as_deref()
    }

    /// Gradescope results destination, if any.
    pub fn results_json(&self) -> Option<&std::path::Path> {
        self.results_json.as_deref()
    }

    /// Whether the results table is printed.
    pub fn show_table(&self) -> bool {
        self.show_table
    }

    /// Returns a copy with a different notebook path.
    pub fn with_notebook(mut self, notebook: impl Into<PathBuf>) -> Self {
        self.notebook = notebook.into();
        self
    }

    /// Returns a copy with a different timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns a copy with a different kernel name.
    pub fn with_kernel(mut self, kernel: impl Into<String>) -> Self {
        self.kernel = kernel.into();
        self
    }

    /// Returns a copy pinned to the given interpreter.
    pub fn with_python(mut self, python: impl Into<PathBuf>) -> Self {
        self.python = Some(python.into());
        self
    }

    /// Returns a copy that writes Gradescope results to `path`.
    pub fn with_results_json(mut self, path: impl Into<PathBuf>) -> Self {
        self.results_json = Some(path.into());
        self
    }

    /// Returns a copy with the results table toggled.
    pub fn with_show_table(mut self, show: bool) -> Self {
        self.show_table = show;
        self
    }
}

/// Reads an environment variable, treating blank values as unset.
fn non_blank_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
