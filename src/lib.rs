//! # nbgrade
//!
//! An autograder for a GIS notebook assignment. It runs the submitted
//! notebook, inspects the names it defines, and checks them against the
//! assignment's requirements.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Grading settings
pub mod config;
/// A module defining a bunch of constant values to be used throughout
pub mod constants;
/// The check suite, results and reporting
pub mod grade;
/// Notebook documents and the submission loader
pub mod notebook;
/// Subprocess helpers
pub mod process;
/// Notebook execution and Python value descriptions
pub mod python;

use std::collections::BTreeSet;

use config::GraderConfig;
use grade::{GradingContext, Report, Suite, scan_imports};
use notebook::{Notebook, Submission};
use python::{ExecutionResult, Executor, Interpreter, Namespace};
use serde::Serialize;

/// Loads, executes and inspects the configured submission, then runs every
/// check in `suite`. Problems with the submission or the Python toolchain
/// surface as failing checks, never as errors.
pub async fn grade_submission(config: &GraderConfig, suite: &Suite) -> Report {
    tracing::info!("Grading {}", config.notebook().display());
    let submission = Submission::load(config.notebook());

    let (execution, namespace) = match submission.notebook() {
        Some(notebook) => match Interpreter::discover(config.python()) {
            Ok(interpreter) => {
                let executor = Executor::new(interpreter, config.timeout(), config.kernel());
                let execution = executor.execute(submission.path()).await;
                // Second, independent pass over the cells; their side effects run twice.
                let namespace = executor
                    .extract_namespace(submission.path(), notebook, suite.probe_request())
                    .await;
                (execution, namespace)
            }
            Err(err) => {
                tracing::warn!("{err:#}");
                (ExecutionResult::failed(format!("{err:#}")), Namespace::empty())
            }
        },
        None => {
            let reason = submission
                .load_error()
                .map(ToString::to_string)
                .unwrap_or_else(|| "Unknown error".to_string());
            (ExecutionResult::failed(reason), Namespace::empty())
        }
    };

    let ctx = GradingContext::new(submission, execution, namespace);
    Report::new(suite.run(&ctx))
}

/// Static outline of a notebook.
#[derive(Debug, Serialize)]
pub struct NotebookInfo {
    /// Total cell count.
    pub cells:      usize,
    /// Code cell count.
    pub code_cells: usize,
    /// Format version as `major.minor`.
    pub nbformat:   String,
    /// Top-level modules imported anywhere.
    pub imports:    BTreeSet<String>,
}

impl NotebookInfo {
    /// Outlines a parsed notebook.
    pub fn of(notebook: &Notebook) -> Self {
        Self {
            cells:      notebook.cells.len(),
            code_cells: notebook.code_cells().count(),
            nbformat:   format!("{}.{}", notebook.nbformat, notebook.nbformat_minor),
            imports:    notebook
                .code_cells()
                .flat_map(|c| scan_imports(&c.source_text()))
                .collect(),
        }
    }
}
