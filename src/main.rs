#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # nbgrade
//!
//! Grades a GIS notebook submission: runs it, inspects the variables and
//! functions it defines, and reports one result per requirement.
//!
//! The exit status is success only when every check passes.

use std::{path::PathBuf, process::ExitCode, time::Duration};

use anyhow::{Context, Result};
use bpaf::*;
use dotenvy::dotenv;
use nbgrade::{
    NotebookInfo, config::GraderConfig, grade::Suite, grade_submission, notebook::Notebook,
};
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Overrides for a grading run; anything absent comes from the environment.
#[derive(Debug, Clone)]
struct GradeArgs {
    /// Notebook path.
    notebook:     Option<PathBuf>,
    /// Timeout in seconds.
    timeout:      Option<u64>,
    /// Jupyter kernel name.
    kernel:       Option<String>,
    /// Python interpreter.
    python:       Option<PathBuf>,
    /// Gradescope results destination.
    results_json: Option<PathBuf>,
    /// Suppress the table.
    no_table:     bool,
}

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Grade a submission
    Grade(GradeArgs),
    /// Print a JSON outline of a notebook
    Info(Option<PathBuf>),
}

/// Parse the command line arguments and return a `Cmd` enum
fn options() -> Cmd {
    /// parses the notebook path
    fn nb() -> impl Parser<Option<PathBuf>> {
        long("notebook")
            .short('n')
            .help("Path to the submitted notebook")
            .argument::<PathBuf>("PATH")
            .optional()
    }

    let timeout = long("timeout")
        .help("Seconds allowed for notebook execution")
        .argument::<u64>("SECS")
        .optional();
    let kernel = long("kernel")
        .help("Jupyter kernel to execute with")
        .argument::<String>("NAME")
        .optional();
    let python = long("python")
        .help("Python interpreter to use instead of uv/python3")
        .argument::<PathBuf>("PATH")
        .optional();
    let results_json = long("results-json")
        .help("Write Gradescope results to this file")
        .argument::<PathBuf>("PATH")
        .optional();
    let no_table = long("no-table").help("Do not print the results table").switch();
    let notebook = nb();

    let grade = construct!(GradeArgs {
        notebook,
        timeout,
        kernel,
        python,
        results_json,
        no_table
    })
    .to_options()
    .command("grade")
    .help("Grade a notebook submission")
    .map(Cmd::Grade);

    let info = construct!(Cmd::Info(nb()))
        .to_options()
        .command("info")
        .help("Prints a JSON outline of the notebook");

    let cmd = construct!([grade, info]);

    cmd.to_options()
        .descr("Autograder for the GIS notebook assignment")
        .run()
}

/// Applies CLI overrides on top of the environment configuration.
fn resolve_config(args: GradeArgs) -> Result<GraderConfig> {
    let mut config = GraderConfig::from_env()?;
    if let Some(notebook) = args.notebook {
        config = config.with_notebook(notebook);
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(kernel) = args.kernel {
        config = config.with_kernel(kernel);
    }
    if let Some(python) = args.python {
        config = config.with_python(python);
    }
    if let Some(path) = args.results_json {
        config = config.with_results_json(path);
    }
    Ok(config.with_show_table(!args.no_table))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv().ok();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let filter_layer = LevelFilter::from_level(Level::INFO);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    match options() {
        Cmd::Grade(args) => {
            let config = resolve_config(args)?;
            let suite = Suite::gis_assignment();
            let report = grade_submission(&config, &suite).await;

            if config.show_table() {
                eprintln!("{}", report.table());
            }
            eprintln!("{}", report.summary());
            if let Some(path) = config.results_json() {
                report.write_gradescope(path)?;
            }

            Ok(if report.all_passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Cmd::Info(notebook) => {
            let config = GraderConfig::from_env()?;
            let path = notebook.unwrap_or_else(|| config.notebook().to_path_buf());
            let parsed = Notebook::load(&path)?;
            let info = serde_json::to_string_pretty(&NotebookInfo::of(&parsed))
                .context("Could not serialize notebook outline")?;
            println!("{info}");
            Ok(ExitCode::SUCCESS)
        }
    }
}
