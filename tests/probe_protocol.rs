use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use nbgrade::{
    grade::{GradingContext, Suite},
    notebook::{Notebook, Submission},
    python::{
        ExecutionResult, Executor, Interpreter, Invocation, InvocationOutcome, ProbeRequest,
        Value, execute::summarize_error, util::python_path,
    },
};
use serde_json::json;

/// Writes a notebook with the given code cells and parses it back.
fn write_notebook(path: &Path, cells: &[&str]) -> Notebook {
    let document = json!({
        "cells": cells
            .iter()
            .map(|source| json!({"cell_type": "code", "metadata": {}, "outputs": [], "source": source}))
            .collect::<Vec<_>>(),
        "metadata": {},
        "nbformat": 4,
        "nbformat_minor": 5
    });
    std::fs::write(path, document.to_string()).expect("write notebook");
    Notebook::load(path).expect("load notebook")
}

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("nbgrade-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

/// A notebook with no geospatial dependencies, so any Python can probe it.
fn plain_notebook() -> Notebook {
    let document = json!({
        "cells": [
            {"cell_type": "markdown", "metadata": {}, "source": "# not code"},
            {"cell_type": "code", "metadata": {}, "outputs": [], "source": "x = 41 + 1"},
            {"cell_type": "code", "metadata": {}, "outputs": [],
             "source": ["%matplotlib inline\n", "!pip install nothing\n", "print('hi')"]},
            {"cell_type": "code", "metadata": {}, "outputs": [],
             "source": "def summarize(gdf, extra=None):\n    return {'n': gdf, 'items': [1, 2.5, None]}"},
            {"cell_type": "code", "metadata": {}, "outputs": [], "source": "raise ValueError('boom')"},
            {"cell_type": "code", "metadata": {}, "outputs": [], "source": "after = True"}
        ],
        "metadata": {},
        "nbformat": 4,
        "nbformat_minor": 5
    });
    Notebook::parse(Path::new("plain.ipynb"), &document.to_string()).expect("parse notebook")
}

fn executor() -> Option<Executor> {
    let python = python_path().ok()?;
    Some(Executor::new(
        Interpreter::Direct(python),
        Duration::from_secs(120),
        "python3",
    ))
}

#[tokio::test]
async fn probe_describes_requested_names() {
    let Some(executor) = executor() else {
        eprintln!("no python interpreter on PATH, skipping");
        return;
    };
    let request = ProbeRequest::default()
        .inspect("x")
        .inspect("summarize")
        .inspect("after")
        .inspect("never_defined");

    let namespace = executor
        .extract_namespace(Path::new("plain.ipynb"), &plain_notebook(), request)
        .await;

    assert!(matches!(namespace.get("x"), Some(v) if v.as_f64() == Some(42.0)));
    assert_eq!(
        namespace.get("summarize"),
        Some(&Value::Callable {
            name:       "summarize".into(),
            parameters: vec!["gdf".into(), "extra".into()],
        })
    );
    assert_eq!(namespace.get("after"), Some(&Value::Bool { value: true }));
    assert!(!namespace.contains("never_defined"));
    assert_eq!(namespace.output(), "hi\n");

    let errors = namespace.cell_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].cell, 3);
    assert!(errors[0].error.contains("ValueError: boom"));
}

#[tokio::test]
async fn probe_reports_call_outcomes() {
    let Some(executor) = executor() else {
        eprintln!("no python interpreter on PATH, skipping");
        return;
    };
    let request = ProbeRequest::default()
        .invoke(Invocation::new("no-args", "summarize", vec![]))
        .invoke(Invocation::new("not-callable", "x", vec![]))
        .invoke(Invocation::new("missing", "never_defined", vec![]));

    let namespace = executor
        .extract_namespace(Path::new("plain.ipynb"), &plain_notebook(), request)
        .await;

    match namespace.invocation("no-args") {
        Some(InvocationOutcome::Raised { error }) => assert!(error.contains("TypeError")),
        other => panic!("expected the call to raise, got {other:?}"),
    }
    assert!(namespace.invocation("not-callable").is_none());
    assert!(namespace.invocation("missing").is_none());
}

#[tokio::test]
async fn cells_resolve_relative_paths_against_the_notebook_directory() {
    let Some(executor) = executor() else {
        eprintln!("no python interpreter on PATH, skipping");
        return;
    };
    let dir = temp_dir();
    std::fs::write(dir.join("regions.txt"), "Arusha\nDodoma\nMwanza\n").expect("write data");
    let path = dir.join("student_submission.ipynb");
    let notebook = write_notebook(&path, &["n_regions = len(open('regions.txt').read().split())"]);

    let namespace = executor
        .extract_namespace(&path, &notebook, ProbeRequest::default().inspect("n_regions"))
        .await;

    assert!(namespace.cell_errors().is_empty(), "{:?}", namespace.cell_errors());
    assert!(matches!(namespace.get("n_regions"), Some(v) if v.as_f64() == Some(3.0)));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn unreachable_interpreter_yields_an_empty_namespace() {
    let executor = Executor::new(
        Interpreter::Direct(std::env::temp_dir().join(uuid::Uuid::new_v4().to_string())),
        Duration::from_secs(5),
        "python3",
    );
    let namespace = executor
        .extract_namespace(
            Path::new("plain.ipynb"),
            &plain_notebook(),
            ProbeRequest::default().inspect("x"),
        )
        .await;

    assert!(namespace.is_empty());
    assert!(namespace.cell_errors().is_empty());
}

/// Writes an executable shell script standing in for the interpreter.
#[cfg(unix)]
fn fake_interpreter(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("fake-python");
    std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).expect("write script");
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    script
}

#[cfg(unix)]
#[tokio::test]
async fn execution_runs_in_the_notebook_directory() {
    let dir = temp_dir();
    // Echoes its working directory and last argument as an executed notebook.
    let script = fake_interpreter(
        &dir,
        r#"for last; do :; done
printf '{"cells":[{"cell_type":"code","source":"","outputs":[{"output_type":"stream","name":"stdout","text":"%s|%s"}]}],"nbformat":4,"nbformat_minor":5}' "$(pwd)" "$last""#,
    );

    let executor = Executor::new(Interpreter::Direct(script), Duration::from_secs(30), "python3");
    let result = executor.execute(&dir.join("student_submission.ipynb")).await;

    assert!(result.successful(), "{:?}", result.error());
    let (cwd, target) = result.output().split_once('|').expect("cwd and target");
    assert_eq!(
        std::fs::canonicalize(cwd).expect("canonical cwd"),
        std::fs::canonicalize(&dir).expect("canonical dir")
    );
    assert_eq!(target, "student_submission.ipynb");

    std::fs::remove_dir_all(&dir).ok();
}

#[cfg(unix)]
#[tokio::test]
async fn execution_timeouts_are_reported_in_seconds() {
    let dir = temp_dir();
    let slow = fake_interpreter(&dir, "sleep 30");

    let executor = Executor::new(Interpreter::Direct(slow), Duration::from_secs(1), "python3");
    let result = executor.execute(&dir.join("student_submission.ipynb")).await;

    assert!(!result.successful());
    assert_eq!(
        result.error(),
        Some("Notebook execution timed out after 1 seconds")
    );

    std::fs::remove_dir_all(&dir).ok();
}

/// Whether `python` can import the geospatial stack.
fn has_geopandas(python: &Path) -> bool {
    std::process::Command::new(python)
        .args(["-c", "import geopandas"])
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

#[tokio::test]
async fn suite_request_against_a_geopandas_notebook() {
    let Ok(python) = python_path() else {
        eprintln!("no python interpreter on PATH, skipping");
        return;
    };
    if !has_geopandas(&python) {
        eprintln!("geopandas is not importable, skipping");
        return;
    }
    let executor = Executor::new(Interpreter::Direct(python), Duration::from_secs(300), "python3");

    let dir = temp_dir();
    let path = dir.join("student_submission.ipynb");
    let notebook = write_notebook(
        &path,
        &[
            "import geopandas as gpd",
            "tz_shapefile = gpd.GeoDataFrame(\n    {'region': ['Arusha', 'Dodoma', 'Mwanza']},\n    geometry=gpd.points_from_xy([36.7, 35.7, 32.9], [-3.4, -6.2, -2.5]),\n    crs='EPSG:4326',\n)\ntz_projected = tz_shapefile.to_crs(epsg=21037)",
            "def describe_geodataframe(gdf):\n    return {\n        'crs': gdf.crs.to_epsg(),\n        'geometry_type': list(gdf.geom_type.unique()),\n        'num_features': len(gdf),\n        'attributes': [c for c in gdf.columns if c != 'geometry'],\n        'bounds': gdf.total_bounds,\n    }",
            "def compare_projections(a, b):\n    return {'original_crs': a.crs, 'new_crs': b.crs}",
        ],
    );

    let suite = Suite::gis_assignment();
    let namespace = executor
        .extract_namespace(&path, &notebook, suite.probe_request())
        .await;
    assert!(namespace.cell_errors().is_empty(), "{:?}", namespace.cell_errors());

    match namespace.get("tz_shapefile") {
        Some(Value::GeoDataFrame { rows, columns, crs }) => {
            assert_eq!(*rows, 3);
            assert!(columns.iter().any(|c| c == "geometry"));
            assert!(!crs.as_ref().expect("source crs").is_projected);
        }
        other => panic!("expected a GeoDataFrame, got {other:?}"),
    }
    assert!(
        namespace
            .get("tz_projected")
            .and_then(Value::table_crs)
            .expect("projected crs")
            .is_projected
    );
    assert_eq!(namespace.crs_equal("tz_projected", "tz_shapefile"), Some(false));

    match namespace.invocation("describe_geodataframe::describe_geodataframe") {
        Some(InvocationOutcome::Returned {
            result,
            crs_matches,
        }) => {
            let entries = result.entries().expect("a dict");
            assert!(matches!(entries.get("crs"), Some(Value::Int { .. })));
            assert!(matches!(entries.get("num_features"), Some(v) if v.as_f64() == Some(2.0)));
            assert_eq!(crs_matches.len(), 1);
            assert!(crs_matches[0].equal, "an EPSG code equals the input CRS");
        }
        other => panic!("expected describe_geodataframe to return, got {other:?}"),
    }

    let ctx = GradingContext::new(
        Submission::load(&path),
        ExecutionResult::succeeded(""),
        namespace,
    );
    for result in suite.run(&ctx) {
        if result.requirement() != "required_libraries" {
            assert!(result.passed(), "{}: {}", result.requirement(), result.reason());
        }
    }

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn error_summaries_strip_colour_and_keep_the_tail() {
    let mut stderr: String = (0..60).map(|i| format!("line {i}\n")).collect();
    stderr.push_str("\u{1b}[0;31mValueError\u{1b}[0m: boom\n");

    let summary = summarize_error(&stderr);
    let lines: Vec<&str> = summary.lines().collect();

    assert_eq!(lines.len(), 40);
    assert_eq!(lines[0], "line 21");
    assert_eq!(lines[39], "ValueError: boom");
}
