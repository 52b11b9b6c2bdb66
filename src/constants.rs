#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::time::Duration;

/// Notebook path used when none is configured, relative to the working
/// directory.
pub const DEFAULT_NOTEBOOK: &str = "student_submission.ipynb";

/// Jupyter kernel the executor asks `nbconvert` to start.
pub const DEFAULT_KERNEL: &str = "python3";

/// Upper bound on notebook execution and on the namespace probe.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Only major version of the notebook interchange format that is accepted.
pub const SUPPORTED_NBFORMAT: u32 = 4;

/// Points awarded for a passing check unless a check says otherwise.
pub const DEFAULT_CHECK_POINTS: f64 = 1.0;

/// Number of trailing stderr lines kept when execution fails.
pub const ERROR_TAIL_LINES: usize = 40;

/// Marker that prefixes the JSON line the probe script prints.
pub const PROBE_MARKER: &str = "__NBGRADE_PROBE__";

/// Python script that re-executes code cells and describes the namespace.
/// * reads a `ProbeRequest`-shaped JSON document on stdin
/// * prints `PROBE_MARKER` followed by a `Namespace`-shaped JSON document
pub const PROBE_SCRIPT: &str = include_str!("python/probe.py");

/// Modules the assignment requires the notebook to import.
pub const REQUIRED_LIBRARIES: [&str; 7] = [
    "geopandas",
    "pandas",
    "numpy",
    "matplotlib",
    "seaborn",
    "folium",
    "contextily",
];
