#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Typed descriptions of the Python state a submission defines.
//!
//! Python objects never leave the interpreter. The probe script describes
//! each value it is asked about as one of the [`Value`] variants, and builds
//! any synthetic inputs from the [`Fixture`] descriptions the checks supply.
//! CRS equality is decided in Python with `pyproj`'s `==`, which accepts
//! anything `CRS.from_user_input` does (EPSG codes, strings, PROJ JSON), so
//! the checks only ever see the verdict.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::constants::PROBE_MARKER;

/// A coordinate reference system as `pyproj` reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrsInfo {
    /// User-facing identifier, eg. `EPSG:4326`.
    pub srs:          String,
    /// Whether coordinates are linear (eg. metres).
    pub is_projected: bool,
}

impl Display for CrsInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.srs)
    }
}

/// Description of a single Python value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Value {
    /// `None`.
    None,
    /// A boolean.
    Bool {
        /// The value.
        value: bool,
    },
    /// An integer of any width.
    Int {
        /// The value.
        value: serde_json::Number,
    },
    /// A finite float.
    Float {
        /// The value.
        value: f64,
    },
    /// A string.
    Str {
        /// The value.
        value: String,
    },
    /// A `pyproj.CRS`.
    Crs {
        /// The CRS.
        crs: CrsInfo,
    },
    /// A `geopandas.GeoDataFrame`.
    GeoDataFrame {
        /// Number of rows.
        rows:    usize,
        /// Column labels.
        columns: Vec<String>,
        /// Table CRS, if set.
        #[serde(default)]
        crs:     Option<CrsInfo>,
    },
    /// A plain `pandas.DataFrame`.
    DataFrame {
        /// Number of rows.
        rows:    usize,
        /// Column labels.
        columns: Vec<String>,
    },
    /// A `dict`, keys stringified.
    Dict {
        /// Entries in iteration order of the key strings.
        entries: BTreeMap<String, Value>,
    },
    /// A list, tuple, set or array, truncated.
    List {
        /// Leading items.
        items: Vec<Value>,
    },
    /// A function or other callable.
    Callable {
        /// `__name__` of the callable.
        name:       String,
        /// Parameter names from its signature.
        #[serde(default)]
        parameters: Vec<String>,
    },
    /// Anything else.
    Other {
        /// Python type name.
        type_name: String,
        /// Truncated `repr`.
        #[serde(default)]
        repr:      String,
    },
}

impl Value {
    /// Short type label used in failure messages.
    pub fn type_label(&self) -> &str {
        match self {
            Value::None => "None",
            Value::Bool { .. } => "bool",
            Value::Int { .. } => "int",
            Value::Float { .. } => "float",
            Value::Str { .. } => "str",
            Value::Crs { .. } => "CRS",
            Value::GeoDataFrame { .. } => "GeoDataFrame",
            Value::DataFrame { .. } => "DataFrame",
            Value::Dict { .. } => "dict",
            Value::List { .. } => "list",
            Value::Callable { .. } => "function",
            Value::Other { type_name, .. } => type_name,
        }
    }

    /// Numeric value of ints and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int { value } => value.as_f64(),
            Value::Float { value } => Some(*value),
            _ => None,
        }
    }

    /// The CRS a GeoDataFrame carries.
    pub fn table_crs(&self) -> Option<&CrsInfo> {
        match self {
            Value::GeoDataFrame { crs, .. } => crs.as_ref(),
            _ => None,
        }
    }

    /// Entries of a dict.
    pub fn entries(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Dict { entries } => Some(entries),
            _ => None,
        }
    }

    /// Whether the value can be called.
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Callable { .. })
    }

    /// Compares against a JSON literal: numbers numerically, strings and
    /// booleans exactly.
    pub fn matches_literal(&self, literal: &serde_json::Value) -> bool {
        match (self, literal) {
            (Value::None, serde_json::Value::Null) => true,
            (Value::Bool { value }, serde_json::Value::Bool(expected)) => value == expected,
            (Value::Str { value }, serde_json::Value::String(expected)) => value == expected,
            (_, serde_json::Value::Number(expected)) => {
                matches!((self.as_f64(), expected.as_f64()), (Some(a), Some(b)) if a == b)
            }
            _ => false,
        }
    }
}

/// Geometry for a synthetic table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GeometryFixture {
    /// Points from parallel x and y coordinates.
    Points {
        /// X coordinates.
        xs: Vec<f64>,
        /// Y coordinates.
        ys: Vec<f64>,
    },
    /// Axis-aligned rectangles as `[minx, miny, maxx, maxy]`.
    Boxes {
        /// Rectangles.
        boxes: Vec<[f64; 4]>,
    },
}

/// A synthetic argument the probe constructs before invoking a function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Fixture {
    /// A GeoDataFrame built from literal columns and geometry.
    Table {
        /// Attribute columns.
        columns:  BTreeMap<String, Vec<serde_json::Value>>,
        /// Geometry column.
        geometry: GeometryFixture,
        /// CRS passed to the constructor, eg. `EPSG:4326`.
        crs:      String,
    },
    /// An earlier argument reprojected with `to_crs(epsg=...)`.
    Reprojected {
        /// Index of the earlier argument.
        source: usize,
        /// Target EPSG code.
        epsg:   u32,
    },
}

impl Fixture {
    /// A table with one integer attribute column and point geometry.
    pub fn points(column: &str, values: &[i64], xs: &[f64], ys: &[f64], crs: &str) -> Self {
        Fixture::Table {
            columns:  BTreeMap::from([(
                column.to_string(),
                values.iter().map(|v| serde_json::Value::from(*v)).collect(),
            )]),
            geometry: GeometryFixture::Points {
                xs: xs.to_vec(),
                ys: ys.to_vec(),
            },
            crs:      crs.to_string(),
        }
    }

    /// A table with one integer attribute column and box geometry.
    pub fn boxes(column: &str, values: &[i64], boxes: &[[f64; 4]], crs: &str) -> Self {
        Fixture::Table {
            columns:  BTreeMap::from([(
                column.to_string(),
                values.iter().map(|v| serde_json::Value::from(*v)).collect(),
            )]),
            geometry: GeometryFixture::Boxes {
                boxes: boxes.to_vec(),
            },
            crs:      crs.to_string(),
        }
    }

    /// Argument `source` reprojected to `epsg`.
    pub fn reprojected(source: usize, epsg: u32) -> Self {
        Fixture::Reprojected { source, epsg }
    }
}

/// Asks whether `result[key]` is the same CRS as argument `arg`'s `.crs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrsCheck {
    /// Key in the returned mapping.
    pub key: String,
    /// Index of the argument.
    pub arg: usize,
}

/// Verdict on a [`CrsCheck`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrsMatch {
    /// Key in the returned mapping.
    pub key:   String,
    /// Index of the argument.
    pub arg:   usize,
    /// Whether the two compared equal.
    pub equal: bool,
}

/// A function call the probe performs on behalf of a check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invocation {
    /// Key the outcome is stored under.
    pub id:         String,
    /// Name of the submission's function.
    pub function:   String,
    /// Positional arguments.
    pub args:       Vec<Fixture>,
    /// CRS comparisons to make against the result.
    #[serde(default)]
    pub crs_checks: Vec<CrsCheck>,
}

impl Invocation {
    /// A call of `function` with `args`, filed under `id`.
    pub fn new(id: impl Into<String>, function: impl Into<String>, args: Vec<Fixture>) -> Self {
        Self {
            id: id.into(),
            function: function.into(),
            args,
            crs_checks: Vec::new(),
        }
    }

    /// Also compares `result[key]` with argument `arg`'s CRS.
    pub fn compare_crs(mut self, key: impl Into<String>, arg: usize) -> Self {
        self.crs_checks.push(CrsCheck {
            key: key.into(),
            arg,
        });
        self
    }
}

/// Asks whether two names' `.crs` attributes are equal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrsComparison {
    /// First name.
    pub left:  String,
    /// Second name.
    pub right: String,
}

/// Verdict on a [`CrsComparison`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrsEquality {
    /// First name.
    pub left:  String,
    /// Second name.
    pub right: String,
    /// `None` when the comparison itself raised.
    pub equal: Option<bool>,
}

/// Everything the checks want the probe to look at.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeRequest {
    /// Code cell sources, in order.
    #[serde(default)]
    pub cells:           Vec<String>,
    /// Names to describe.
    #[serde(default)]
    pub inspect:         BTreeSet<String>,
    /// Calls to perform.
    #[serde(default)]
    pub invocations:     Vec<Invocation>,
    /// Pairs of names whose CRS to compare.
    #[serde(default)]
    pub crs_comparisons: Vec<CrsComparison>,
}

impl ProbeRequest {
    /// Asks for `name` to be described.
    pub fn inspect(mut self, name: impl Into<String>) -> Self {
        self.inspect.insert(name.into());
        self
    }

    /// Asks for a function call.
    pub fn invoke(mut self, invocation: Invocation) -> Self {
        self.invocations.push(invocation);
        self
    }

    /// Asks for the CRS of `left` and `right` to be compared.
    pub fn compare_crs(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.crs_comparisons.push(CrsComparison {
            left:  left.into(),
            right: right.into(),
        });
        self
    }

    /// Folds another request into this one.
    pub fn merge(&mut self, other: ProbeRequest) {
        self.cells.extend(other.cells);
        self.inspect.extend(other.inspect);
        for invocation in other.invocations {
            if !self.invocations.iter().any(|i| i.id == invocation.id) {
                self.invocations.push(invocation);
            }
        }
        for comparison in other.crs_comparisons {
            if !self.crs_comparisons.contains(&comparison) {
                self.crs_comparisons.push(comparison);
            }
        }
    }

    /// Returns this request with the cells to execute filled in.
    pub fn with_cells(mut self, cells: Vec<String>) -> Self {
        self.cells = cells;
        self
    }
}

/// What happened when the probe called a function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationOutcome {
    /// The function returned.
    Returned {
        /// Description of the return value.
        result:      Value,
        /// Verdicts on the invocation's CRS checks.
        #[serde(default)]
        crs_matches: Vec<CrsMatch>,
    },
    /// The function raised.
    Raised {
        /// Traceback text.
        error: String,
    },
    /// The synthetic arguments could not be built.
    FixtureFailed {
        /// Traceback text.
        error: String,
    },
}

/// A code cell that raised while being re-executed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellError {
    /// Index among code cells.
    pub cell:  usize,
    /// Traceback text.
    pub error: String,
}

/// Names defined by the submission, as described by the probe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Namespace {
    /// Described values, keyed by name. Undefined names are absent.
    #[serde(default)]
    values:          BTreeMap<String, Value>,
    /// Outcomes of requested calls, keyed by invocation id.
    #[serde(default)]
    invocations:     BTreeMap<String, InvocationOutcome>,
    /// Verdicts on requested CRS comparisons.
    #[serde(default)]
    crs_comparisons: Vec<CrsEquality>,
    /// Cells that raised during re-execution.
    #[serde(default)]
    cell_errors:     Vec<CellError>,
    /// Text the cells printed.
    #[serde(default)]
    output:          String,
}

impl Namespace {
    /// A namespace with nothing defined.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses the probe's stdout, using the last marked line.
    pub fn from_probe_output(stdout: &str) -> Result<Self> {
        let Some(payload) = stdout
            .lines()
            .rev()
            .find_map(|line| line.strip_prefix(PROBE_MARKER))
        else {
            bail!("probe did not report a namespace");
        };

        serde_json::from_str(payload).context("could not parse the probe's namespace report")
    }

    /// Looks up a name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Whether a name is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Looks up the outcome of a requested call.
    pub fn invocation(&self, id: &str) -> Option<&InvocationOutcome> {
        self.invocations.get(id)
    }

    /// Whether the CRS of `left` equals that of `right`. `None` when the
    /// comparison was not made or raised.
    pub fn crs_equal(&self, left: &str, right: &str) -> Option<bool> {
        self.crs_comparisons
            .iter()
            .find(|c| c.left == left && c.right == right)
            .and_then(|c| c.equal)
    }

    /// Cells that raised during re-execution.
    pub fn cell_errors(&self) -> &[CellError] {
        &self.cell_errors
    }

    /// Text the cells printed.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Number of described names.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is defined.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
