#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{collections::BTreeSet, sync::LazyLock};

use bon::Builder;
use regex::Regex;

use super::{Check, CheckFailure, GradingContext};
use crate::{
    constants::DEFAULT_CHECK_POINTS,
    python::{CrsInfo, CrsMatch, Fixture, Invocation, InvocationOutcome, ProbeRequest, Value},
};

/// Captures the top-level module of `import x` and `from x import ...`.
static IMPORT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*import\s+(\w+)|^\s*from\s+(\w+)").expect("import pattern is valid")
});

/// Returns the top-level module names a cell's source imports.
///
/// Only the first name after `import` is captured, so `import os, sys`
/// yields `os`; aliases and submodules do not matter.
pub fn scan_imports(source: &str) -> BTreeSet<String> {
    IMPORT_PATTERN
        .captures_iter(source)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Requires the notebook to have executed without error.
#[derive(Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct ExecutionCheck {
    /// Requirement name.
    requirement: String,
    /// Points.
    #[builder(default = DEFAULT_CHECK_POINTS)]
    out_of:      f64,
}

impl Check for ExecutionCheck {
    fn requirement(&self) -> &str {
        &self.requirement
    }

    fn out_of(&self) -> f64 {
        self.out_of
    }

    fn evaluate(&self, ctx: &GradingContext) -> Result<(), CheckFailure> {
        let execution = ctx.execution();
        if execution.successful() {
            Ok(())
        } else {
            Err(CheckFailure::ExecutionFailed {
                error: execution.error().unwrap_or("Unknown error").to_string(),
            })
        }
    }
}

/// Requires a set of modules to be imported somewhere in the code cells.
#[derive(Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct ImportCheck {
    /// Requirement name.
    requirement: String,
    /// Points.
    #[builder(default = DEFAULT_CHECK_POINTS)]
    out_of:      f64,
    /// Module names that must appear.
    #[builder(with = |iter: impl IntoIterator<Item = impl Into<String>>| {
        iter.into_iter().map(Into::into).collect::<Vec<String>>()
    })]
    required:    Vec<String>,
}

impl Check for ImportCheck {
    fn requirement(&self) -> &str {
        &self.requirement
    }

    fn out_of(&self) -> f64 {
        self.out_of
    }

    fn evaluate(&self, ctx: &GradingContext) -> Result<(), CheckFailure> {
        let notebook = ctx.notebook().ok_or_else(|| CheckFailure::NoSubmission {
            reason: ctx
                .submission()
                .load_error()
                .map(ToString::to_string)
                .unwrap_or_default(),
        })?;

        let found: BTreeSet<String> = notebook
            .code_cells()
            .flat_map(|cell| scan_imports(&cell.source_text()))
            .collect();
        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|m| !found.contains(*m))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CheckFailure::MissingImports { modules: missing })
        }
    }
}

/// Looks up `name`, failing with `label` in the message if absent.
fn lookup<'a>(ctx: &'a GradingContext, name: &str, label: &str) -> Result<&'a Value, CheckFailure> {
    ctx.namespace()
        .get(name)
        .ok_or_else(|| CheckFailure::MissingName {
            label: label.to_string(),
            name:  name.to_string(),
        })
}

/// Requires `value` to be a GeoDataFrame.
fn expect_geotable(name: &str, value: &Value) -> Result<(), CheckFailure> {
    match value {
        Value::GeoDataFrame { .. } => Ok(()),
        other => Err(CheckFailure::WrongType {
            name:     name.to_string(),
            expected: "GeoDataFrame".to_string(),
            found:    other.type_label().to_string(),
        }),
    }
}

/// Requires a named variable to hold a non-empty GeoDataFrame with a
/// geometry column.
#[derive(Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct GeoTableCheck {
    /// Requirement name.
    requirement:     String,
    /// Points.
    #[builder(default = DEFAULT_CHECK_POINTS)]
    out_of:          f64,
    /// Variable name.
    name:            String,
    /// How the variable is described when missing.
    #[builder(default = "Variable".to_string())]
    label:           String,
    /// Column that must exist.
    #[builder(default = "geometry".to_string())]
    geometry_column: String,
}

impl Check for GeoTableCheck {
    fn requirement(&self) -> &str {
        &self.requirement
    }

    fn out_of(&self) -> f64 {
        self.out_of
    }

    fn probe(&self) -> ProbeRequest {
        ProbeRequest::default().inspect(&self.name)
    }

    fn evaluate(&self, ctx: &GradingContext) -> Result<(), CheckFailure> {
        let value = lookup(ctx, &self.name, &self.label)?;
        let Value::GeoDataFrame { rows, columns, .. } = value else {
            return Err(CheckFailure::WrongType {
                name:     self.name.clone(),
                expected: "GeoDataFrame".to_string(),
                found:    value.type_label().to_string(),
            });
        };
        if *rows == 0 {
            return Err(CheckFailure::Empty {
                name: self.name.clone(),
            });
        }
        if !columns.iter().any(|c| c == &self.geometry_column) {
            return Err(CheckFailure::MissingColumn {
                name:   self.name.clone(),
                column: self.geometry_column.clone(),
            });
        }
        Ok(())
    }
}

/// A property the mapping returned by a function must have.
#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    /// `result[key]` equals a literal.
    Equals {
        /// Key in the returned mapping.
        key:     String,
        /// Expected value.
        value:   serde_json::Value,
        /// Failure message.
        message: String,
    },
    /// `result[key] == args[arg].crs` under `pyproj`, so an EPSG code, a
    /// CRS string or a `CRS` object all qualify.
    SameCrsAsArg {
        /// Key in the returned mapping.
        key:     String,
        /// Index of the argument.
        arg:     usize,
        /// Failure message.
        message: String,
    },
}

impl Expectation {
    /// `result[key] == value`.
    pub fn equals(
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
        message: impl Into<String>,
    ) -> Self {
        Expectation::Equals {
            key:     key.into(),
            value:   value.into(),
            message: message.into(),
        }
    }

    /// `result[key]` is argument `arg`'s CRS.
    pub fn same_crs_as_arg(key: impl Into<String>, arg: usize, message: impl Into<String>) -> Self {
        Expectation::SameCrsAsArg {
            key:     key.into(),
            arg,
            message: message.into(),
        }
    }

    /// Checks the expectation against a returned mapping and the CRS
    /// verdicts made on it. Missing keys are reported by the caller.
    fn verify(
        &self,
        entries: &std::collections::BTreeMap<String, Value>,
        crs_matches: &[CrsMatch],
    ) -> Result<(), CheckFailure> {
        match self {
            Expectation::Equals {
                key,
                value,
                message,
            } => match entries.get(key) {
                Some(actual) if actual.matches_literal(value) => Ok(()),
                actual => Err(CheckFailure::Unexpected {
                    message: message.clone(),
                    actual:  describe_actual(actual),
                }),
            },
            Expectation::SameCrsAsArg { key, arg, message } => {
                let same = crs_matches
                    .iter()
                    .any(|m| &m.key == key && m.arg == *arg && m.equal);
                if same {
                    Ok(())
                } else {
                    Err(CheckFailure::Unexpected {
                        message: message.clone(),
                        actual:  describe_actual(entries.get(key)),
                    })
                }
            }
        }
    }
}

/// Short rendering of a value for failure messages.
fn describe_actual(value: Option<&Value>) -> String {
    match value {
        None => "nothing".to_string(),
        Some(Value::Int { value }) => value.to_string(),
        Some(Value::Float { value }) => value.to_string(),
        Some(Value::Bool { value }) => value.to_string(),
        Some(Value::Str { value, .. }) => format!("'{value}'"),
        Some(Value::Crs { crs }) => crs.to_string(),
        Some(Value::Other { repr, .. }) => repr.clone(),
        Some(other) => format!("a {}", other.type_label()),
    }
}

/// Calls a submission function on synthetic input and checks the mapping it
/// returns.
#[derive(Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct FunctionContractCheck {
    /// Requirement name.
    requirement:   String,
    /// Points.
    #[builder(default = DEFAULT_CHECK_POINTS)]
    out_of:        f64,
    /// Function name.
    function:      String,
    /// Positional arguments to build.
    #[builder(default)]
    args:          Vec<Fixture>,
    /// Keys the returned mapping must contain.
    #[builder(default)]
    required_keys: Vec<String>,
    /// Further properties of the returned mapping.
    #[builder(default)]
    expectations:  Vec<Expectation>,
}

impl FunctionContractCheck {
    /// Key the probe files this check's call under.
    fn invocation_id(&self) -> String {
        format!("{}::{}", self.requirement, self.function)
    }
}

impl Check for FunctionContractCheck {
    fn requirement(&self) -> &str {
        &self.requirement
    }

    fn out_of(&self) -> f64 {
        self.out_of
    }

    fn probe(&self) -> ProbeRequest {
        let invocation = self.expectations.iter().fold(
            Invocation::new(self.invocation_id(), &self.function, self.args.clone()),
            |invocation, expectation| match expectation {
                Expectation::SameCrsAsArg { key, arg, .. } => invocation.compare_crs(key, *arg),
                Expectation::Equals { .. } => invocation,
            },
        );
        ProbeRequest::default()
            .inspect(&self.function)
            .invoke(invocation)
    }

    fn evaluate(&self, ctx: &GradingContext) -> Result<(), CheckFailure> {
        let value = lookup(ctx, &self.function, "Function")?;
        if !value.is_callable() {
            return Err(CheckFailure::WrongType {
                name:     self.function.clone(),
                expected: "function".to_string(),
                found:    value.type_label().to_string(),
            });
        }

        let (result, crs_matches) = match ctx.namespace().invocation(&self.invocation_id()) {
            None => {
                return Err(CheckFailure::NotInvoked {
                    function: self.function.clone(),
                });
            }
            Some(InvocationOutcome::FixtureFailed { error }) => {
                return Err(CheckFailure::FixtureFailed {
                    function: self.function.clone(),
                    error:    error.clone(),
                });
            }
            Some(InvocationOutcome::Raised { error }) => {
                return Err(CheckFailure::Raised {
                    function: self.function.clone(),
                    error:    error.clone(),
                });
            }
            Some(InvocationOutcome::Returned {
                result,
                crs_matches,
            }) => (result, crs_matches),
        };

        let entries = result.entries().ok_or_else(|| CheckFailure::WrongReturnType {
            function: self.function.clone(),
            expected: "dictionary".to_string(),
            found:    result.type_label().to_string(),
        })?;

        if let Some(key) = self.required_keys.iter().find(|k| !entries.contains_key(*k)) {
            return Err(CheckFailure::MissingKey {
                function: self.function.clone(),
                key:      key.clone(),
            });
        }

        self.expectations
            .iter()
            .try_for_each(|expectation| expectation.verify(entries, crs_matches))
    }
}

/// Requires a reprojected table whose CRS is projected and differs from the
/// source table's.
#[derive(Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct ReprojectionCheck {
    /// Requirement name.
    requirement: String,
    /// Points.
    #[builder(default = DEFAULT_CHECK_POINTS)]
    out_of:      f64,
    /// The original table's name.
    source:      String,
    /// The reprojected table's name.
    projected:   String,
}

impl Check for ReprojectionCheck {
    fn requirement(&self) -> &str {
        &self.requirement
    }

    fn out_of(&self) -> f64 {
        self.out_of
    }

    fn probe(&self) -> ProbeRequest {
        ProbeRequest::default()
            .inspect(&self.source)
            .inspect(&self.projected)
            .compare_crs(&self.projected, &self.source)
    }

    fn evaluate(&self, ctx: &GradingContext) -> Result<(), CheckFailure> {
        let projected = lookup(ctx, &self.projected, "Reprojected variable")?;
        let source = lookup(ctx, &self.source, "Variable")?;
        expect_geotable(&self.projected, projected)?;
        expect_geotable(&self.source, source)?;

        let projected_crs = projected.table_crs();
        match ctx.namespace().crs_equal(&self.projected, &self.source) {
            Some(false) => {}
            Some(true) => {
                return Err(CheckFailure::CrsUnchanged {
                    projected: self.projected.clone(),
                    crs:       crs_label(projected_crs),
                });
            }
            None => {
                return Err(CheckFailure::CrsIncomparable {
                    projected: self.projected.clone(),
                    original:  self.source.clone(),
                });
            }
        }

        match projected_crs {
            Some(crs) if crs.is_projected => Ok(()),
            other => Err(CheckFailure::NotProjected {
                name: self.projected.clone(),
                crs:  crs_label(other),
            }),
        }
    }
}

/// Renders an optional CRS for messages.
fn crs_label(crs: Option<&CrsInfo>) -> String {
    crs.map(ToString::to_string)
        .unwrap_or_else(|| "no CRS".to_string())
}
