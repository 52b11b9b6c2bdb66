#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Display;

use bon::Builder;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
/// A struct representing a grade
pub struct Grade {
    /// The actual grade received
    pub grade:  f64,
    /// The maximum grade possible
    pub out_of: f64,
}

impl Grade {
    /// Creates a new grade -
    /// * `grade` - The actual grade received
    /// * `out_of` - The maximum grade possible
    pub fn new(grade: f64, out_of: f64) -> Self {
        Self { grade, out_of }
    }

    /// Full marks.
    pub fn full(out_of: f64) -> Self {
        Self::new(out_of, out_of)
    }

    /// No marks.
    pub fn zero(out_of: f64) -> Self {
        Self::new(0.0, out_of)
    }
}

impl Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}/{:.2}", self.grade, self.out_of)
    }
}

/// Whether a check passed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Every assertion held.
    Passed,
    /// Some assertion failed.
    #[default]
    Failed,
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Passed => write!(f, "PASS"),
            Status::Failed => write!(f, "FAIL"),
        }
    }
}

#[derive(Tabled, Clone, Debug, Default, Builder, Serialize, Deserialize)]
#[builder(on(String, into))]
/// A struct to store the outcome of one check and display it
pub struct GradeResult {
    #[tabled(rename = "Requirement")]
    /// * `requirement`: name of the check
    pub(crate) requirement: String,
    #[tabled(rename = "Status")]
    /// * `status`: whether the check passed
    #[builder(default)]
    pub(crate) status:      Status,
    #[tabled(rename = "Grade")]
    /// * `grade`: grade received for the check
    #[builder(default)]
    pub(crate) grade:       Grade,
    #[tabled(rename = "Reason")]
    /// * `reason`: why the check failed, empty when it passed
    #[builder(default)]
    pub(crate) reason:      String,
}

impl GradeResult {
    /// Name of the check.
    pub fn requirement(&self) -> &str {
        &self.requirement
    }

    /// Whether the check passed.
    pub fn passed(&self) -> bool {
        self.status == Status::Passed
    }

    /// Pass/fail status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns the underlying grade struct.
    pub fn grade_struct(&self) -> &Grade {
        &self.grade
    }

    /// Returns the numeric grade value.
    pub fn grade_value(&self) -> f64 {
        self.grade.grade
    }

    /// Returns the numeric out-of value.
    pub fn out_of_value(&self) -> f64 {
        self.grade.out_of
    }

    /// Failure explanation, empty when the check passed.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}
