#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{fs, path::Path};

use anyhow::{Context, Result};
use bon::Builder;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tabled::{
    Table,
    settings::{Alignment, Modify, Panel, Style, Width, object::Rows},
};

use super::results::GradeResult;

/// Represents output format settings for Gradescope submissions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GradescopeOutputFormat {
    /// Plain text format.
    Text,
    /// Markdown format.
    Md,
}

/// Represents visibility settings for Gradescope submissions and test cases.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GradescopeVisibility {
    /// Hidden from students.
    Hidden,
    /// Always visible to students.
    Visible,
}

/// Represents the status of a test case in Gradescope submissions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GradescopeStatus {
    /// Indicates the test case passed successfully.
    Passed,
    /// Indicates the test case failed.
    Failed,
}

/// Represents the overall submission data.
#[derive(Serialize, Deserialize, Debug, Builder)]
pub struct GradescopeSubmission {
    /// Optional overall score. Overrides total of test cases if specified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// Optional text relevant to the entire submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Optional default output format for test case outputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_output_format: Option<GradescopeOutputFormat>,

    /// Optional visibility setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<GradescopeVisibility>,

    /// Optional stdout visibility setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout_visibility: Option<GradescopeVisibility>,

    /// Test cases, one per check.
    #[builder(default)]
    pub tests: Vec<GradescopeTestCase>,
}

/// Represents an individual test case.
#[derive(Serialize, Deserialize, Debug, Builder)]
#[builder(on(String, into))]
pub struct GradescopeTestCase {
    /// Score for the test case.
    pub score: f64,

    /// Maximum score for the test case.
    pub max_score: f64,

    /// Status of the test case.
    pub status: GradescopeStatus,

    /// Name of the test case.
    pub name: String,

    /// Optional detailed output for the test case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Optional formatting for the test case output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<GradescopeOutputFormat>,
}

/// Results of a whole grading run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    /// One result per check, in suite order.
    results: Vec<GradeResult>,
}

impl Report {
    /// Wraps per-check results.
    pub fn new(results: Vec<GradeResult>) -> Self {
        Self { results }
    }

    /// Per-check results.
    pub fn results(&self) -> &[GradeResult] {
        &self.results
    }

    /// Looks up a result by requirement name.
    pub fn result(&self, requirement: &str) -> Option<&GradeResult> {
        self.results.iter().find(|r| r.requirement() == requirement)
    }

    /// Whether every check passed.
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(GradeResult::passed)
    }

    /// Number of checks that passed.
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    /// Summed `(grade, out_of)`.
    pub fn total(&self) -> (f64, f64) {
        self.results
            .iter()
            .fold((0f64, 0f64), |acc, r| (acc.0 + r.grade_value(), acc.1 + r.out_of_value()))
    }

    /// Renders the results table.
    pub fn table(&self) -> String {
        let (grade, out_of) = self.total();
        Table::new(&self.results)
            .with(Panel::header("Grading Overview"))
            .with(Panel::footer(format!("Total: {grade:.2}/{out_of:.2}")))
            .with(Modify::new(Rows::new(1..)).with(Width::wrap(48).keep_words(true)))
            .with(
                Modify::new(Rows::first())
                    .with(Alignment::center())
                    .with(Alignment::center_vertical()),
            )
            .with(
                Modify::new(Rows::last())
                    .with(Alignment::center())
                    .with(Alignment::center_vertical()),
            )
            .with(Style::modern())
            .to_string()
    }

    /// One-line pass/fail summary.
    pub fn summary(&self) -> String {
        let line = format!("{}/{} checks passed", self.passed_count(), self.results.len());
        if self.all_passed() {
            line.green().bold().to_string()
        } else {
            line.red().bold().to_string()
        }
    }

    /// Builds the Gradescope `results.json` payload.
    pub fn gradescope(&self) -> GradescopeSubmission {
        let tests = self
            .results
            .iter()
            .map(|result| {
                GradescopeTestCase::builder()
                    .name(result.requirement())
                    .max_score(result.out_of_value())
                    .score(result.grade_value())
                    .status(if result.passed() {
                        GradescopeStatus::Passed
                    } else {
                        GradescopeStatus::Failed
                    })
                    .maybe_output((!result.reason().is_empty()).then(|| result.reason().to_string()))
                    .output_format(GradescopeOutputFormat::Text)
                    .build()
            })
            .collect();

        GradescopeSubmission::builder()
            .tests(tests)
            .test_output_format(GradescopeOutputFormat::Text)
            .stdout_visibility(GradescopeVisibility::Hidden)
            .visibility(GradescopeVisibility::Visible)
            .build()
    }

    /// Writes the Gradescope payload to `path`.
    pub fn write_gradescope(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.gradescope())
            .context("Could not serialize Gradescope results")?;
        fs::write(path, json).with_context(|| format!("Could not write {}", path.display()))
    }
}
