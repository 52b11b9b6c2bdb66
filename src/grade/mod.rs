#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The check suite and everything it reads.

/// The reusable kinds of check.
pub mod checks;
/// Why a check failed.
pub mod failure;
/// Result tables and Gradescope output.
pub mod report;
/// Grade and per-check result types.
pub mod results;
/// The ordered suite for the GIS assignment.
pub mod suite;

pub use checks::{
    ExecutionCheck, Expectation, FunctionContractCheck, GeoTableCheck, ImportCheck,
    ReprojectionCheck, scan_imports,
};
pub use failure::CheckFailure;
pub use report::{GradescopeStatus, GradescopeSubmission, GradescopeTestCase, Report};
pub use results::{Grade, GradeResult, Status};
pub use suite::Suite;

use crate::{
    notebook::{Notebook, Submission},
    python::{ExecutionResult, Namespace, ProbeRequest},
};

/// Everything a check may look at, built once before any check runs.
#[derive(Debug)]
pub struct GradingContext {
    /// The loaded or degraded submission.
    submission: Submission,
    /// Outcome of the end-to-end execution.
    execution:  ExecutionResult,
    /// Names the submission defines.
    namespace:  Namespace,
}

impl GradingContext {
    /// Bundles the results of loading, executing and inspecting a submission.
    pub fn new(submission: Submission, execution: ExecutionResult, namespace: Namespace) -> Self {
        Self {
            submission,
            execution,
            namespace,
        }
    }

    /// The submission.
    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    /// The parsed notebook, when it loaded.
    pub fn notebook(&self) -> Option<&Notebook> {
        self.submission.notebook()
    }

    /// The execution outcome.
    pub fn execution(&self) -> &ExecutionResult {
        &self.execution
    }

    /// The extracted namespace.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }
}

/// One independent validation in the suite.
pub trait Check: Send + Sync {
    /// Requirement name shown in results.
    fn requirement(&self) -> &str;

    /// Points the check is worth.
    fn out_of(&self) -> f64;

    /// Names and calls the probe must describe for this check.
    fn probe(&self) -> ProbeRequest {
        ProbeRequest::default()
    }

    /// Runs the validation.
    fn evaluate(&self, ctx: &GradingContext) -> Result<(), CheckFailure>;

    /// Runs the validation and scores it.
    fn grade(&self, ctx: &GradingContext) -> GradeResult {
        let (status, grade, reason) = match self.evaluate(ctx) {
            Ok(()) => (Status::Passed, Grade::full(self.out_of()), String::new()),
            Err(failure) => {
                tracing::debug!("{} failed: {failure}", self.requirement());
                (Status::Failed, Grade::zero(self.out_of()), failure.to_string())
            }
        };

        GradeResult::builder()
            .requirement(self.requirement())
            .status(status)
            .grade(grade)
            .reason(reason)
            .build()
    }
}
