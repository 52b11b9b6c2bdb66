#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use thiserror::Error;

/// Why a check failed. The message is what the student sees.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckFailure {
    /// The notebook did not run cleanly.
    #[error("Notebook execution failed with error: {error}")]
    ExecutionFailed {
        /// Captured error text.
        error: String,
    },

    /// There is no notebook source to look at.
    #[error("No notebook to inspect: {reason}")]
    NoSubmission {
        /// Why the notebook is unavailable.
        reason: String,
    },

    /// Some required modules are never imported.
    #[error("Required libraries not imported: {}", .modules.join(", "))]
    MissingImports {
        /// Missing module names, in requirement order.
        modules: Vec<String>,
    },

    /// A required top-level name is not defined.
    #[error("{label} '{name}' not found")]
    MissingName {
        /// What the name should hold, eg. "Function".
        label: String,
        /// The name.
        name:  String,
    },

    /// A name holds the wrong kind of value.
    #[error("'{name}' should be a {expected}, found {found}")]
    WrongType {
        /// The name.
        name:     String,
        /// Expected type.
        expected: String,
        /// Type found.
        found:    String,
    },

    /// A table has no rows.
    #[error("'{name}' should not be empty")]
    Empty {
        /// The name.
        name: String,
    },

    /// A table lacks a column.
    #[error("'{name}' should have a '{column}' column")]
    MissingColumn {
        /// The name.
        name:   String,
        /// Missing column.
        column: String,
    },

    /// The probe never called the function.
    #[error("'{function}' could not be called on the test input")]
    NotInvoked {
        /// The function.
        function: String,
    },

    /// The synthetic input could not be built.
    #[error("Could not build the test input for '{function}':\n{error}")]
    FixtureFailed {
        /// The function.
        function: String,
        /// Traceback text.
        error:    String,
    },

    /// The function raised on the synthetic input.
    #[error("Calling '{function}' on the test input raised an error:\n{error}")]
    Raised {
        /// The function.
        function: String,
        /// Traceback text.
        error:    String,
    },

    /// The function returned the wrong kind of value.
    #[error("{function} should return a {expected}, found {found}")]
    WrongReturnType {
        /// The function.
        function: String,
        /// Expected type.
        expected: String,
        /// Type found.
        found:    String,
    },

    /// The returned mapping lacks a key.
    #[error("{function} result should have '{key}' key")]
    MissingKey {
        /// The function.
        function: String,
        /// Missing key.
        key:      String,
    },

    /// A returned value is not the expected one.
    #[error("{message} (got {actual})")]
    Unexpected {
        /// What should have held.
        message: String,
        /// What was found instead.
        actual:  String,
    },

    /// Reprojection left the CRS as it was.
    #[error("The CRS should be changed after reprojection ('{projected}' still uses {crs})")]
    CrsUnchanged {
        /// The reprojected name.
        projected: String,
        /// The shared CRS.
        crs:       String,
    },

    /// The two tables' CRS could not be compared.
    #[error("Could not compare the CRS of '{projected}' with that of '{original}'")]
    CrsIncomparable {
        /// The reprojected name.
        projected: String,
        /// The name it was reprojected from.
        original:  String,
    },

    /// The reprojected CRS uses angular units.
    #[error("The reprojected data should use a projected CRS, '{name}' uses {crs}")]
    NotProjected {
        /// The reprojected name.
        name: String,
        /// Its CRS, or "no CRS".
        crs:  String,
    },
}
