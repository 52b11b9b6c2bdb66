#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Everything that talks to the Python interpreter.

/// Notebook execution and namespace extraction.
pub mod execute;
/// Typed descriptions of Python values.
pub mod namespace;
/// Python toolchain discovery.
pub mod util;

pub use execute::{ExecutionResult, Executor};
pub use namespace::{
    CellError, CrsCheck, CrsComparison, CrsEquality, CrsInfo, CrsMatch, Fixture, GeometryFixture,
    Invocation, InvocationOutcome, Namespace, ProbeRequest, Value,
};
pub use util::Interpreter;
