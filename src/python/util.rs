#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Python toolchain discovery.
//!
//! `uv` is preferred when it is on `PATH`: `uv run -- python ...` picks up
//! the environment the course image provisions. Otherwise the first
//! `python3`/`python` on `PATH` is used. A pinned interpreter overrides both.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use which::which;

/// Finds and returns the path to `uv`, if installed.
pub fn uv_path() -> Option<PathBuf> {
    which("uv").ok()
}

/// Finds and returns the path to a Python interpreter.
pub fn python_path() -> Result<PathBuf> {
    which("python3")
        .or_else(|_| which("python"))
        .context("Cannot find a Python interpreter on path (python3 or python)")
}

/// How Python gets launched for this run.
#[derive(Debug, Clone)]
pub enum Interpreter {
    /// Through `uv run -- python`.
    Uv(PathBuf),
    /// Directly.
    Direct(PathBuf),
}

impl Interpreter {
    /// Resolves the interpreter, honouring a pinned path first.
    pub fn discover(pinned: Option<&Path>) -> Result<Self> {
        if let Some(path) = pinned {
            // Subprocesses run in the notebook's directory; bare names still
            // go through PATH.
            let path = if path.components().count() > 1 {
                std::path::absolute(path)
                    .with_context(|| format!("Cannot resolve {}", path.display()))?
            } else {
                path.to_path_buf()
            };
            return Ok(Interpreter::Direct(path));
        }
        if let Some(uv) = uv_path() {
            return Ok(Interpreter::Uv(uv));
        }
        python_path().map(Interpreter::Direct)
    }

    /// Returns the program and arguments that run `python -m <module> <args>`.
    pub fn module_command(&self, module: &str, extra: &[OsString]) -> (OsString, Vec<OsString>) {
        let mut args = self.python_prefix();
        args.push("-m".into());
        args.push(module.into());
        args.extend(extra.iter().cloned());
        (self.program(), args)
    }

    /// Returns the program and arguments that run `python -c <code>`.
    pub fn code_command(&self, code: &str) -> (OsString, Vec<OsString>) {
        let mut args = self.python_prefix();
        args.push("-c".into());
        args.push(code.into());
        (self.program(), args)
    }

    /// Executable to spawn.
    fn program(&self) -> OsString {
        match self {
            Interpreter::Uv(path) | Interpreter::Direct(path) => path.clone().into_os_string(),
        }
    }

    /// Arguments that come before the Python arguments proper.
    fn python_prefix(&self) -> Vec<OsString> {
        match self {
            Interpreter::Uv(_) => vec!["run".into(), "--".into(), "python".into()],
            Interpreter::Direct(_) => Vec::new(),
        }
    }
}
