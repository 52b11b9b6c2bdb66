#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Jupyter notebook documents and the submission loader.

use std::{
    fmt::Display,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::SUPPORTED_NBFORMAT;

/// Reasons a submission could not be turned into a [`Notebook`].
#[derive(Error, Debug)]
pub enum LoadError {
    /// Nothing exists at the configured path.
    #[error("Student submission notebook not found at {}", .path.display())]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("Could not read {}: {source}", .path.display())]
    Unreadable {
        /// Path that was read.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not a notebook document.
    #[error("{} is not a valid notebook: {source}", .path.display())]
    Invalid {
        /// Path that was parsed.
        path:   PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The notebook uses a format version this grader cannot read.
    #[error(
        "{} uses nbformat {found}, only version {supported} is supported",
        .path.display(),
        supported = SUPPORTED_NBFORMAT
    )]
    UnsupportedVersion {
        /// Path that was parsed.
        path:  PathBuf,
        /// Major version found in the document.
        found: u32,
    },
}

/// Text that the interchange format stores either whole or split into lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum MultilineText {
    /// A single string.
    Whole(String),
    /// Line fragments, each keeping its trailing newline.
    Lines(Vec<String>),
}

impl Default for MultilineText {
    fn default() -> Self {
        MultilineText::Whole(String::new())
    }
}

impl Display for MultilineText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MultilineText::Whole(text) => write!(f, "{text}"),
            MultilineText::Lines(lines) => write!(f, "{}", lines.concat()),
        }
    }
}

/// Kind of a notebook cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    /// Executable source.
    Code,
    /// Prose.
    Markdown,
    /// Unrendered passthrough content.
    Raw,
    /// Anything newer than this grader knows about.
    #[serde(other)]
    Unknown,
}

/// One output entry recorded on an executed code cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CellOutput {
    /// `stream`, `execute_result`, `display_data` or `error`.
    pub output_type: String,
    /// Stream name (`stdout` or `stderr`) for stream outputs.
    #[serde(default)]
    pub name:        Option<String>,
    /// Stream text for stream outputs.
    #[serde(default)]
    pub text:        Option<MultilineText>,
}

/// A single notebook cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    /// Kind of cell.
    pub cell_type: CellType,
    /// Cell source text.
    #[serde(default)]
    pub source:    MultilineText,
    /// Outputs, present on code cells of executed notebooks.
    #[serde(default)]
    pub outputs:   Vec<CellOutput>,
}

impl Cell {
    /// Whether this is a code cell.
    pub fn is_code(&self) -> bool {
        self.cell_type == CellType::Code
    }

    /// Source text joined into one string.
    pub fn source_text(&self) -> String {
        self.source.to_string()
    }
}

/// A parsed notebook document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notebook {
    /// Ordered cells.
    pub cells:          Vec<Cell>,
    /// Major format version.
    pub nbformat:       u32,
    /// Minor format version.
    #[serde(default)]
    pub nbformat_minor: u32,
}

impl Notebook {
    /// Parses a notebook from its JSON text.
    ///
    /// * `path`: used only to label errors
    pub fn parse(path: &Path, text: &str) -> Result<Self, LoadError> {
        let notebook: Notebook = serde_json::from_str(text).map_err(|source| LoadError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;

        if notebook.nbformat != SUPPORTED_NBFORMAT {
            return Err(LoadError::UnsupportedVersion {
                path:  path.to_path_buf(),
                found: notebook.nbformat,
            });
        }

        Ok(notebook)
    }

    /// Reads and parses the notebook at `path`.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                LoadError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                LoadError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        Self::parse(path, &text)
    }

    /// Iterates over code cells in document order.
    pub fn code_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| c.is_code())
    }

    /// Source text of every code cell, in order.
    pub fn code_sources(&self) -> Vec<String> {
        self.code_cells().map(Cell::source_text).collect()
    }

    /// Concatenated `stdout` stream output across all code cells.
    pub fn stdout_text(&self) -> String {
        self.code_cells()
            .flat_map(|cell| cell.outputs.iter())
            .filter(|out| out.output_type == "stream" && out.name.as_deref() == Some("stdout"))
            .filter_map(|out| out.text.as_ref().map(ToString::to_string))
            .collect()
    }
}

/// Outcome of looking for the submission on disk.
#[derive(Debug)]
pub enum Submission {
    /// The notebook was found and parsed.
    Loaded {
        /// Where it was read from.
        path:     PathBuf,
        /// The parsed document.
        notebook: Notebook,
    },
    /// The notebook is missing or unusable; every check will fail.
    Degraded {
        /// Where it was looked for.
        path:   PathBuf,
        /// Why it could not be used.
        reason: LoadError,
    },
}

impl Submission {
    /// Loads the submission, folding load errors into the degraded state.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Notebook::load(&path) {
            Ok(notebook) => Submission::Loaded { path, notebook },
            Err(reason) => {
                tracing::warn!("{reason}");
                Submission::Degraded { path, reason }
            }
        }
    }

    /// The parsed notebook, if loading succeeded.
    pub fn notebook(&self) -> Option<&Notebook> {
        match self {
            Submission::Loaded { notebook, .. } => Some(notebook),
            Submission::Degraded { .. } => None,
        }
    }

    /// Path the submission was looked up at.
    pub fn path(&self) -> &Path {
        match self {
            Submission::Loaded { path, .. } | Submission::Degraded { path, .. } => path,
        }
    }

    /// Why the submission is unusable, if it is.
    pub fn load_error(&self) -> Option<&LoadError> {
        match self {
            Submission::Loaded { .. } => None,
            Submission::Degraded { reason, .. } => Some(reason),
        }
    }
}
