//! `go.mod` manifest records and loading.
//!
//! A [`ModFile`] is the parsed form of one manifest. It is built fresh on
//! every load and never cached, so it always reflects what is on disk.

mod lexer;
mod parser;

pub use lexer::{LexError, TokenKind};
pub use parser::{is_directory_path, parse, ParseError, ParseErrorKind};

use crate::locate::find_mod_file;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when locating or loading a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("no go.mod found in {} or any parent directory", .start.display())]
    NotFound { start: PathBuf },

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse manifest: {0}")]
    Parse(#[from] ParseError),

    #[error("{} has no module directive", .path.display())]
    MissingModule { path: PathBuf },

    #[error("path is not valid UTF-8: {}", .path.display())]
    NonUtf8Path { path: PathBuf },
}

impl ManifestError {
    /// True when the manifest, or the path being inspected, does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// The parsed contents of a `go.mod` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModFile {
    /// The `module` directive, if present.
    pub module: Option<Module>,

    /// The `go` directive.
    pub go: Option<String>,

    /// The `toolchain` directive.
    pub toolchain: Option<String>,

    /// `require` directives in file order.
    pub require: Vec<Require>,

    pub exclude: Vec<ModuleVersion>,

    /// `replace` directives in file order.
    pub replace: Vec<Replace>,

    pub retract: Vec<Retract>,

    pub godebug: Vec<Godebug>,

    pub tool: Vec<String>,

    pub ignore: Vec<String>,
}

impl ModFile {
    /// The module's own declared path.
    #[must_use]
    pub fn module_path(&self) -> Option<&str> {
        self.module.as_ref().map(|m| m.path.as_str())
    }

    /// The first replace directive whose old path is `path`.
    #[must_use]
    pub fn replacement_for(&self, path: &str) -> Option<&Replace> {
        self.replace.iter().find(|r| r.old.path == path)
    }

    /// Require directives ordered longest path first.
    ///
    /// When both `example.com/pkg` and `example.com/pkg/v2` are required, the
    /// longer path is tried first so it gets the chance to match.
    #[must_use]
    pub fn requires_longest_first(&self) -> Vec<&Require> {
        let mut requires: Vec<&Require> = self.require.iter().collect();
        requires.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        requires
    }
}

/// The `module` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    pub path: String,

    /// Message from a `// Deprecated:` comment on the directive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
}

/// A `require` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Require {
    pub path: String,
    pub version: String,

    /// Marked with a `// indirect` comment.
    pub indirect: bool,
}

/// A module path with an optional version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleVersion {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A `replace` directive.
///
/// `new.version` is `None` exactly when `new.path` is a local directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replace {
    pub old: ModuleVersion,
    pub new: ModuleVersion,
}

/// A `retract` directive. A single version has `low == high`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Retract {
    pub low: String,
    pub high: String,
    pub rationale: String,
}

/// A `godebug key=value` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Godebug {
    pub key: String,
    pub value: String,
}

/// Read and parse the manifest at `path`.
pub fn read_mod_file(path: impl AsRef<Path>) -> Result<ModFile, ManifestError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse(&path.display().to_string(), &data)?)
}

/// Locate and load the manifest governing `start`.
///
/// Returns the absolute manifest path together with its parsed contents.
pub fn mod_file(start: impl AsRef<Path>) -> Result<(PathBuf, ModFile), ManifestError> {
    let path = find_mod_file(start)?;
    let file = read_mod_file(&path)?;
    Ok((path, file))
}
