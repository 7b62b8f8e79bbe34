//! Discovery of the `go.mod` that governs a directory.
//!
//! The nearest manifest is found by walking from the starting directory up to
//! the filesystem root. An entry named `go.mod` that is itself a directory is
//! not a manifest; the search steps over it and keeps going upward.

use crate::manifest::ManifestError;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// The manifest filename.
pub const MANIFEST_FILE: &str = "go.mod";

/// What sits at `<dir>/go.mod`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Probe {
    /// A regular file: the manifest.
    File(PathBuf),
    /// A directory that happens to be named `go.mod`.
    Dir,
    Missing,
}

/// Stat `<dir>/go.mod`, following symlinks.
pub(crate) fn probe(dir: &Path) -> Result<Probe, ManifestError> {
    let candidate = dir.join(MANIFEST_FILE);
    match fs::metadata(&candidate) {
        Ok(meta) if meta.is_dir() => Ok(Probe::Dir),
        Ok(_) => Ok(Probe::File(candidate)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Probe::Missing),
        Err(source) => Err(ManifestError::Io {
            path: candidate,
            source,
        }),
    }
}

/// Find the nearest `go.mod` file at or above `start`.
///
/// If `start` is a file, the search begins in its directory. Returns the
/// absolute path of the manifest file.
///
/// # Errors
///
/// Returns [`ManifestError::NotFound`] if the root is reached without finding
/// a manifest file, or [`ManifestError::Io`] for any other filesystem failure.
pub fn find_mod_file(start: impl AsRef<Path>) -> Result<PathBuf, ManifestError> {
    let start = start.as_ref();
    let mut dir = absolute(start).map_err(|source| ManifestError::Io {
        path: start.to_path_buf(),
        source,
    })?;
    if dir.is_file() {
        dir.pop();
    }

    loop {
        if let Probe::File(path) = probe(&dir)? {
            return Ok(path);
        }

        if !dir.pop() {
            return Err(ManifestError::NotFound {
                start: start.to_path_buf(),
            });
        }
    }
}

/// The module root governing `start`: the directory holding the nearest `go.mod`.
pub fn mod_dir(start: impl AsRef<Path>) -> Result<PathBuf, ManifestError> {
    let mut path = find_mod_file(start)?;
    path.pop();
    Ok(path)
}

/// Make `path` absolute against the current directory and clean it lexically.
///
/// Symlinks are not resolved and the path does not need to exist.
pub(crate) fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(clean(path))
    } else {
        Ok(clean(&std::env::current_dir()?.join(path)))
    }
}

/// Lexically remove `.` components and resolve `..` against the preceding one.
pub(crate) fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if out.file_name().is_some() {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
