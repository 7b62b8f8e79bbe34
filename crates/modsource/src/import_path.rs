//! Computing the import path of a directory from its enclosing module.

use crate::locate::{self, Probe};
use crate::manifest::{read_mod_file, ManifestError};
use std::fs;
use std::path::Path;

/// The Go import path of the package at `path`.
///
/// The path is the declared module path of the nearest enclosing `go.mod`,
/// followed by the directories between the module root and `path`. If `path`
/// names a file, its directory is used.
///
/// # Errors
///
/// Returns [`ManifestError::NotFound`] if no manifest encloses `path`,
/// [`ManifestError::MissingModule`] if the manifest declares no module, and
/// [`ManifestError::NonUtf8Path`] if a directory name cannot be represented
/// in an import path.
pub fn import_path(path: impl AsRef<Path>) -> Result<String, ManifestError> {
    let path = path.as_ref();
    let io_err = |source: std::io::Error| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    };

    let meta = fs::metadata(path).map_err(io_err)?;
    let mut dir = locate::absolute(path).map_err(io_err)?;
    if !meta.is_dir() {
        dir.pop();
    }

    let mut segments = Vec::new();
    loop {
        match locate::probe(&dir)? {
            Probe::File(manifest) => {
                let file = read_mod_file(&manifest)?;
                let module = file
                    .module_path()
                    .ok_or_else(|| ManifestError::MissingModule {
                        path: manifest.clone(),
                    })?;
                segments.push(module.to_string());
                segments.reverse();
                return Ok(segments.join("/"));
            }
            Probe::Dir | Probe::Missing => {
                let Some(name) = dir.file_name() else {
                    return Err(ManifestError::NotFound {
                        start: path.to_path_buf(),
                    });
                };
                let name = name.to_str().ok_or_else(|| ManifestError::NonUtf8Path {
                    path: dir.clone(),
                })?;
                segments.push(name.to_string());
                dir.pop();
            }
        }
    }
}
