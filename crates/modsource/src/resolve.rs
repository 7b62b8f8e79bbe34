//! Resolution of an import path to the directory holding its source.
//!
//! Resolution follows the governing manifest:
//! - paths without a `.` in them belong to the standard library
//! - everything else must fall under one of the manifest's `require`d modules
//! - a `replace` for that module redirects to a local directory or to another
//!   module, the latter followed for a single hop only
//! - anything left is looked up in the module cache under its escaped name

use crate::config::{ConfigError, ResolverConfig};
use crate::escape::{escape_module, EscapeError};
use crate::locate;
use crate::manifest::{self, ManifestError, Replace, Require};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during source resolution.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No required module covers the import path.
    #[error("no required module provides package {path}")]
    NotFound { path: String },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Escape(#[from] EscapeError),

    /// A local replacement could not be made absolute.
    #[error("cannot resolve replacement directory {}: {source}", .path.display())]
    Path {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ResolveError {
    /// True when the import path, or the manifest it depends on, does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Manifest(e) => e.is_not_found(),
            _ => false,
        }
    }
}

/// Maps import paths to source directories on disk.
///
/// A resolver holds no state besides its configuration. Every call re-reads
/// the manifest, so results always reflect the current filesystem.
#[derive(Debug, Clone)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    /// Create a resolver for the given roots.
    #[must_use]
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Create a resolver configured from the Go environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(ResolverConfig::from_env()?))
    }

    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Find the source directory of the package `target` as seen from the
    /// module governing `mod_dir`.
    ///
    /// When `follow_replace` is false, `replace` directives are ignored and the
    /// required version is always looked up in the module cache. A replacement
    /// to another module is resolved through that module's own `require` entry
    /// and is not replaced again.
    ///
    /// Relative local replacements are joined to the directory of the located
    /// `go.mod`, not to `mod_dir`, so passing a subdirectory of the module
    /// gives the same result as passing its root.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotFound`] when no required module covers
    /// `target`, and propagates manifest, escaping and path failures.
    pub fn source_dir(
        &self,
        target: &str,
        mod_dir: impl AsRef<Path>,
        follow_replace: bool,
    ) -> Result<PathBuf, ResolveError> {
        self.resolve(target, mod_dir.as_ref(), follow_replace)
    }

    fn resolve(
        &self,
        target: &str,
        mod_dir: &Path,
        follow_replace: bool,
    ) -> Result<PathBuf, ResolveError> {
        if !target.contains('.') {
            return Ok(self.config.std_root.join(target));
        }

        let (manifest_path, file) = manifest::mod_file(mod_dir)?;
        let (require, suffix) = file
            .requires_longest_first()
            .into_iter()
            .find_map(|r| covering(r, target).map(|suffix| (r, suffix)))
            .ok_or_else(|| ResolveError::NotFound {
                path: target.to_string(),
            })?;

        let replace = if follow_replace {
            file.replacement_for(&require.path)
        } else {
            None
        };
        let Some(Replace { new, .. }) = replace else {
            return self.cached(&require.path, &require.version, suffix);
        };

        match &new.version {
            None => {
                let root = manifest_path.parent().unwrap_or(Path::new("/"));
                local_dir(root, &new.path)
            }
            Some(_) => {
                let redirected = format!("{}{suffix}", new.path);
                self.resolve(&redirected, mod_dir, false)
            }
        }
    }

    /// `<cache_root>/<escaped path>@<escaped version><suffix>`
    fn cached(&self, path: &str, version: &str, suffix: &str) -> Result<PathBuf, ResolveError> {
        let leaf = escape_module(path, version, suffix)?;
        Ok(self.config.cache_root.join(leaf))
    }
}

/// The part of `target` below `require`'s module path, if the module covers it.
///
/// `example.com/web` covers `example.com/web` and `example.com/web/api` but not
/// `example.com/webuse`.
fn covering<'a>(require: &Require, target: &'a str) -> Option<&'a str> {
    let suffix = target.strip_prefix(require.path.as_str())?;
    (suffix.is_empty() || suffix.starts_with('/')).then_some(suffix)
}

fn local_dir(root: &Path, replacement: &str) -> Result<PathBuf, ResolveError> {
    let joined = root.join(replacement);
    locate::absolute(&joined).map_err(|source| ResolveError::Path {
        path: joined,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::MANIFEST_FILE;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        module: PathBuf,
        resolver: Resolver,
    }

    fn fixture(manifest: &str) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let module = tmp.path().join("work/app");
        fs::create_dir_all(&module).unwrap();
        fs::write(module.join(MANIFEST_FILE), manifest).unwrap();
        let resolver = Resolver::new(ResolverConfig::new("/goroot/src", "/cache"));
        Fixture {
            module: locate::clean(&module),
            _tmp: tmp,
            resolver,
        }
    }

    #[test]
    fn test_stdlib_skips_manifest() {
        let resolver = Resolver::new(ResolverConfig::new("/goroot/src", "/cache"));
        let dir = resolver
            .source_dir("encoding/json", "/definitely/not/a/module", true)
            .unwrap();
        assert_eq!(dir, PathBuf::from("/goroot/src/encoding/json"));
    }

    #[test]
    fn test_cache_path_with_suffix() {
        let f = fixture("module example.com/app\nrequire github.com/Foo/bar v1.2.3\n");
        let dir = f
            .resolver
            .source_dir("github.com/Foo/bar/baz", &f.module, true)
            .unwrap();
        assert_eq!(dir, PathBuf::from("/cache/github.com/!foo/bar@v1.2.3/baz"));
    }

    #[test]
    fn test_separator_boundary() {
        let f = fixture("module example.com/app\nrequire example.com/web v1.0.0\n");
        let err = f
            .resolver
            .source_dir("example.com/webuse", &f.module, true)
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { ref path } if path == "example.com/webuse"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_longest_require_wins() {
        let f = fixture(
            "module example.com/app\nrequire (\n\texample.com/pkg v1.0.0\n\texample.com/pkg/v2 v2.1.0\n)\n",
        );
        let dir = f
            .resolver
            .source_dir("example.com/pkg/v2/sub", &f.module, true)
            .unwrap();
        assert_eq!(dir, PathBuf::from("/cache/example.com/pkg/v2@v2.1.0/sub"));
    }

    #[test]
    fn test_local_replace_is_verbatim() {
        let f = fixture(
            "module example.com/app\nrequire example.com/lib v1.0.0\nreplace example.com/lib => ../Local\n",
        );
        let dir = f
            .resolver
            .source_dir("example.com/lib/inner", &f.module, true)
            .unwrap();
        assert_eq!(dir, f.module.parent().unwrap().join("Local"));
    }

    #[test]
    fn test_replace_ignored_when_not_following() {
        let f = fixture(
            "module example.com/app\nrequire example.com/lib v1.0.0\nreplace example.com/lib => ../local\n",
        );
        let dir = f
            .resolver
            .source_dir("example.com/lib", &f.module, false)
            .unwrap();
        assert_eq!(dir, PathBuf::from("/cache/example.com/lib@v1.0.0"));
    }

    #[test]
    fn test_module_replace_follows_one_hop() {
        let f = fixture(
            "module example.com/app\n\
             require (\n\texample.com/a v1.0.0\n\texample.com/b v1.5.0\n)\n\
             replace example.com/a => example.com/b v1.1.0\n\
             replace example.com/b => ../never\n",
        );
        let dir = f
            .resolver
            .source_dir("example.com/a/x", &f.module, true)
            .unwrap();
        assert_eq!(dir, PathBuf::from("/cache/example.com/b@v1.5.0/x"));
    }

    #[test]
    fn test_module_replace_without_require_is_not_found() {
        let f = fixture(
            "module example.com/app\nrequire example.com/a v1.0.0\nreplace example.com/a => example.com/fork v1.1.0\n",
        );
        let err = f
            .resolver
            .source_dir("example.com/a", &f.module, true)
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { ref path } if path == "example.com/fork"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_local_replace_from_subdirectory() {
        let f = fixture(
            "module example.com/app\nrequire example.com/lib v1.0.0\nreplace example.com/lib => ./vendor/lib\n",
        );
        let sub = f.module.join("internal/deep");
        fs::create_dir_all(&sub).unwrap();
        let dir = f.resolver.source_dir("example.com/lib", &sub, true).unwrap();
        assert_eq!(dir, f.module.join("vendor/lib"));
    }

    #[test]
    fn test_invalid_require_path_is_escape_error() {
        let f = fixture("module example.com/app\nrequire example.com/x~1 v1.0.0\n");
        let err = f
            .resolver
            .source_dir("example.com/x~1/pkg", &f.module, true)
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Escape(EscapeError::InvalidPath { ref path, .. }) if path == "example.com/x~1"
        ));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_malformed_manifest_is_parse_error() {
        let f = fixture("module example.com/app\nbogus\n");
        let err = f
            .resolver
            .source_dir("example.com/dep", &f.module, true)
            .unwrap_err();
        assert!(matches!(err, ResolveError::Manifest(ManifestError::Parse(_))));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_io_failure_is_not_not_found() {
        let err = ResolveError::from(ManifestError::Io {
            path: PathBuf::from("/work/go.mod"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        });
        assert!(!err.is_not_found());

        let err = ResolveError::from(ManifestError::Io {
            path: PathBuf::from("/work/go.mod"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        });
        assert!(err.is_not_found());
    }

    #[test]
    fn test_missing_manifest() {
        let tmp = TempDir::new().unwrap();
        let resolver = Resolver::new(ResolverConfig::new("/goroot/src", "/cache"));
        let err = resolver
            .source_dir("example.com/x", tmp.path(), true)
            .unwrap_err();
        // The temporary directory may itself sit under some go.mod, but never
        // one that requires example.com/x.
        assert!(err.is_not_found());
    }

    #[test]
    fn test_resolver_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Resolver>();
    }
}
