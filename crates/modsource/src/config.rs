//! Resolver configuration.
//!
//! The two roots a resolver needs are passed in explicitly rather than read
//! from process state on every call. They can be built by hand, taken from
//! the usual Go environment variables, or loaded from a TOML file:
//!
//! ```toml
//! std-root = "/usr/local/go/src"
//! cache-root = "/home/me/go/pkg/mod"
//! ```

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while building a [`ResolverConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("cannot determine the home directory for the default GOPATH")]
    NoHome,
}

/// Locations consulted by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ResolverConfig {
    /// Directory containing standard-library package sources (`$GOROOT/src`).
    pub std_root: PathBuf,

    /// Root of the shared module cache (`$GOMODCACHE`).
    pub cache_root: PathBuf,
}

impl ResolverConfig {
    #[must_use]
    pub fn new(std_root: impl Into<PathBuf>, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            std_root: std_root.into(),
            cache_root: cache_root.into(),
        }
    }

    /// Build a configuration from `GOROOT`, `GOMODCACHE` and `GOPATH`.
    ///
    /// The cache root is `$GOMODCACHE` if set, otherwise `pkg/mod` under the
    /// first `$GOPATH` entry, otherwise `~/go/pkg/mod`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var_os(key), dirs::home_dir)
    }

    fn from_vars(
        var: impl Fn(&str) -> Option<OsString>,
        home: impl FnOnce() -> Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let var = |key: &str| var(key).filter(|v| !v.is_empty());

        let goroot = var("GOROOT").ok_or(ConfigError::MissingVar("GOROOT"))?;
        let std_root = PathBuf::from(goroot).join("src");

        let cache_root = if let Some(cache) = var("GOMODCACHE") {
            PathBuf::from(cache)
        } else {
            let gopath = var("GOPATH")
                .and_then(|list| std::env::split_paths(&list).find(|p| !p.as_os_str().is_empty()));
            let gopath = match gopath {
                Some(path) => path,
                None => home().ok_or(ConfigError::NoHome)?.join("go"),
            };
            gopath.join("pkg").join("mod")
        };

        Ok(Self {
            std_root,
            cache_root,
        })
    }

    /// Load a configuration from a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse a configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}
