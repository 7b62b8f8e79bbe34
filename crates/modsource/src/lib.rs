//! Go module resolution.
//!
//! This crate provides:
//! - Discovery of the `go.mod` governing a directory
//! - Parsing of `go.mod` manifests
//! - The module cache's case-safe encoding of paths and versions
//! - Resolution of import paths to source directories
//! - Computation of the import path of a directory

mod config;
mod escape;
mod import_path;
mod locate;
pub mod manifest;
mod resolve;
mod version;

pub use config::{ConfigError, ResolverConfig};
pub use escape::{
    check_path, check_version, escape_module, escape_path, escape_version, split_path_version,
    EscapeError,
};
pub use import_path::import_path;
pub use locate::{find_mod_file, mod_dir, MANIFEST_FILE};
pub use manifest::{
    mod_file, read_mod_file, Godebug, ManifestError, ModFile, Module, ModuleVersion, Replace,
    Require, Retract,
};
pub use resolve::{ResolveError, Resolver};
pub use version::{canonical_version, is_canonical};
