//! On-disk encoding of module paths and versions for the module cache.
//!
//! The cache must work on case-insensitive filesystems, so every uppercase
//! letter is written as `!` followed by its lowercase form:
//! `github.com/Azure/azure-sdk` is stored as `github.com/!azure/azure-sdk`.
//! `!` itself is not allowed in module paths or versions, which keeps the
//! encoding injective.

use thiserror::Error;

/// Errors produced while validating or escaping a module path or version.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscapeError {
    #[error("malformed module path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("malformed module version {version:?}: {reason}")]
    InvalidVersion { version: String, reason: String },
}

/// Element names that Windows reserves regardless of extension.
const BAD_WINDOWS_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElemKind {
    /// An element of a module path.
    Module,
    /// A single file name, used for versions.
    File,
}

fn module_path_ok(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

fn file_name_ok(c: char) -> bool {
    if c.is_ascii() {
        c.is_ascii_alphanumeric() || "!#$%&()+,-.=@[]^_{}~ ".contains(c)
    } else {
        c.is_alphabetic()
    }
}

fn first_elem_ok(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.'
}

/// Check one `/`-separated element.
fn check_elem(elem: &str, kind: ElemKind) -> Result<(), String> {
    if elem.is_empty() {
        return Err("empty path element".to_string());
    }
    if elem.chars().all(|c| c == '.') {
        return Err(format!("invalid path element {elem:?}"));
    }
    if kind == ElemKind::Module && elem.starts_with('.') {
        return Err("leading dot in path element".to_string());
    }
    if elem.ends_with('.') {
        return Err("trailing dot in path element".to_string());
    }
    for c in elem.chars() {
        let ok = match kind {
            ElemKind::Module => module_path_ok(c),
            ElemKind::File => file_name_ok(c),
        };
        if !ok {
            return Err(format!("invalid char {c:?}"));
        }
    }

    let short = elem.split('.').next().unwrap_or(elem);
    if BAD_WINDOWS_NAMES
        .iter()
        .any(|bad| bad.eq_ignore_ascii_case(short))
    {
        return Err(format!(
            "{short:?} disallowed as path element component on Windows"
        ));
    }
    if kind == ElemKind::File {
        return Ok(());
    }

    // Reject Windows short names such as `PROGRA~1`.
    if let Some(tilde) = short.rfind('~') {
        let suffix = &short[tilde + 1..];
        if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
            return Err("trailing tilde and digits in path element".to_string());
        }
    }
    Ok(())
}

/// Splits a module path into its prefix and major-version suffix.
///
/// `example.com/pkg/v2` splits into `("example.com/pkg", "/v2")`,
/// `gopkg.in/yaml.v3` into `("gopkg.in/yaml", ".v3")`. Returns `None` if the
/// suffix is malformed, for example `/v1` or `/v02`.
#[must_use]
pub fn split_path_version(path: &str) -> Option<(&str, &str)> {
    if path.starts_with("gopkg.in/") {
        return split_gopkg_in(path);
    }

    let bytes = path.as_bytes();
    let mut i = bytes.len();
    let mut dot = false;
    while i > 0 && (bytes[i - 1].is_ascii_digit() || bytes[i - 1] == b'.') {
        if bytes[i - 1] == b'.' {
            dot = true;
        }
        i -= 1;
    }
    if i <= 1 || i == bytes.len() || bytes[i - 1] != b'v' || bytes[i - 2] != b'/' {
        return Some((path, ""));
    }

    let (prefix, major) = path.split_at(i - 2);
    if dot || major.len() <= 2 || major.as_bytes()[2] == b'0' || major == "/v1" {
        return None;
    }
    Some((prefix, major))
}

fn split_gopkg_in(path: &str) -> Option<(&str, &str)> {
    let end = path.strip_suffix("-unstable").map_or(path.len(), str::len);
    let bytes = path.as_bytes();
    let mut i = end;
    while i > 0 && bytes[i - 1].is_ascii_digit() {
        i -= 1;
    }
    if i <= 1 || bytes[i - 1] != b'v' || bytes[i - 2] != b'.' {
        return None;
    }

    let (prefix, major) = path.split_at(i - 2);
    if major.len() <= 2 || (major.as_bytes()[2] == b'0' && major != ".v0") {
        return None;
    }
    Some((prefix, major))
}

/// Validates a module path.
pub fn check_path(path: &str) -> Result<(), EscapeError> {
    check_path_inner(path).map_err(|reason| EscapeError::InvalidPath {
        path: path.to_string(),
        reason,
    })
}

fn check_path_inner(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("empty string".to_string());
    }
    if path.starts_with('-') {
        return Err("leading dash".to_string());
    }
    if path.contains("//") {
        return Err("double slash".to_string());
    }
    if path.ends_with('/') {
        return Err("trailing slash".to_string());
    }
    for elem in path.split('/') {
        check_elem(elem, ElemKind::Module)?;
    }

    let first = path.split('/').next().unwrap_or(path);
    if first.is_empty() {
        return Err("leading slash".to_string());
    }
    if !first.contains('.') {
        return Err("missing dot in first path element".to_string());
    }
    if let Some(c) = first.chars().find(|&c| !first_elem_ok(c)) {
        return Err(format!("invalid char {c:?} in first path element"));
    }
    if split_path_version(path).is_none() {
        return Err("invalid version".to_string());
    }
    Ok(())
}

/// Validates a version for use as a single cache directory element.
pub fn check_version(version: &str) -> Result<(), EscapeError> {
    let invalid = |reason: String| EscapeError::InvalidVersion {
        version: version.to_string(),
        reason,
    };
    check_elem(version, ElemKind::File).map_err(invalid)?;
    if version.contains('!') {
        return Err(invalid("disallowed version string".to_string()));
    }
    Ok(())
}

/// Rewrites uppercase letters as `!` + lowercase. Callers validate first, so
/// `!` and non-ASCII input never reach this point.
fn escape_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            escaped.push('!');
            escaped.push(c.to_ascii_lowercase());
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Escapes a module path for the cache.
///
/// ```
/// use modsource::escape_path;
///
/// assert_eq!(escape_path("github.com/BurntSushi/toml").unwrap(), "github.com/!burnt!sushi/toml");
/// ```
pub fn escape_path(path: &str) -> Result<String, EscapeError> {
    check_path(path)?;
    Ok(escape_string(path))
}

/// Escapes a module version for the cache.
pub fn escape_version(version: &str) -> Result<String, EscapeError> {
    check_version(version)?;
    if !version.is_ascii() {
        return Err(EscapeError::InvalidVersion {
            version: version.to_string(),
            reason: "non-ASCII character".to_string(),
        });
    }
    Ok(escape_string(version))
}

/// The cache-relative location of `path@version`, followed by the
/// sub-package `suffix` (which starts with `/` or is empty and is not escaped).
pub fn escape_module(path: &str, version: &str, suffix: &str) -> Result<String, EscapeError> {
    let path = escape_path(path)?;
    let version = escape_version(version)?;
    Ok(format!("{path}@{version}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_uppercase() {
        assert_eq!(
            escape_path("github.com/Azure/azure-sdk-for-go").unwrap(),
            "github.com/!azure/azure-sdk-for-go"
        );
        assert_eq!(escape_version("v1.0.0-RC1").unwrap(), "v1.0.0-!r!c1");
    }

    #[test]
    fn test_escape_is_stable() {
        let first = escape_module("github.com/Foo/bar", "v1.2.3", "/sub").unwrap();
        let second = escape_module("github.com/Foo/bar", "v1.2.3", "/sub").unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "github.com/!foo/bar@v1.2.3/sub");
    }

    #[test]
    fn test_case_variants_do_not_collide() {
        let upper = escape_path("example.com/Pkg").unwrap();
        let lower = escape_path("example.com/pkg").unwrap();
        assert_ne!(upper, lower);
    }

    #[test]
    fn test_suffix_not_escaped() {
        assert_eq!(
            escape_module("example.com/m", "v0.1.0", "/Internal/X").unwrap(),
            "example.com/m@v0.1.0/Internal/X"
        );
    }

    #[test]
    fn test_invalid_paths() {
        for path in [
            "",
            "-example.com/m",
            "example.com//m",
            "example.com/m/",
            "example.com/.hidden",
            "example.com/m.",
            "example.com/a b",
            "example.com/a!b",
            "example.com/CON",
            "example.com/PROGRA~1",
            "localhost/m",
            "Example.com/m",
            "example.com/m/v1",
            "example.com/m/v02",
            "example.com/ünï",
        ] {
            assert!(
                matches!(escape_path(path), Err(EscapeError::InvalidPath { .. })),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_versions() {
        for version in ["", "v1.0.0!", "..", "v1.", "v1/2", "nul"] {
            assert!(
                matches!(escape_version(version), Err(EscapeError::InvalidVersion { .. })),
                "{version} should be rejected"
            );
        }
    }

    #[test]
    fn test_split_path_version() {
        assert_eq!(
            split_path_version("example.com/pkg/v2"),
            Some(("example.com/pkg", "/v2"))
        );
        assert_eq!(
            split_path_version("example.com/pkg"),
            Some(("example.com/pkg", ""))
        );
        assert_eq!(split_path_version("example.com/pkg/v1"), None);
        assert_eq!(split_path_version("example.com/pkg/v2.1"), None);
        assert_eq!(
            split_path_version("gopkg.in/yaml.v3"),
            Some(("gopkg.in/yaml", ".v3"))
        );
        assert_eq!(
            split_path_version("gopkg.in/check.v1-unstable"),
            Some(("gopkg.in/check", ".v1-unstable"))
        );
        assert_eq!(split_path_version("gopkg.in/yaml"), None);
    }
}
