//! Module version validation.
//!
//! Module versions are semantic versions with a leading `v`. The manifest
//! accepts the short forms `v1` and `v1.2`, which canonicalize to `v1.0.0` and
//! `v1.2.0`. Build metadata is dropped from the canonical form, except for the
//! `+incompatible` marker which carries meaning for major-version checks.

use regex::Regex;
use semver::Version;
use std::sync::OnceLock;

/// Build metadata that survives canonicalization.
pub const INCOMPATIBLE: &str = "incompatible";

fn go_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([1-9][0-9]*)\.(0|[1-9][0-9]*)(\.(0|[1-9][0-9]*))?([a-z]+[0-9]+)?$")
            .expect("go version pattern is valid")
    })
}

fn toolchain_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^default$|^go1($|\.)").expect("toolchain pattern is valid"))
}

/// Parse a `v`-prefixed module version, padding the short forms.
fn parse(v: &str) -> Option<Version> {
    let rest = v.strip_prefix('v')?;
    let split = rest.find(['-', '+']).unwrap_or(rest.len());
    let (core, tail) = rest.split_at(split);

    let padded = match core.split('.').count() {
        1 if tail.is_empty() => format!("{core}.0.0"),
        2 if tail.is_empty() => format!("{core}.0"),
        3 => format!("{core}{tail}"),
        _ => return None,
    };

    Version::parse(&padded).ok()
}

/// Returns the canonical form of a module version, or `None` if it is invalid.
///
/// ```
/// use modsource::canonical_version;
///
/// assert_eq!(canonical_version("v1.2").as_deref(), Some("v1.2.0"));
/// assert_eq!(canonical_version("v2.0.0+incompatible").as_deref(), Some("v2.0.0+incompatible"));
/// assert_eq!(canonical_version("1.2.3"), None);
/// ```
#[must_use]
pub fn canonical_version(v: &str) -> Option<String> {
    let version = parse(v)?;
    let mut canonical = format!("v{}.{}.{}", version.major, version.minor, version.patch);
    if !version.pre.is_empty() {
        canonical.push('-');
        canonical.push_str(version.pre.as_str());
    }
    if version.build.as_str() == INCOMPATIBLE {
        canonical.push('+');
        canonical.push_str(INCOMPATIBLE);
    }
    Some(canonical)
}

/// Returns true if `v` is already in canonical form.
#[must_use]
pub fn is_canonical(v: &str) -> bool {
    canonical_version(v).is_some_and(|c| c == v)
}

/// The major version component of a module version, e.g. `2` for `v2.3.0`.
#[must_use]
pub fn major(v: &str) -> Option<u64> {
    parse(v).map(|version| version.major)
}

/// Returns true if the version carries the `+incompatible` marker.
#[must_use]
pub fn is_incompatible(v: &str) -> bool {
    parse(v).is_some_and(|version| version.build.as_str() == INCOMPATIBLE)
}

/// Returns true if the version is a pre-release starting with `v0.0.0-`,
/// the shape used by pseudo-versions of untagged commits.
#[must_use]
pub fn is_zero_pseudo(v: &str) -> bool {
    v.starts_with("v0.0.0-")
}

/// Validates the argument of a `go` directive, e.g. `1.21` or `1.22.0`.
#[must_use]
pub fn is_go_version(v: &str) -> bool {
    go_version_re().is_match(v)
}

/// Validates the argument of a `toolchain` directive, e.g. `go1.22.1` or `default`.
#[must_use]
pub fn is_toolchain(name: &str) -> bool {
    toolchain_re().is_match(name)
}
