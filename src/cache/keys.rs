//! Versioned Key Module
//!
//! Encoding and decoding of version-aware cache keys.
//!
//! In version-aware mode the stored key is `"<base>@<version>"`. The base
//! key is everything before the first `@`; the version is everything
//! after it. Callers that use `@` inside their keys accept that the first
//! `@` marks the version boundary.

// == Separator ==
/// Character separating the base key from the version tag.
pub const VERSION_SEPARATOR: char = '@';

// == Effective Key ==
/// Builds the stored (effective) key from a base key and version tag.
pub fn effective_key(base: &str, version: &str) -> String {
    format!("{base}{VERSION_SEPARATOR}{version}")
}

// == Base Key ==
/// Returns the caller-visible base key of an effective key.
///
/// For non-versioned keys this is the key itself.
pub fn base_key(key: &str) -> &str {
    match key.find(VERSION_SEPARATOR) {
        Some(idx) => &key[..idx],
        None => key,
    }
}

// == Split ==
/// Splits an effective key into `(base, Some(version))`, or
/// `(key, None)` when the key carries no version tag.
pub fn split_versioned(key: &str) -> (&str, Option<&str>) {
    match key.find(VERSION_SEPARATOR) {
        Some(idx) => (&key[..idx], Some(&key[idx + 1..])),
        None => (key, None),
    }
}

// == Prefix Match ==
/// Checks whether `key` is a versioned form of `base`.
pub fn is_version_of(key: &str, base: &str) -> bool {
    key.len() > base.len()
        && key.starts_with(base)
        && key[base.len()..].starts_with(VERSION_SEPARATOR)
}
