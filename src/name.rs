//! Filename decomposition.
//!
//! File names are stored as a base and an extension, split on the first
//! separator:
//!
//! | raw          | base      | ext         |
//! |--------------|-----------|-------------|
//! | `README.md`  | `README`  | `md`        |
//! | `.gitignore` | —         | `gitignore` |
//! | `ffmpeg`     | `ffmpeg`  | —           |
//!
//! Directory names are never decomposed; `.git` keeps its whole name.

/// Split a filename into base and extension on the first separator.
/// Empty components are normalized to `None`.
pub fn split(filename: &str) -> (Option<&str>, Option<&str>) {
    match filename.split_once('.') {
        Some((base, ext)) => (none_if_empty(base), none_if_empty(ext)),
        None => (none_if_empty(filename), None),
    }
}

/// Compose a display name from its components. The separator appears
/// only when an extension is present.
pub fn compose(base: Option<&str>, ext: Option<&str>) -> String {
    match ext.filter(|e| !e.is_empty()) {
        Some(ext) => format!("{}.{}", base.unwrap_or_default(), ext),
        None => base.unwrap_or_default().to_owned(),
    }
}

/// Empty strings are stored as SQL NULL.
pub fn none_if_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
