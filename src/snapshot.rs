//! Snapshot reconstruction.
//!
//! History is kept as an undo log: each delta records the values a subset
//! of fields held at a given version, flagged by a presence mask, rather
//! than a full row per version. Reconstructing version `v` folds the
//! current row together with every delta at or after `v`, newest first;
//! each present field overwrites, so the smallest in-range version that
//! carries a field supplies its value.

use chrono::{DateTime, Utc};

const NAME: i64 = 1;
const EXT: i64 = 1 << 1;
const CONTENT_TYPE: i64 = 1 << 2;
const IS_DIR: i64 = 1 << 3;
const UPDATED_AT: i64 = 1 << 4;

/// Which fields a candidate row actually carries.
///
/// Persisted as an integer bitmask in the delta log; decoded here so
/// use sites never touch bit positions. A field absent from the mask
/// must not overwrite during reconstruction, even when its column
/// happens to hold a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldMask {
    pub name: bool,
    pub ext: bool,
    pub content_type: bool,
    pub is_dir: bool,
    pub updated_at: bool,
}

impl FieldMask {
    /// Every field present: how the current row enters the fold.
    pub const FULL: FieldMask = FieldMask {
        name: true,
        ext: true,
        content_type: true,
        is_dir: true,
        updated_at: true,
    };

    pub fn from_bits(bits: i64) -> Self {
        FieldMask {
            name: bits & NAME != 0,
            ext: bits & EXT != 0,
            content_type: bits & CONTENT_TYPE != 0,
            is_dir: bits & IS_DIR != 0,
            updated_at: bits & UPDATED_AT != 0,
        }
    }

    pub fn bits(&self) -> i64 {
        let mut bits = 0;
        if self.name {
            bits |= NAME;
        }
        if self.ext {
            bits |= EXT;
        }
        if self.content_type {
            bits |= CONTENT_TYPE;
        }
        if self.is_dir {
            bits |= IS_DIR;
        }
        if self.updated_at {
            bits |= UPDATED_AT;
        }
        bits
    }
}

/// One row of the reconstruction candidate set: either the current row
/// (tagged with [`FieldMask::FULL`]) or a delta at some version.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub version: i64,
    pub mask: FieldMask,
    pub name: Option<String>,
    pub ext: Option<String>,
    pub content_type: Option<String>,
    pub is_dir: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Field values reconstructed for a target version.
#[derive(Debug, Clone, PartialEq)]
pub struct Restored {
    /// Version of the newest candidate: the entry's current version.
    pub latest: i64,
    pub name: Option<String>,
    pub ext: Option<String>,
    pub content_type: Option<String>,
    pub is_dir: bool,
    pub updated_at: DateTime<Utc>,
}

/// Fold the candidate set newest-first. Returns `None` when the set is
/// empty, i.e. the entry has no current row.
pub fn restore(mut candidates: Vec<Candidate>) -> Option<Restored> {
    candidates.sort_by(|a, b| b.version.cmp(&a.version));
    let latest = candidates.first()?.version;
    let mut out = Restored {
        latest,
        name: None,
        ext: None,
        content_type: None,
        is_dir: false,
        updated_at: DateTime::UNIX_EPOCH,
    };
    for candidate in candidates {
        if candidate.mask.name {
            out.name = candidate.name;
        }
        if candidate.mask.ext {
            out.ext = candidate.ext;
        }
        if candidate.mask.content_type {
            out.content_type = candidate.content_type;
        }
        if candidate.mask.is_dir {
            out.is_dir = candidate.is_dir.unwrap_or(false);
        }
        if candidate.mask.updated_at {
            if let Some(at) = candidate.updated_at {
                out.updated_at = at;
            }
        }
    }
    Some(out)
}
