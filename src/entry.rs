//! Entry metadata views.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::id::EntryId;

/// Content type reported for directories with no stored type.
pub const DIRECTORY_CONTENT_TYPE: &str = "inode/directory";

/// Metadata for one file or directory entry, either current ([`stat`])
/// or reconstructed ([`stat_at`]).
///
/// [`stat`]: crate::store::Drive::stat
/// [`stat_at`]: crate::store::Drive::stat_at
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryInfo {
    id: EntryId,
    name: String,
    content_type: String,
    is_dir: bool,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl EntryInfo {
    pub(crate) fn new(
        id: EntryId,
        name: String,
        content_type: Option<String>,
        is_dir: bool,
        updated_at: DateTime<Utc>,
        version: i64,
    ) -> Self {
        let content_type = match content_type {
            Some(mime) => mime,
            None if is_dir => DIRECTORY_CONTENT_TYPE.to_owned(),
            None => String::new(),
        };
        EntryInfo {
            id,
            name,
            content_type,
            is_dir,
            updated_at,
            version,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Composed display name: base and extension joined with the
    /// separator when an extension is present.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Timestamp of the mutation that produced this state.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Version this state belongs to.
    pub fn version(&self) -> i64 {
        self.version
    }
}
