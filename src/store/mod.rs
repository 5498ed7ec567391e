//! Drive store contract.
//!
//! Callers depend on this interface; [`SqliteDrive`] is the provided
//! implementation over an embedded SQLite database.

pub mod sqlite;

use crate::entry::EntryInfo;
use crate::error::Result;
use crate::id::EntryId;

pub use sqlite::{SqliteDrive, StoreOptions};

/// Operation set of the drive metadata store.
///
/// Mutations take the caller's believed current version and fail with
/// [`Conflict`] when it is stale; exactly one of any set of concurrent
/// mutations wins a given version number.
///
/// [`Conflict`]: crate::error::DriveError::Conflict
pub trait Drive: Send + Sync {
    /// Create a directory under `parent`; [`EntryId::ROOT`] means the
    /// top level. Directory names are stored whole, never decomposed.
    fn make_directory(&self, name: &str, parent: EntryId) -> Result<EntryId>;

    /// Create a file entry. `filename` is split into base and extension
    /// on the first separator; `content_type` must be non-empty.
    fn create_file(&self, filename: &str, content_type: &str, parent: EntryId) -> Result<EntryId>;

    /// Rename an entry. Directories keep the whole name; file names are
    /// split like [`Drive::create_file`].
    fn rename(
        &self,
        new_name: &str,
        is_directory: bool,
        id: EntryId,
        expected_version: i64,
    ) -> Result<()>;

    /// Re-parent an entry; [`EntryId::ROOT`] moves it to the top level.
    fn move_entry(&self, new_parent: EntryId, id: EntryId, expected_version: i64) -> Result<()>;

    /// Current metadata for an entry.
    fn stat(&self, id: EntryId) -> Result<EntryInfo>;

    /// Metadata for an entry as it existed at `version`.
    fn stat_at(&self, id: EntryId, version: i64) -> Result<EntryInfo>;
}
