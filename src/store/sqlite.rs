//! SQLite-backed drive store.
//!
//! One `entries` row per live entry plus an append-only `entries_at`
//! delta log. Schema triggers append the log rows: every guarded
//! version bump records the pre-mutation values of the fields it
//! changed, tagged with the version they held at, so application code
//! cannot forget to log.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{named_params, params, Connection, InterruptHandle};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entry::EntryInfo;
use crate::error::{DriveError, Result};
use crate::id::EntryId;
use crate::name;
use crate::snapshot::{self, Candidate, FieldMask};
use crate::store::Drive;

/// Idempotent schema: tables, validity checks, and the delta-log
/// triggers. Validation lives in the schema; constraint violations
/// surface as [`DriveError::Conflict`].
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS entries (
    id          TEXT PRIMARY KEY,
    parent      TEXT REFERENCES entries (id),
    name        TEXT,
    ext         TEXT,
    mime        TEXT,
    is_dir      INTEGER NOT NULL DEFAULT 0,
    updated_at  TEXT NOT NULL,
    v           INTEGER NOT NULL DEFAULT 0 CHECK (v >= 0),

    -- a name must survive decomposition
    CHECK (name IS NOT NULL OR ext IS NOT NULL),
    -- directories carry a whole name and no content type
    CHECK (is_dir = 0 OR (name IS NOT NULL AND mime IS NULL)),
    -- files always declare a content type
    CHECK (is_dir = 1 OR (mime IS NOT NULL AND length(mime) > 0))
);

CREATE INDEX IF NOT EXISTS entries_parent_idx ON entries (parent);

CREATE TABLE IF NOT EXISTS entries_at (
    id          TEXT NOT NULL REFERENCES entries (id),
    v           INTEGER NOT NULL,
    name        TEXT,
    ext         TEXT,
    mime        TEXT,
    is_dir      INTEGER,
    updated_at  TEXT,
    mask        INTEGER NOT NULL,
    PRIMARY KEY (id, v)
);

-- the parent of any entry must be a directory
CREATE TRIGGER IF NOT EXISTS entries_parent_is_dir_insert
BEFORE INSERT ON entries
WHEN NEW.parent IS NOT NULL
BEGIN
    SELECT RAISE(ABORT, 'parent is not a directory')
    WHERE (SELECT is_dir FROM entries WHERE id = NEW.parent) IS NOT 1;
END;

CREATE TRIGGER IF NOT EXISTS entries_parent_is_dir_update
BEFORE UPDATE OF parent ON entries
WHEN NEW.parent IS NOT NULL
BEGIN
    SELECT RAISE(ABORT, 'parent is not a directory')
    WHERE (SELECT is_dir FROM entries WHERE id = NEW.parent) IS NOT 1;
END;

-- is_dir is fixed at creation
CREATE TRIGGER IF NOT EXISTS entries_is_dir_frozen
BEFORE UPDATE OF is_dir ON entries
WHEN OLD.is_dir IS NOT NEW.is_dir
BEGIN
    SELECT RAISE(ABORT, 'is_dir is immutable');
END;

-- every version bump appends the pre-mutation values of the fields it
-- changed, tagged with the version they held at
CREATE TRIGGER IF NOT EXISTS entries_log_version
AFTER UPDATE ON entries
WHEN NEW.v = OLD.v + 1
BEGIN
    INSERT INTO entries_at (id, v, name, ext, mime, is_dir, updated_at, mask)
    VALUES (
        OLD.id, OLD.v, OLD.name, OLD.ext, OLD.mime, OLD.is_dir, OLD.updated_at,
          (OLD.name IS NOT NEW.name)
        + (OLD.ext IS NOT NEW.ext) * 2
        + (OLD.mime IS NOT NEW.mime) * 4
        + (OLD.is_dir IS NOT NEW.is_dir) * 8
        + (OLD.updated_at IS NOT NEW.updated_at) * 16
    );
END;
";

/// Store tuning knobs, deserializable from application config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreOptions {
    /// How long a statement waits on a locked database before failing
    /// (default: 5000).
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Use write-ahead logging; on-disk stores only (default: true).
    #[serde(default = "default_true")]
    pub wal: bool,
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            busy_timeout_ms: default_busy_timeout_ms(),
            wal: default_true(),
        }
    }
}

/// Drive metadata store over an embedded SQLite database.
///
/// The handle is `Send + Sync`; operations from any thread serialize at
/// the connection, while cross-handle correctness comes from the version
/// guard, not the mutex.
#[derive(Debug)]
pub struct SqliteDrive {
    conn: Mutex<Connection>,
}

impl SqliteDrive {
    /// Open (creating if needed) an on-disk store with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &StoreOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: &StoreOptions) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        if options.wal {
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        }
        Self::init(conn, options)
    }

    /// Open a private in-memory store; used by tests and callers that
    /// do not need persistence.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, &StoreOptions::default())
    }

    fn init(conn: Connection, options: &StoreOptions) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))?;
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteDrive {
            conn: Mutex::new(conn),
        })
    }

    /// Handle for aborting an in-flight statement from another thread.
    /// An interrupted statement surfaces as [`DriveError::Internal`].
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.conn.lock().get_interrupt_handle()
    }
}

impl Drive for SqliteDrive {
    fn make_directory(&self, name: &str, parent: EntryId) -> Result<EntryId> {
        let created = EntryId::generate();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO entries (id, parent, name, is_dir, updated_at, v)
             VALUES (?1, ?2, ?3, 1, ?4, 0)",
            params![
                created,
                db_parent(parent),
                name::none_if_empty(name),
                Utc::now()
            ],
        )?;
        Ok(created)
    }

    fn create_file(&self, filename: &str, content_type: &str, parent: EntryId) -> Result<EntryId> {
        let created = EntryId::generate();
        let (base, ext) = name::split(filename);
        debug!(?base, ?ext, "decomposed filename");
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO entries (id, parent, name, ext, mime, is_dir, updated_at, v)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, 0)",
            params![
                created,
                db_parent(parent),
                base,
                ext,
                name::none_if_empty(content_type),
                Utc::now()
            ],
        )?;
        Ok(created)
    }

    fn rename(
        &self,
        new_name: &str,
        is_directory: bool,
        id: EntryId,
        expected_version: i64,
    ) -> Result<()> {
        let conn = self.conn.lock();
        let affected = if is_directory {
            conn.execute(
                "UPDATE entries SET name = ?1, updated_at = ?2, v = v + 1
                 WHERE id = ?3 AND v = ?4",
                params![
                    name::none_if_empty(new_name),
                    Utc::now(),
                    id,
                    expected_version
                ],
            )?
        } else {
            let (base, ext) = name::split(new_name);
            debug!(?base, ?ext, "decomposed filename");
            conn.execute(
                "UPDATE entries SET name = ?1, ext = ?2, updated_at = ?3, v = v + 1
                 WHERE id = ?4 AND v = ?5",
                params![base, ext, Utc::now(), id, expected_version],
            )?
        };
        guard_affected(&conn, id, affected)
    }

    fn move_entry(&self, new_parent: EntryId, id: EntryId, expected_version: i64) -> Result<()> {
        let conn = self.conn.lock();
        let affected = conn.execute(
            "UPDATE entries SET parent = ?1, updated_at = ?2, v = v + 1
             WHERE id = ?3 AND v = ?4",
            params![db_parent(new_parent), Utc::now(), id, expected_version],
        )?;
        guard_affected(&conn, id, affected)
    }

    fn stat(&self, id: EntryId) -> Result<EntryInfo> {
        let conn = self.conn.lock();
        let (base, ext, mime, is_dir, updated_at, version) = conn.query_row(
            "SELECT name, ext, mime, is_dir, updated_at, v FROM entries WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, DateTime<Utc>>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            },
        )?;
        Ok(EntryInfo::new(
            id,
            name::compose(base.as_deref(), ext.as_deref()),
            mime,
            is_dir,
            updated_at,
            version,
        ))
    }

    fn stat_at(&self, id: EntryId, version: i64) -> Result<EntryInfo> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "WITH history AS (
                 SELECT name, ext, mime, is_dir, updated_at, v, :full AS mask
                 FROM entries WHERE id = :id
                 UNION ALL
                 SELECT name, ext, mime, is_dir, updated_at, v, mask
                 FROM entries_at WHERE id = :id AND v >= :version
             )
             SELECT name, ext, mime, is_dir, updated_at, v, mask
             FROM history ORDER BY v DESC",
        )?;
        let candidates = stmt
            .query_map(
                named_params! {
                    ":id": id,
                    ":version": version,
                    ":full": FieldMask::FULL.bits(),
                },
                |row| {
                    Ok(Candidate {
                        name: row.get(0)?,
                        ext: row.get(1)?,
                        content_type: row.get(2)?,
                        is_dir: row.get(3)?,
                        updated_at: row.get(4)?,
                        version: row.get(5)?,
                        mask: FieldMask::from_bits(row.get(6)?),
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(candidates = candidates.len(), version, "reconstructing entry");
        let restored = snapshot::restore(candidates).ok_or(DriveError::NotFound)?;
        Ok(EntryInfo::new(
            id,
            name::compose(restored.name.as_deref(), restored.ext.as_deref()),
            restored.content_type,
            restored.is_dir,
            restored.updated_at,
            version.clamp(0, restored.latest),
        ))
    }
}

/// Root is stored as SQL NULL in the parent column.
fn db_parent(parent: EntryId) -> Option<EntryId> {
    if parent.is_root() {
        None
    } else {
        Some(parent)
    }
}

/// A guarded update that touched no rows is either a missing entry or a
/// stale version; tell the two apart so callers know whether a retry
/// can help.
fn guard_affected(conn: &Connection, id: EntryId, affected: usize) -> Result<()> {
    if affected > 0 {
        return Ok(());
    }
    let exists: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM entries WHERE id = ?1)",
        params![id],
        |row| row.get(0),
    )?;
    if exists {
        Err(DriveError::Conflict)
    } else {
        Err(DriveError::NotFound)
    }
}
