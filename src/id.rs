//! Entry identifiers.
//!
//! UUIDv7 values: globally unique and roughly sortable by creation time.
//! The nil UUID is the root sentinel, meaning "no parent".

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a drive entry. Immutable for the entry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Sentinel for "no parent": the root of the drive.
    pub const ROOT: EntryId = EntryId(Uuid::nil());

    /// Generate a new creation-time-ordered identifier.
    pub fn generate() -> Self {
        EntryId(Uuid::now_v7())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s).map(EntryId)
    }
}

impl ToSql for EntryId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for EntryId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Uuid::parse_str(text)
            .map(EntryId)
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_root() {
        assert!(EntryId::ROOT.is_root());
        assert!(!EntryId::generate().is_root());
    }

    #[test]
    fn test_generated_ids_are_time_ordered() {
        let first = EntryId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = EntryId::generate();
        assert!(first < second);
    }

    #[test]
    fn test_display_parse_round_trip() {
        let id = EntryId::generate();
        let parsed: EntryId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
