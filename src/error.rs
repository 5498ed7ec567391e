//! Error taxonomy for drive operations.
//!
//! Storage failures are translated at the repository boundary; no raw
//! SQLite error reaches callers untagged.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DriveError>;

#[derive(Debug, Error)]
pub enum DriveError {
    /// The referenced entry identifier has no current row.
    #[error("drive: not found")]
    NotFound,

    /// Stale optimistic version, referential-integrity violation, or a
    /// domain validation failure (empty name, empty content type,
    /// degenerate name decomposition, non-directory parent).
    ///
    /// Retryable only for the stale-version cause, after re-reading the
    /// current version.
    #[error("drive: conflict")]
    Conflict,

    /// Any other storage failure, surfaced unchanged.
    #[error("drive: {0}")]
    Internal(#[source] rusqlite::Error),
}

impl From<rusqlite::Error> for DriveError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => DriveError::NotFound,
            rusqlite::Error::SqliteFailure(cause, _)
                if cause.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DriveError::Conflict
            }
            other => DriveError::Internal(other),
        }
    }
}
