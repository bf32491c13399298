//! Projection error type and its filesystem-visible mapping.
//!
//! # Invariants
//! - Absence (`InvalidPath`, `NotFound`) maps to `ENOENT`.
//! - Failures (`ConsistencyFault`, `Store`) map to `EIO` and are never
//!   reported as absence.

use crate::db::DbError;
use crate::model::note::NoteId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type NoteFsResult<T> = Result<T, NoteFsError>;

#[derive(Debug)]
pub enum NoteFsError {
    /// Path does not match `/<digits>[suffix].txt`.
    InvalidPath(String),
    /// No note row exists for the identifier.
    NotFound(NoteId),
    /// Bulk hydration returned a row that the identifier listing did not.
    ConsistencyFault(NoteId),
    /// Byte offset or body length beyond what a note body may hold.
    OutOfRange(u64),
    /// Backing store failure.
    Store(DbError),
}

impl NoteFsError {
    /// Errno reported to the filesystem dispatcher.
    pub fn errno(&self) -> i32 {
        match self {
            Self::InvalidPath(_) | Self::NotFound(_) => libc::ENOENT,
            Self::OutOfRange(_) => libc::EFBIG,
            Self::ConsistencyFault(_) | Self::Store(_) => libc::EIO,
        }
    }

    /// Whether the error means "no such entry" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::InvalidPath(_) | Self::NotFound(_))
    }
}

impl Display for NoteFsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPath(path) => write!(f, "invalid note path: `{path}`"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::ConsistencyFault(id) => write!(
                f,
                "note {id} was hydrated but missing from the identifier listing"
            ),
            Self::OutOfRange(value) => write!(f, "byte offset or length {value} is out of range"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteFsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for NoteFsError {
    fn from(value: DbError) -> Self {
        Self::Store(value)
    }
}

impl From<rusqlite::Error> for NoteFsError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(DbError::Sqlite(value))
    }
}
