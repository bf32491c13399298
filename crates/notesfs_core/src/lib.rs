//! Projection of a SQLite note store as a flat directory of text files.
//!
//! Each note row becomes `/<0000id>-<title>.txt`; reads, writes and
//! truncates on that file become whole-body replacements in the store.

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod fs;
pub mod logging;
pub mod model;
pub mod path_codec;
pub mod projection;
pub mod repo;

#[cfg(any(test, feature = "test-util"))]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use config::{FsConfig, TimestampEpoch};
pub use error::{NoteFsError, NoteFsResult};
pub use fs::{DirEntry, FileAttr, FileKind, NotesFs};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::note::{NoteId, NoteRecord, NoteSummary};
pub use projection::collection::NoteCollection;
pub use projection::note::Note;
pub use projection::ProjectionContext;
pub use repo::note_store::{NoteStore, SqliteNoteStore};

use std::path::Path;
use std::sync::Arc;

/// Opens the store at `db_path` and builds the filesystem adapter on the
/// process clock.
pub fn open_notes_fs(db_path: impl AsRef<Path>, config: &FsConfig) -> NoteFsResult<NotesFs> {
    let store = SqliteNoteStore::open(db_path, config)?;
    let ctx = ProjectionContext::with_system_clock(Arc::new(store), config);
    Ok(NotesFs::new(ctx, config))
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
