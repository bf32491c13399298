//! Note store contract and SQLite implementation.
//!
//! # Responsibility
//! - Read notes joined with their bodies, singly or in bulk, and list ids.
//! - Replace a note body as one whole value.
//!
//! # Invariants
//! - Bodies are written as TEXT when valid UTF-8, BLOB otherwise, and read
//!   back as bytes either way.
//! - Idle connection reuse never changes the per-call commit discipline.

use crate::config::{FsConfig, TimestampEpoch};
use crate::db::{open_db, DbError, DbResult};
use crate::model::note::{NoteId, NoteRecord};
use log::{debug, error};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, Connection, Row, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

const NOTE_SELECT_SQL: &str = "SELECT
    ZNOTE.Z_PK AS id,
    ZNOTE.ZTITLE AS title,
    ZNOTE.ZAUTHOR AS author,
    ZNOTE.ZSUMMARY AS summary,
    ZNOTEBODY.ZCONTENT AS body,
    ZNOTE.ZCREATIONDATE AS created_at,
    ZNOTE.ZMODIFICATIONDATE AS modified_at
FROM ZNOTE
LEFT JOIN ZNOTEBODY ON ZNOTE.ZBODY = ZNOTEBODY.Z_PK";

/// Persistence contract consumed by entities and collections.
pub trait NoteStore: Send + Sync {
    /// Fetches one note joined with its body.
    fn fetch_note(&self, id: NoteId) -> DbResult<Option<NoteRecord>>;
    /// Lists every note identifier.
    fn list_note_ids(&self) -> DbResult<Vec<NoteId>>;
    /// Fetches every note joined with its body in one statement.
    fn fetch_all_notes(&self) -> DbResult<Vec<NoteRecord>>;
    /// Replaces the full body of one note.
    ///
    /// Returns `false` when no body row matched the note.
    fn replace_body(&self, id: NoteId, body: &[u8]) -> DbResult<bool>;
}

/// SQLite-backed note store addressed by file path.
pub struct SqliteNoteStore {
    path: PathBuf,
    epoch: TimestampEpoch,
    max_idle: usize,
    idle: Mutex<Vec<Connection>>,
}

impl SqliteNoteStore {
    /// Opens the store once to validate it, keeping that connection idle.
    pub fn open(path: impl AsRef<Path>, config: &FsConfig) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = open_db(&path)?;
        let store = Self {
            path,
            epoch: config.timestamp_epoch,
            max_idle: config.max_idle_connections,
            idle: Mutex::new(Vec::new()),
        };
        store.release(conn);
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs one statement inside its own committed transaction.
    fn unit_of_work<T>(
        &self,
        event: &'static str,
        work: impl FnOnce(&Transaction<'_>) -> DbResult<T>,
    ) -> DbResult<T> {
        let started_at = Instant::now();
        let mut conn = self.acquire()?;

        let result = run_committed(&mut conn, work);

        match &result {
            Ok(_) => debug!(
                "event={event} module=store status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event={event} module=store status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }

        if result.is_ok() {
            self.release(conn);
        }
        result
    }

    fn acquire(&self) -> DbResult<Connection> {
        let reused = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        match reused {
            Some(conn) => Ok(conn),
            None => open_db(&self.path),
        }
    }

    fn release(&self, conn: Connection) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(conn);
        }
    }

    fn decode_row(&self, row: &Row<'_>) -> DbResult<NoteRecord> {
        let id: NoteId = row.get("id")?;
        Ok(NoteRecord {
            id,
            title: optional_text(row, "title")?,
            author: optional_text(row, "author")?,
            summary: optional_text(row, "summary")?,
            body: body_bytes(row, id)?,
            created_at: self.timestamp(row, "created_at", id)?,
            modified_at: self.timestamp(row, "modified_at", id)?,
        })
    }

    fn timestamp(&self, row: &Row<'_>, column: &str, id: NoteId) -> DbResult<SystemTime> {
        match row.get_ref(column)? {
            ValueRef::Null => Ok(UNIX_EPOCH),
            ValueRef::Integer(seconds) => Ok(self.epoch.to_system_time(seconds as f64)),
            ValueRef::Real(seconds) => Ok(self.epoch.to_system_time(seconds)),
            ValueRef::Text(_) | ValueRef::Blob(_) => Err(DbError::InvalidRow(format!(
                "note {id} column `{column}` is not a numeric timestamp"
            ))),
        }
    }
}

impl NoteStore for SqliteNoteStore {
    fn fetch_note(&self, id: NoteId) -> DbResult<Option<NoteRecord>> {
        self.unit_of_work("note_fetch", |tx| {
            let mut stmt = tx.prepare(&format!("{NOTE_SELECT_SQL} WHERE ZNOTE.Z_PK = ?1;"))?;
            let mut rows = stmt.query([id])?;
            if let Some(row) = rows.next()? {
                return Ok(Some(self.decode_row(row)?));
            }
            Ok(None)
        })
    }

    fn list_note_ids(&self) -> DbResult<Vec<NoteId>> {
        self.unit_of_work("note_list_ids", |tx| {
            let mut stmt = tx.prepare("SELECT Z_PK FROM ZNOTE;")?;
            let mut rows = stmt.query([])?;
            let mut ids: Vec<NoteId> = Vec::new();
            while let Some(row) = rows.next()? {
                ids.push(row.get(0)?);
            }
            Ok(ids)
        })
    }

    fn fetch_all_notes(&self) -> DbResult<Vec<NoteRecord>> {
        self.unit_of_work("note_fetch_all", |tx| {
            let mut stmt = tx.prepare(&format!("{NOTE_SELECT_SQL};"))?;
            let mut rows = stmt.query([])?;
            let mut notes = Vec::new();
            while let Some(row) = rows.next()? {
                notes.push(self.decode_row(row)?);
            }
            Ok(notes)
        })
    }

    fn replace_body(&self, id: NoteId, body: &[u8]) -> DbResult<bool> {
        let content = match std::str::from_utf8(body) {
            Ok(text) => Value::Text(text.to_string()),
            Err(_) => Value::Blob(body.to_vec()),
        };
        self.unit_of_work("note_replace_body", |tx| {
            let changed = tx.execute(
                "UPDATE ZNOTEBODY
                 SET ZCONTENT = ?1
                 WHERE ZNOTEBODY.Z_PK = (
                    SELECT ZNOTE.ZBODY
                    FROM ZNOTE
                    WHERE ZNOTE.Z_PK = ?2
                 );",
                params![content, id],
            )?;
            Ok(changed > 0)
        })
    }
}

fn run_committed<T>(
    conn: &mut Connection,
    work: impl FnOnce(&Transaction<'_>) -> DbResult<T>,
) -> DbResult<T> {
    let tx = conn.transaction()?;
    let value = work(&tx)?;
    tx.commit()?;
    Ok(value)
}

fn optional_text(row: &Row<'_>, column: &str) -> DbResult<String> {
    let value: Option<String> = row.get(column)?;
    Ok(value.unwrap_or_default())
}

fn body_bytes(row: &Row<'_>, id: NoteId) -> DbResult<Vec<u8>> {
    match row.get_ref("body")? {
        ValueRef::Null => Ok(Vec::new()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Ok(bytes.to_vec()),
        ValueRef::Integer(_) | ValueRef::Real(_) => Err(DbError::InvalidRow(format!(
            "note {id} body is not text or blob"
        ))),
    }
}
