//! Note row and listing records.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Store primary key of a note (`ZNOTE.Z_PK`).
pub type NoteId = i64;

/// One note row joined with its body, as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    pub id: NoteId,
    pub title: String,
    pub author: String,
    pub summary: String,
    /// Raw body bytes. Empty when the note has no body row.
    pub body: Vec<u8>,
    pub created_at: SystemTime,
    pub modified_at: SystemTime,
}

impl NoteRecord {
    /// Creates a record with empty text fields and both timestamps at the
    /// Unix epoch.
    pub fn new(id: NoteId) -> Self {
        Self {
            id,
            title: String::new(),
            author: String::new(),
            summary: String::new(),
            body: Vec::new(),
            created_at: UNIX_EPOCH,
            modified_at: UNIX_EPOCH,
        }
    }

    /// Body length in bytes.
    pub fn body_len(&self) -> u64 {
        self.body.len() as u64
    }
}

/// Serializable view of one listed note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: NoteId,
    pub filename: String,
    pub title: String,
    pub author: String,
    pub summary: String,
    /// Body length in bytes.
    pub size: u64,
    /// Modification time in Unix epoch seconds.
    pub modified: f64,
}

impl NoteSummary {
    pub(crate) fn from_record(record: &NoteRecord, filename: String) -> Self {
        Self {
            id: record.id,
            filename,
            title: record.title.clone(),
            author: record.author.clone(),
            summary: record.summary.clone(),
            size: record.body_len(),
            modified: epoch_seconds(record.modified_at),
        }
    }
}

fn epoch_seconds(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs_f64(),
        Err(before) => -before.duration().as_secs_f64(),
    }
}
