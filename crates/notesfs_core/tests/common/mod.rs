#![allow(dead_code)]

use notesfs_core::db::migrations::install_schema;
use notesfs_core::{FsConfig, ManualClock, NoteId, NotesFs, ProjectionContext, SqliteNoteStore};
use rusqlite::{params, Connection};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const CREATED_AT: f64 = 1_000.0;
pub const MODIFIED_AT: f64 = 2_000.0;

/// Note store in a temporary directory.
pub struct StoreFixture {
    _dir: TempDir,
    pub path: PathBuf,
}

impl StoreFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.sqlite");
        let mut conn = Connection::open(&path).unwrap();
        install_schema(&mut conn).unwrap();
        Self { _dir: dir, path }
    }

    pub fn with_notes(notes: &[(NoteId, &str, &str)]) -> Self {
        let fixture = Self::new();
        for (id, title, body) in notes {
            fixture.insert_note(*id, title, body);
        }
        fixture
    }

    pub fn conn(&self) -> Connection {
        Connection::open(&self.path).unwrap()
    }

    pub fn insert_note(&self, id: NoteId, title: &str, body: &str) {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO ZNOTEBODY (Z_PK, ZCONTENT) VALUES (?1, ?2);",
            params![id, body],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO ZNOTE (
                Z_PK, ZTITLE, ZAUTHOR, ZSUMMARY, ZBODY, ZCREATIONDATE, ZMODIFICATIONDATE
             ) VALUES (?1, ?2, 'tester', 'summary', ?1, ?3, ?4);",
            params![id, title, CREATED_AT, MODIFIED_AT],
        )
        .unwrap();
    }

    /// Note row without any body row.
    pub fn insert_bodyless_note(&self, id: NoteId, title: &str) {
        self.conn()
            .execute(
                "INSERT INTO ZNOTE (Z_PK, ZTITLE, ZBODY) VALUES (?1, ?2, NULL);",
                params![id, title],
            )
            .unwrap();
    }

    /// Mutates a body behind the projection's back.
    pub fn set_body(&self, id: NoteId, body: &str) {
        self.conn()
            .execute(
                "UPDATE ZNOTEBODY SET ZCONTENT = ?1 WHERE Z_PK = (SELECT ZBODY FROM ZNOTE WHERE Z_PK = ?2);",
                params![body, id],
            )
            .unwrap();
    }

    pub fn body(&self, id: NoteId) -> Vec<u8> {
        self.conn()
            .query_row(
                "SELECT CAST(ZCONTENT AS BLOB) FROM ZNOTEBODY WHERE Z_PK = (SELECT ZBODY FROM ZNOTE WHERE Z_PK = ?1);",
                [id],
                |row| row.get(0),
            )
            .unwrap()
    }

    pub fn store(&self) -> Arc<SqliteNoteStore> {
        Arc::new(SqliteNoteStore::open(&self.path, &FsConfig::default()).unwrap())
    }

    pub fn context(&self, clock: Arc<ManualClock>) -> ProjectionContext {
        ProjectionContext::new(self.store(), clock, &FsConfig::default())
    }

    pub fn notes_fs(&self) -> (NotesFs, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let fs = NotesFs::new(self.context(clock.clone()), &FsConfig::default());
        (fs, clock)
    }
}
