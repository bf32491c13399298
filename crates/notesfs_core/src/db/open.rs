//! Connection bootstrap utilities for the note store.
//!
//! # Responsibility
//! - Open existing SQLite note stores.
//! - Configure connection pragmas required by the projection.
//! - Reject stores that lack the tables/columns the queries rely on.
//!
//! # Invariants
//! - Returned connections have a busy timeout set.
//! - Returned connections point at a store with `ZNOTE` and `ZNOTEBODY`.

use super::migrations::install_schema;
use super::{DbError, DbResult};
use log::{debug, error};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "ZNOTE",
        &[
            "Z_PK",
            "ZTITLE",
            "ZAUTHOR",
            "ZSUMMARY",
            "ZBODY",
            "ZCREATIONDATE",
            "ZMODIFICATIONDATE",
        ],
    ),
    ("ZNOTEBODY", &["Z_PK", "ZCONTENT"]),
];

/// Opens an existing note store file and checks its schema.
///
/// The file must already exist; use [`create_store`] to make a new one.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let started_at = Instant::now();
    debug!("event=db_open module=db status=start");

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = match Connection::open_with_flags(path, flags) {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&conn) {
        Ok(()) => {
            debug!(
                "event=db_open module=db status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Creates a new note store file with the current schema installed.
///
/// Fails if the file already exists.
pub fn create_store(path: impl AsRef<Path>) -> DbResult<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let path = path.as_ref();
    if path.exists() {
        return Err(DbError::StoreExists(path.to_path_buf()));
    }
    let mut conn = Connection::open_with_flags(path, flags)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    install_schema(&mut conn)?;
    debug!("event=db_create module=db status=ok");
    Ok(conn)
}

/// Verifies that every table and column the projection queries exists.
pub fn ensure_store_ready(conn: &Connection) -> DbResult<()> {
    for (table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(DbError::MissingRequiredTable(table));
        }
        for column in columns.iter() {
            if !table_has_column(conn, table, column)? {
                return Err(DbError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}

fn bootstrap_connection(conn: &Connection) -> DbResult<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    ensure_store_ready(conn)
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> DbResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current.eq_ignore_ascii_case(column) {
            return Ok(true);
        }
    }
    Ok(false)
}
