//! Store access contracts and the SQLite implementation.
//!
//! # Responsibility
//! - Define the four statement shapes the projection issues.
//! - Isolate SQL and connection handling from entity/adapter logic.
//!
//! # Invariants
//! - Every call is one unit of work: one connection, one statement, one
//!   commit.
//! - Rows are decoded by column name into `NoteRecord`; shape mismatches
//!   are rejected as `DbError::InvalidRow`.

pub mod note_store;
