//! Note domain model.
//!
//! # Responsibility
//! - Define the structured row shape the projection reads from the store.
//! - Define serializable listing projections for callers outside the
//!   filesystem (CLI output).
//!
//! # Invariants
//! - Every note is identified by its store primary key (`NoteId`).
//! - Body length is derived from the body bytes, never stored separately.

pub mod note;
