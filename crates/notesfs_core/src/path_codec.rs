//! Mapping between virtual file paths and note identifiers.
//!
//! # Responsibility
//! - Decode `/<digits>[suffix].txt` paths into note ids.
//! - Encode note ids and titles into canonical filenames.
//!
//! # Invariants
//! - Only the leading digit run is authoritative; any suffix is ignored.
//! - Decoding is case-insensitive and runs on the normalized path.

use crate::error::{NoteFsError, NoteFsResult};
use crate::model::note::NoteId;
use once_cell::sync::Lazy;
use path_clean::PathClean;
use regex::Regex;
use std::path::Path;

static NOTE_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/(\d+)[^/]*\.txt$").expect("valid note path regex"));

/// Decodes a virtual file path into a note identifier.
///
/// # Errors
/// - `InvalidPath` when the normalized, lower-cased path does not match
///   `/<digits>[suffix].txt` or the digit run does not fit a `NoteId`.
pub fn decode(path: &str) -> NoteFsResult<NoteId> {
    let normalized = normalize(path);
    NOTE_PATH_RE
        .captures(&normalized)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse::<NoteId>().ok())
        .ok_or_else(|| NoteFsError::InvalidPath(path.to_string()))
}

/// Encodes the canonical filename `"<0000id>-<title>.txt"`.
pub fn encode(id: NoteId, title: &str) -> String {
    format!("{id:04}-{title}.txt")
}

/// Resolves `.`/`..`, collapses separators and lower-cases the path.
fn normalize(path: &str) -> String {
    Path::new(path)
        .clean()
        .to_string_lossy()
        .to_lowercase()
}
