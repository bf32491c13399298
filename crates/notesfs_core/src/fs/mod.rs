//! Path-based filesystem operation contract over the note projection.
//!
//! # Responsibility
//! - Answer attribute, listing, read, write and truncate requests by path.
//! - Keep the root directory and the note files as the only two kinds.
//! - Map notes to stable inode numbers for inode-based dispatchers.
//!
//! # Invariants
//! - Every per-path request builds its own fresh `Note`; nothing is shared
//!   between requests except the listing collection.
//! - Absence surfaces as `ENOENT`; store failures surface as `EIO`.
//! - Xattrs and non-size attribute changes are accepted as no-ops; notes
//!   are never created or deleted through the filesystem.

use crate::config::FsConfig;
use crate::error::{NoteFsError, NoteFsResult};
use crate::model::note::NoteId;
use crate::path_codec;
use crate::projection::collection::NoteCollection;
use crate::projection::note::Note;
use crate::projection::ProjectionContext;
use log::{debug, warn};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

#[cfg(feature = "fuse")]
pub mod fuse;

/// Inode number.
pub type Ino = u64;

/// Inode of the root directory.
pub const ROOT_INO: Ino = 1;
/// Note `id` lives at inode `id + NOTE_INO_OFFSET`.
pub const NOTE_INO_OFFSET: u64 = 1;

pub const ROOT_PATH: &str = "/";
pub const DIR_PERM: u16 = 0o755;
pub const FILE_PERM: u16 = 0o666;
const DIR_NLINK: u32 = 2;
const FILE_NLINK: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    RegularFile,
}

/// Attribute descriptor returned by [`NotesFs::attributes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttr {
    pub ino: Ino,
    pub kind: FileKind,
    pub size: u64,
    pub perm: u16,
    pub nlink: u32,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    pub crtime: SystemTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub ino: Ino,
    pub name: String,
    pub kind: FileKind,
}

impl DirEntry {
    fn directory(name: &str) -> Self {
        Self {
            ino: ROOT_INO,
            name: name.to_string(),
            kind: FileKind::Directory,
        }
    }
}

/// Inode number of a note.
pub fn note_ino(id: NoteId) -> Ino {
    (id as u64).wrapping_add(NOTE_INO_OFFSET)
}

/// Path that decodes back to the note stored at `ino`.
///
/// Returns `None` for the root inode and for inode 0.
pub fn path_for_ino(ino: Ino) -> Option<String> {
    if ino <= ROOT_INO {
        return None;
    }
    let id = NoteId::try_from(ino - NOTE_INO_OFFSET).ok()?;
    Some(format!("/{id}.txt"))
}

/// Filesystem adapter over one note store.
pub struct NotesFs {
    ctx: ProjectionContext,
    notes: Mutex<NoteCollection>,
    attr_ttl: Duration,
}

impl NotesFs {
    pub fn new(ctx: ProjectionContext, config: &FsConfig) -> Self {
        Self {
            notes: Mutex::new(NoteCollection::new(ctx.clone())),
            ctx,
            attr_ttl: config.attr_ttl,
        }
    }

    /// Kernel-side cache TTL for attributes and entries.
    pub fn attr_ttl(&self) -> Duration {
        self.attr_ttl
    }

    fn note_at(&self, path: &str) -> NoteFsResult<Note> {
        let id = path_codec::decode(path)?;
        Ok(Note::new(self.ctx.clone(), id))
    }

    /// Attributes of the root directory or a note file.
    ///
    /// # Errors
    /// - `InvalidPath`/`NotFound` for paths that name no note (`ENOENT`).
    /// - `Store` when the lookup itself failed (`EIO`).
    pub fn attributes(&self, path: &str) -> NoteFsResult<FileAttr> {
        let now = self.ctx.clock().wall();
        if path == ROOT_PATH {
            return Ok(FileAttr {
                ino: ROOT_INO,
                kind: FileKind::Directory,
                size: 0,
                perm: DIR_PERM,
                nlink: DIR_NLINK,
                atime: now,
                mtime: now,
                ctime: now,
                crtime: now,
            });
        }

        let result = self.note_at(path).and_then(|mut note| {
            let size = note.size()?;
            let mtime = note.modified()?;
            let crtime = note.created()?;
            Ok(FileAttr {
                ino: note_ino(note.id()),
                kind: FileKind::RegularFile,
                size,
                perm: FILE_PERM,
                nlink: FILE_NLINK,
                atime: now,
                mtime,
                ctime: mtime,
                crtime,
            })
        });

        if let Err(err) = &result {
            if !err.is_not_found() {
                warn!(
                    "event=fs_getattr module=fs status=error errno={} error={}",
                    err.errno(),
                    err
                );
            }
        }
        result
    }

    /// Lists the root directory: `.`, `..`, then one entry per note.
    ///
    /// # Errors
    /// - `InvalidPath` for any path other than the root; nothing is
    ///   synchronized in that case.
    /// - `ConsistencyFault`/`Store` from the collection synchronization.
    pub fn list_directory(&self, path: &str) -> NoteFsResult<Vec<DirEntry>> {
        if path != ROOT_PATH {
            return Err(NoteFsError::InvalidPath(path.to_string()));
        }

        let mut notes = self.notes.lock().unwrap_or_else(PoisonError::into_inner);
        notes.synchronize()?;

        let mut entries = Vec::with_capacity(notes.len() + 2);
        entries.push(DirEntry::directory("."));
        entries.push(DirEntry::directory(".."));
        entries.extend(notes.iter().filter_map(|note| {
            note.cached_filename().map(|name| DirEntry {
                ino: note_ino(note.id()),
                name,
                kind: FileKind::RegularFile,
            })
        }));

        debug!(
            "event=fs_readdir module=fs status=ok entries={}",
            entries.len()
        );
        Ok(entries)
    }

    /// Accepted without any work.
    pub fn open(&self, _path: &str, _flags: i32) -> NoteFsResult<()> {
        Ok(())
    }

    /// Reads up to `length` bytes at `offset` from a fresh snapshot.
    pub fn read(&self, path: &str, length: usize, offset: u64) -> NoteFsResult<Vec<u8>> {
        self.note_at(path)?.read_body(offset, length)
    }

    /// Writes `buf` at `offset` and persists the whole body.
    pub fn write(&self, path: &str, buf: &[u8], offset: u64) -> NoteFsResult<usize> {
        self.note_at(path)?.write_body(buf, offset)
    }

    /// Resizes the body to `size` bytes and persists it.
    pub fn truncate(&self, path: &str, size: u64) -> NoteFsResult<()> {
        self.note_at(path)?.truncate_body(size)
    }

    /// Accepted without any work.
    pub fn flush(&self, _path: &str) -> NoteFsResult<()> {
        Ok(())
    }

    /// Extended attributes are not stored; every name reads as empty.
    pub fn get_xattr(&self, _path: &str, _name: &str) -> NoteFsResult<Vec<u8>> {
        Ok(Vec::new())
    }

    /// Extended attributes are not stored; the name list is empty.
    pub fn list_xattr(&self, _path: &str) -> NoteFsResult<Vec<u8>> {
        Ok(Vec::new())
    }

    /// Accepted and discarded.
    pub fn set_xattr(&self, _path: &str, _name: &str, _value: &[u8]) -> NoteFsResult<()> {
        Ok(())
    }

    /// Accepted and discarded; size changes go through [`Self::truncate`].
    pub fn set_attributes(&self, _path: &str) -> NoteFsResult<()> {
        Ok(())
    }
}
