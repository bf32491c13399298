//! FUSE bridge for [`NotesFs`].
//!
//! The kernel addresses files by inode; the adapter addresses them by path.
//! The root is inode 1 and note `id` is inode `id + 1`, so every inode
//! maps back to a path that decodes to the same note.

use super::{path_for_ino, DirEntry, FileAttr, FileKind, Ino, NotesFs, ROOT_INO, ROOT_PATH};
use crate::error::NoteFsError;
use fuser::{
    FileType, Filesystem, KernelConfig, MountOption, ReplyAttr, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyWrite, ReplyXattr, Request, TimeOrNow,
};
use log::{debug, info, warn};
use std::ffi::OsStr;
use std::path::Path;
use std::time::SystemTime;

const BLOCK_SIZE: u32 = 4096;

/// Mount settings.
#[derive(Clone, Debug)]
pub struct MountOptions {
    /// Allow other users to access the mount.
    pub allow_other: bool,
    /// Filesystem name shown in mount output.
    pub fsname: String,
    /// Extra `-o` options passed through verbatim.
    pub extra: Vec<String>,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            allow_other: false,
            fsname: "notesfs".to_string(),
            extra: Vec::new(),
        }
    }
}

/// `fuser::Filesystem` implementation delegating to [`NotesFs`].
pub struct NotesFuse {
    fs: NotesFs,
    uid: u32,
    gid: u32,
}

impl NotesFuse {
    /// Files are reported as owned by the mounting user.
    pub fn new(fs: NotesFs) -> Self {
        // SAFETY: getuid/getgid take no arguments, cannot fail and touch
        // no memory owned by Rust.
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
        Self { fs, uid, gid }
    }

    fn path_of(ino: Ino) -> Option<String> {
        if ino == ROOT_INO {
            Some(ROOT_PATH.to_string())
        } else {
            path_for_ino(ino)
        }
    }

    fn to_fuser(&self, attr: FileAttr) -> fuser::FileAttr {
        fuser::FileAttr {
            ino: attr.ino,
            size: attr.size,
            blocks: attr.size.div_ceil(u64::from(BLOCK_SIZE)),
            atime: attr.atime,
            mtime: attr.mtime,
            ctime: attr.ctime,
            crtime: attr.crtime,
            kind: attr.kind.into(),
            perm: attr.perm,
            nlink: attr.nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }

    fn reply_attr_for(&self, path: &str, reply: ReplyAttr) {
        match self.fs.attributes(path) {
            Ok(attr) => reply.attr(&self.fs.attr_ttl(), &self.to_fuser(attr)),
            Err(err) => reply.error(err.errno()),
        }
    }
}

impl From<FileKind> for FileType {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::Directory => FileType::Directory,
            FileKind::RegularFile => FileType::RegularFile,
        }
    }
}

fn log_failure(op: &str, ino: Ino, err: &NoteFsError) {
    if err.is_not_found() {
        debug!("event=fuse_{op} module=fuse status=not_found ino={ino}");
    } else {
        warn!(
            "event=fuse_{op} module=fuse status=error ino={ino} errno={} error={err}",
            err.errno()
        );
    }
}

impl Filesystem for NotesFuse {
    fn init(
        &mut self,
        _req: &Request<'_>,
        _config: &mut KernelConfig,
    ) -> Result<(), libc::c_int> {
        info!("event=fuse_init module=fuse status=ok");
        Ok(())
    }

    fn destroy(&mut self) {
        info!("event=fuse_destroy module=fuse status=ok");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(name) = name.to_str() else {
            reply.error(libc::ENOENT);
            return;
        };
        if parent != ROOT_INO {
            reply.error(libc::ENOENT);
            return;
        }

        match self.fs.attributes(&format!("/{name}")) {
            Ok(attr) => reply.entry(&self.fs.attr_ttl(), &self.to_fuser(attr), 0),
            Err(err) => {
                log_failure("lookup", parent, &err);
                reply.error(err.errno());
            }
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        match Self::path_of(ino) {
            Some(path) => self.reply_attr_for(&path, reply),
            None => reply.error(libc::ENOENT),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let Some(path) = Self::path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        let result = match size {
            Some(size) => self.fs.truncate(&path, size),
            None => self.fs.set_attributes(&path),
        };
        match result {
            Ok(()) => self.reply_attr_for(&path, reply),
            Err(err) => {
                log_failure("setattr", ino, &err);
                reply.error(err.errno());
            }
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let Some(path) = Self::path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.fs.open(&path, flags) {
            Ok(()) => reply.opened(0, 0),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(path) = path_for_ino(ino) else {
            reply.error(libc::EISDIR);
            return;
        };
        let Ok(offset) = u64::try_from(offset) else {
            reply.error(libc::EINVAL);
            return;
        };

        match self.fs.read(&path, size as usize, offset) {
            Ok(data) => reply.data(&data),
            Err(err) => {
                log_failure("read", ino, &err);
                reply.error(err.errno());
            }
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let Some(path) = path_for_ino(ino) else {
            reply.error(libc::EISDIR);
            return;
        };
        let Ok(offset) = u64::try_from(offset) else {
            reply.error(libc::EINVAL);
            return;
        };

        match self.fs.write(&path, data, offset) {
            Ok(written) => reply.written(u32::try_from(written).unwrap_or(u32::MAX)),
            Err(err) => {
                log_failure("write", ino, &err);
                reply.error(err.errno());
            }
        }
    }

    fn flush(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _lock_owner: u64,
        reply: ReplyEmpty,
    ) {
        let Some(path) = Self::path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.fs.flush(&path) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(path) = Self::path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        let entries: Vec<DirEntry> = match self.fs.list_directory(&path) {
            Ok(entries) => entries,
            Err(err) => {
                log_failure("readdir", ino, &err);
                reply.error(err.errno());
                return;
            }
        };

        let skip = usize::try_from(offset).unwrap_or(0);
        for (index, entry) in entries.into_iter().enumerate().skip(skip) {
            // `add` returns true once the reply buffer is full.
            if reply.add(entry.ino, (index + 1) as i64, entry.kind.into(), &entry.name) {
                break;
            }
        }
        reply.ok();
    }

    fn getxattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        size: u32,
        reply: ReplyXattr,
    ) {
        let Some(path) = Self::path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.fs.get_xattr(&path, &name.to_string_lossy()) {
            Ok(value) => reply_xattr(reply, size, &value),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn listxattr(&mut self, _req: &Request<'_>, ino: u64, size: u32, reply: ReplyXattr) {
        let Some(path) = Self::path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.fs.list_xattr(&path) {
            Ok(names) => reply_xattr(reply, size, &names),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn setxattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        value: &[u8],
        _flags: i32,
        _position: u32,
        reply: ReplyEmpty,
    ) {
        let Some(path) = Self::path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.fs.set_xattr(&path, &name.to_string_lossy(), value) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }
}

fn reply_xattr(reply: ReplyXattr, size: u32, value: &[u8]) {
    let len = u32::try_from(value.len()).unwrap_or(u32::MAX);
    if size == 0 {
        reply.size(len);
    } else if len <= size {
        reply.data(value);
    } else {
        reply.error(libc::ERANGE);
    }
}

/// Mounts the filesystem and blocks until it is unmounted.
pub fn mount(
    fs: NotesFs,
    mountpoint: impl AsRef<Path>,
    options: MountOptions,
) -> std::io::Result<()> {
    let mut mount_options = vec![
        MountOption::FSName(options.fsname),
        MountOption::DefaultPermissions,
        MountOption::RW,
    ];
    if options.allow_other {
        mount_options.push(MountOption::AllowOther);
    }
    mount_options.extend(options.extra.into_iter().map(MountOption::CUSTOM));

    info!(
        "event=fuse_mount module=fuse status=start mountpoint={}",
        mountpoint.as_ref().display()
    );
    fuser::mount2(NotesFuse::new(fs), mountpoint.as_ref(), &mount_options)
}
