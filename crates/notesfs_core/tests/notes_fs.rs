mod common;

use common::{StoreFixture, MODIFIED_AT};
use notesfs_core::fs::{note_ino, DIR_PERM, FILE_PERM, ROOT_INO};
use notesfs_core::{open_notes_fs, FileKind, FsConfig, NoteFsError};
use std::collections::BTreeSet;
use std::time::{Duration, UNIX_EPOCH};

#[test]
fn root_attributes_describe_a_directory() {
    let fixture = StoreFixture::new();
    let (fs, _clock) = fixture.notes_fs();

    let attr = fs.attributes("/").unwrap();
    assert_eq!(attr.ino, ROOT_INO);
    assert_eq!(attr.kind, FileKind::Directory);
    assert_eq!(attr.perm, DIR_PERM);
    assert_eq!(attr.nlink, 2);
    assert_eq!(attr.atime, attr.mtime);
    assert_eq!(attr.mtime, attr.ctime);
}

#[test]
fn note_attributes_describe_a_regular_file() {
    let fixture = StoreFixture::with_notes(&[(1, "Alpha", "hello")]);
    let (fs, clock) = fixture.notes_fs();
    clock.advance(Duration::from_secs(30));

    let attr = fs.attributes("/0001-Alpha.txt").unwrap();
    assert_eq!(attr.ino, note_ino(1));
    assert_eq!(attr.kind, FileKind::RegularFile);
    assert_eq!(attr.size, 5);
    assert_eq!(attr.perm, FILE_PERM);
    assert_eq!(attr.nlink, 1);

    let modified = UNIX_EPOCH + Duration::from_secs_f64(MODIFIED_AT);
    assert_eq!(attr.mtime, modified);
    assert_eq!(attr.ctime, modified);
    assert_ne!(attr.atime, modified);
}

#[test]
fn attributes_of_missing_or_malformed_paths_are_enoent() {
    let fixture = StoreFixture::with_notes(&[(1, "Alpha", "")]);
    let (fs, _clock) = fixture.notes_fs();

    for path in ["/9999.txt", "/abc.txt", "/12", "/1.md"] {
        let err = fs.attributes(path).unwrap_err();
        assert_eq!(err.errno(), libc::ENOENT, "{path}");
        assert!(err.is_not_found());
    }
}

#[test]
fn store_failure_during_attributes_is_eio_not_enoent() {
    let fixture = StoreFixture::with_notes(&[(1, "Alpha", "")]);
    let (fs, _clock) = fixture.notes_fs();
    fixture
        .conn()
        .execute_batch("DROP TABLE ZNOTE;")
        .unwrap();

    let err = fs.attributes("/1.txt").unwrap_err();
    assert!(matches!(err, NoteFsError::Store(_)), "got {err}");
    assert_eq!(err.errno(), libc::EIO);
}

#[test]
fn root_listing_contains_dot_entries_and_every_note() {
    let fixture = StoreFixture::with_notes(&[(1, "Alpha", "a"), (2, "Beta", "b")]);
    let (fs, _clock) = fixture.notes_fs();

    let entries = fs.list_directory("/").unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].name, ".");
    assert_eq!(entries[1].name, "..");

    let notes: BTreeSet<&str> = entries[2..].iter().map(|entry| entry.name.as_str()).collect();
    assert_eq!(notes, BTreeSet::from(["0001-Alpha.txt", "0002-Beta.txt"]));
    assert!(entries[2..]
        .iter()
        .all(|entry| entry.kind == FileKind::RegularFile));
}

#[test]
fn listing_reflects_notes_added_between_calls() {
    let fixture = StoreFixture::with_notes(&[(1, "Alpha", "a")]);
    let (fs, _clock) = fixture.notes_fs();
    assert_eq!(fs.list_directory("/").unwrap().len(), 3);

    fixture.insert_note(2, "Beta", "b");
    assert_eq!(fs.list_directory("/").unwrap().len(), 4);
}

#[test]
fn listing_a_non_root_path_is_rejected() {
    let fixture = StoreFixture::with_notes(&[(1, "Alpha", "a")]);
    let (fs, _clock) = fixture.notes_fs();

    let err = fs.list_directory("/0001-Alpha.txt").unwrap_err();
    assert!(matches!(err, NoteFsError::InvalidPath(_)));
    assert_eq!(err.errno(), libc::ENOENT);
}

#[test]
fn listed_names_resolve_back_to_their_notes() {
    let fixture = StoreFixture::with_notes(&[(12, "Weekly Review", "x"), (3, "todo", "yy")]);
    let (fs, _clock) = fixture.notes_fs();

    for entry in fs.list_directory("/").unwrap().into_iter().skip(2) {
        let attr = fs.attributes(&format!("/{}", entry.name)).unwrap();
        assert_eq!(attr.ino, entry.ino);
    }
}

#[test]
fn read_write_truncate_go_through_paths() {
    let fixture = StoreFixture::with_notes(&[(1, "Alpha", "")]);
    let (fs, _clock) = fixture.notes_fs();

    fs.open("/0001-Alpha.txt", libc::O_RDWR).unwrap();
    assert_eq!(fs.write("/0001-Alpha.txt", b"hello world", 0).unwrap(), 11);
    assert_eq!(fs.read("/0001-Alpha.txt", 5, 6).unwrap(), b"world");

    fs.truncate("/1.txt", 5).unwrap();
    assert_eq!(fs.read("/1.txt", 64, 0).unwrap(), b"hello");
    assert_eq!(fs.attributes("/1.txt").unwrap().size, 5);
    fs.flush("/1.txt").unwrap();
}

#[test]
fn body_operations_propagate_typed_errors() {
    let fixture = StoreFixture::new();
    let (fs, _clock) = fixture.notes_fs();

    assert!(matches!(
        fs.read("/77.txt", 1, 0),
        Err(NoteFsError::NotFound(77))
    ));
    assert!(matches!(
        fs.write("/notes.txt", b"x", 0),
        Err(NoteFsError::InvalidPath(_))
    ));
    assert!(matches!(
        fs.truncate("/77.txt", 0),
        Err(NoteFsError::NotFound(77))
    ));
}

#[test]
fn oversized_truncate_and_write_fail_with_efbig() {
    let fixture = StoreFixture::with_notes(&[(1, "Alpha", "ab")]);
    let (fs, _clock) = fixture.notes_fs();

    let err = fs.truncate("/1.txt", 1u64 << 44).unwrap_err();
    assert_eq!(err.errno(), libc::EFBIG);
    let err = fs.write("/1.txt", b"x", 1u64 << 44).unwrap_err();
    assert_eq!(err.errno(), libc::EFBIG);

    assert_eq!(fs.read("/1.txt", 64, 0).unwrap(), b"ab");
}

#[test]
fn unimplemented_operations_succeed_without_effect() {
    let fixture = StoreFixture::with_notes(&[(1, "Alpha", "keep")]);
    let (fs, _clock) = fixture.notes_fs();

    assert!(fs.get_xattr("/1.txt", "user.tag").unwrap().is_empty());
    assert!(fs.list_xattr("/1.txt").unwrap().is_empty());
    fs.set_xattr("/1.txt", "user.tag", b"v").unwrap();
    fs.set_attributes("/1.txt").unwrap();
    assert_eq!(fixture.body(1), b"keep");
}

#[test]
fn open_notes_fs_wires_the_sqlite_store() {
    let fixture = StoreFixture::with_notes(&[(5, "Five", "5")]);
    let fs = open_notes_fs(&fixture.path, &FsConfig::default()).unwrap();

    assert_eq!(fs.attr_ttl(), FsConfig::default().attr_ttl);
    assert_eq!(fs.read("/0005-Five.txt", 1, 0).unwrap(), b"5");
}
