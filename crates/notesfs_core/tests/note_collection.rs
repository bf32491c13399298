mod common;

use common::StoreFixture;
use notesfs_core::db::DbResult;
use notesfs_core::{
    FsConfig, ManualClock, NoteCollection, NoteFsError, NoteId, NoteRecord, NoteStore,
    NoteSummary, ProjectionContext,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Store whose listing and bulk fetch can disagree.
struct SkewedStore {
    listed: Vec<NoteId>,
    rows: Vec<NoteId>,
    single_fetches: AtomicUsize,
}

impl SkewedStore {
    fn new(listed: &[NoteId], rows: &[NoteId]) -> Self {
        Self {
            listed: listed.to_vec(),
            rows: rows.to_vec(),
            single_fetches: AtomicUsize::new(0),
        }
    }
}

impl NoteStore for SkewedStore {
    fn fetch_note(&self, id: NoteId) -> DbResult<Option<NoteRecord>> {
        self.single_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.contains(&id).then(|| NoteRecord::new(id)))
    }

    fn list_note_ids(&self) -> DbResult<Vec<NoteId>> {
        Ok(self.listed.clone())
    }

    fn fetch_all_notes(&self) -> DbResult<Vec<NoteRecord>> {
        Ok(self
            .rows
            .iter()
            .map(|id| {
                let mut record = NoteRecord::new(*id);
                record.title = format!("note-{id}");
                record
            })
            .collect())
    }

    fn replace_body(&self, _id: NoteId, _body: &[u8]) -> DbResult<bool> {
        Ok(false)
    }
}

fn collection_over(store: Arc<SkewedStore>) -> NoteCollection {
    let ctx = ProjectionContext::new(store, Arc::new(ManualClock::new()), &FsConfig::default());
    NoteCollection::new(ctx)
}

#[test]
fn synchronize_hydrates_every_listed_note() {
    let fixture = StoreFixture::with_notes(&[(1, "Alpha", "a"), (2, "Beta", "bb")]);
    let mut notes = NoteCollection::new(fixture.context(Arc::new(ManualClock::new())));
    assert!(notes.is_empty());
    assert!(notes.synced_at().is_none());

    notes.synchronize().unwrap();
    assert_eq!(notes.len(), 2);
    assert!(notes.synced_at().is_some());

    let beta = notes.get(2).unwrap();
    assert_eq!(beta.record().unwrap().title, "Beta");
    assert_eq!(beta.record().unwrap().body, b"bb");

    let names: BTreeSet<String> = notes.iter().filter_map(|note| note.cached_filename()).collect();
    assert_eq!(
        names,
        BTreeSet::from(["0001-Alpha.txt".to_string(), "0002-Beta.txt".to_string()])
    );
}

#[test]
fn bulk_hydration_issues_no_per_note_queries() {
    let store = Arc::new(SkewedStore::new(&[1, 2, 3], &[1, 2, 3]));
    let mut notes = collection_over(store.clone());

    notes.synchronize().unwrap();
    assert_eq!(notes.len(), 3);
    assert_eq!(store.single_fetches.load(Ordering::SeqCst), 0);
}

#[test]
fn unlisted_hydration_row_is_a_consistency_fault() {
    let store = Arc::new(SkewedStore::new(&[1], &[1, 2]));
    let mut notes = collection_over(store);

    let err = notes.synchronize().unwrap_err();
    assert!(matches!(err, NoteFsError::ConsistencyFault(2)));
    assert_eq!(err.errno(), libc::EIO);
    assert!(notes.is_empty(), "failed sync must not publish a partial map");
}

#[test]
fn listed_note_without_row_is_pruned() {
    let store = Arc::new(SkewedStore::new(&[1, 2], &[1]));
    let mut notes = collection_over(store);

    notes.synchronize().unwrap();
    assert_eq!(notes.len(), 1);
    assert!(matches!(notes.get(2), Err(NoteFsError::NotFound(2))));
}

#[test]
fn synchronize_replaces_the_previous_map() {
    let fixture = StoreFixture::with_notes(&[(1, "Alpha", "a"), (2, "Beta", "b")]);
    let mut notes = NoteCollection::new(fixture.context(Arc::new(ManualClock::new())));
    notes.synchronize().unwrap();

    fixture
        .conn()
        .execute("DELETE FROM ZNOTE WHERE Z_PK = 1;", [])
        .unwrap();
    fixture.insert_note(3, "Gamma", "c");
    notes.synchronize().unwrap();

    let mut ids: Vec<NoteId> = notes.iter().map(|note| note.id()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![2, 3]);
}

#[test]
fn summaries_serialize_for_listing_output() {
    let fixture = StoreFixture::with_notes(&[(2, "Beta", "bb"), (1, "Alpha", "a")]);
    let mut notes = NoteCollection::new(fixture.context(Arc::new(ManualClock::new())));
    notes.synchronize().unwrap();

    let summaries = notes.summaries();
    assert_eq!(summaries[0].filename, "0001-Alpha.txt");
    assert_eq!(summaries[1].size, 2);

    let json = serde_json::to_string(&summaries).unwrap();
    let decoded: Vec<NoteSummary> = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, summaries);
    assert!(json.contains("\"author\":\"tester\""));
}
