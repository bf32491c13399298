//! Bulk-hydrated note enumeration.
//!
//! # Responsibility
//! - List every note identifier and hydrate all notes with one joined
//!   query instead of one query per note.
//!
//! # Invariants
//! - Every synchronization fully replaces the map; nothing is merged.
//! - A hydration row for an unlisted identifier is a `ConsistencyFault`.
//! - Listed identifiers without a hydration row are pruned.
//! - A failed synchronization leaves the previous map untouched.

use super::note::Note;
use super::ProjectionContext;
use crate::error::{NoteFsError, NoteFsResult};
use crate::model::note::{NoteId, NoteSummary};
use log::{debug, warn};
use std::collections::HashMap;
use std::time::Instant;

pub struct NoteCollection {
    ctx: ProjectionContext,
    notes: HashMap<NoteId, Note>,
    synced_at: Option<Instant>,
}

impl NoteCollection {
    pub fn new(ctx: ProjectionContext) -> Self {
        Self {
            ctx,
            notes: HashMap::new(),
            synced_at: None,
        }
    }

    /// Rebuilds the map from an identifier listing plus one bulk fetch.
    ///
    /// # Errors
    /// - `ConsistencyFault` when the bulk fetch returns an identifier the
    ///   listing did not contain.
    /// - `Store` on any store failure.
    pub fn synchronize(&mut self) -> NoteFsResult<()> {
        let started_at = Instant::now();
        let store = self.ctx.store();

        let mut notes: HashMap<NoteId, Note> = store
            .list_note_ids()?
            .into_iter()
            .map(|id| (id, Note::new(self.ctx.clone(), id)))
            .collect();

        for record in store.fetch_all_notes()? {
            let id = record.id;
            match notes.get_mut(&id) {
                Some(note) => {
                    note.hydrate(record);
                }
                None => {
                    warn!(
                        "event=collection_sync module=projection status=error error_code=consistency_fault note_id={}",
                        id
                    );
                    return Err(NoteFsError::ConsistencyFault(id));
                }
            }
        }

        let listed = notes.len();
        notes.retain(|id, note| {
            let hydrated = note.record().is_some();
            if !hydrated {
                warn!(
                    "event=collection_sync module=projection status=pruned note_id={}",
                    id
                );
            }
            hydrated
        });

        debug!(
            "event=collection_sync module=projection status=ok listed={} hydrated={} duration_ms={}",
            listed,
            notes.len(),
            started_at.elapsed().as_millis()
        );
        self.notes = notes;
        self.synced_at = Some(self.ctx.clock().now());
        Ok(())
    }

    /// Looks up a hydrated note from the last synchronization.
    pub fn get(&self, id: NoteId) -> NoteFsResult<&Note> {
        self.notes.get(&id).ok_or(NoteFsError::NotFound(id))
    }

    /// Notes from the last synchronization, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.values()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Instant the map was last rebuilt.
    pub fn synced_at(&self) -> Option<Instant> {
        self.synced_at
    }

    /// Listing views sorted by identifier.
    pub fn summaries(&self) -> Vec<NoteSummary> {
        let mut summaries: Vec<NoteSummary> = self.iter().filter_map(Note::summary).collect();
        summaries.sort_by_key(|summary| summary.id);
        summaries
    }
}
