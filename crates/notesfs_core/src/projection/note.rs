//! Single-note entity.
//!
//! # Responsibility
//! - Cache one note row together with the instant it was fetched.
//! - Serve body reads/writes/truncates against a fresh snapshot.
//! - Serve size/timestamps from a bounded-staleness snapshot.
//!
//! # Invariants
//! - The identifier never changes after construction.
//! - Construction never touches the store; a missing row surfaces as
//!   `NotFound` on first synchronization.
//! - A successful write or truncate invalidates the snapshot.

use super::ProjectionContext;
use crate::error::{NoteFsError, NoteFsResult};
use crate::model::note::{NoteId, NoteRecord, NoteSummary};
use crate::path_codec;
use log::debug;
use std::time::{Instant, SystemTime};

pub struct Note {
    id: NoteId,
    ctx: ProjectionContext,
    state: Option<NoteRecord>,
    synced_at: Option<Instant>,
}

impl Note {
    /// Creates an unhydrated entity. Does not query the store.
    pub fn new(ctx: ProjectionContext, id: NoteId) -> Self {
        Self {
            id,
            ctx,
            state: None,
            synced_at: None,
        }
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    /// Last fetched snapshot, if any.
    pub fn record(&self) -> Option<&NoteRecord> {
        self.state.as_ref()
    }

    /// Instant of the last successful synchronization.
    pub fn synced_at(&self) -> Option<Instant> {
        self.synced_at
    }

    /// Refreshes every field from the store.
    ///
    /// # Errors
    /// - `NotFound` when the store has no row for this identifier.
    /// - `Store` on any store failure.
    pub fn synchronize(&mut self) -> NoteFsResult<&NoteRecord> {
        let record = self
            .ctx
            .store()
            .fetch_note(self.id)?
            .ok_or(NoteFsError::NotFound(self.id))?;
        debug!(
            "event=note_sync module=projection status=ok note_id={} body_len={}",
            self.id,
            record.body_len()
        );
        Ok(self.hydrate(record))
    }

    /// Assigns an already fetched row.
    pub(crate) fn hydrate(&mut self, record: NoteRecord) -> &NoteRecord {
        debug_assert_eq!(record.id, self.id);
        self.synced_at = Some(self.ctx.clock().now());
        self.state.insert(record)
    }

    /// Returns the snapshot, refreshing it only when older than the window.
    fn fresh_enough(&mut self) -> NoteFsResult<&NoteRecord> {
        let window = self.ctx.staleness_window();
        let now = self.ctx.clock().now();
        let is_fresh = self
            .synced_at
            .is_some_and(|synced_at| now.saturating_duration_since(synced_at) < window);

        if !is_fresh || self.state.is_none() {
            self.synchronize()?;
        }
        self.state.as_ref().ok_or(NoteFsError::NotFound(self.id))
    }

    fn invalidate(&mut self) {
        self.synced_at = None;
    }

    /// Reads up to `length` body bytes starting at `offset`.
    ///
    /// Returns fewer bytes at the end of the body and none past it.
    pub fn read_body(&mut self, offset: u64, length: usize) -> NoteFsResult<Vec<u8>> {
        let body = &self.synchronize()?.body;
        let start = clamp_offset(offset, body.len());
        let end = start.saturating_add(length).min(body.len());
        Ok(body[start..end].to_vec())
    }

    /// Overwrites the body at `offset` with `buf` and persists the result.
    ///
    /// A gap between the current end and `offset` is zero-filled. Returns
    /// `buf.len()`; an empty `buf` leaves the body untouched.
    ///
    /// # Errors
    /// - `OutOfRange` when the resulting body would exceed the body limit.
    pub fn write_body(&mut self, buf: &[u8], offset: u64) -> NoteFsResult<usize> {
        let mut body = self.synchronize()?.body.clone();
        if buf.is_empty() {
            return Ok(0);
        }
        let end = offset
            .checked_add(buf.len() as u64)
            .ok_or(NoteFsError::OutOfRange(offset))?;
        let end = self.checked_body_len(end)?;
        let start = end - buf.len();
        if body.len() < end {
            body.resize(end, 0);
        }
        body[start..end].copy_from_slice(buf);

        self.persist(&body)?;
        debug!(
            "event=note_write module=projection status=ok note_id={} offset={} written={}",
            self.id,
            offset,
            buf.len()
        );
        Ok(buf.len())
    }

    /// Shrinks or zero-extends the body to `size` bytes and persists it.
    ///
    /// # Errors
    /// - `OutOfRange` when `size` exceeds the body limit.
    pub fn truncate_body(&mut self, size: u64) -> NoteFsResult<()> {
        let mut body = self.synchronize()?.body.clone();
        let size = self.checked_body_len(size)?;
        body.resize(size, 0);

        self.persist(&body)?;
        debug!(
            "event=note_truncate module=projection status=ok note_id={} size={}",
            self.id, size
        );
        Ok(())
    }

    /// Rejects body lengths above the configured limit before anything
    /// is allocated.
    fn checked_body_len(&self, len: u64) -> NoteFsResult<usize> {
        if len > self.ctx.max_body_len() {
            return Err(NoteFsError::OutOfRange(len));
        }
        usize::try_from(len).map_err(|_| NoteFsError::OutOfRange(len))
    }

    fn persist(&mut self, body: &[u8]) -> NoteFsResult<()> {
        let replaced = self.ctx.store().replace_body(self.id, body)?;
        self.invalidate();
        if replaced {
            Ok(())
        } else {
            Err(NoteFsError::NotFound(self.id))
        }
    }

    /// Body length in bytes, within the staleness window.
    pub fn size(&mut self) -> NoteFsResult<u64> {
        Ok(self.fresh_enough()?.body_len())
    }

    /// Modification time, within the staleness window.
    pub fn modified(&mut self) -> NoteFsResult<SystemTime> {
        Ok(self.fresh_enough()?.modified_at)
    }

    /// Creation time, within the staleness window.
    pub fn created(&mut self) -> NoteFsResult<SystemTime> {
        Ok(self.fresh_enough()?.created_at)
    }

    /// Canonical filename from a freshly synchronized title.
    pub fn filename(&mut self) -> NoteFsResult<String> {
        let id = self.id;
        let title = &self.synchronize()?.title;
        Ok(path_codec::encode(id, title))
    }

    /// Canonical filename from the current snapshot, without a query.
    pub fn cached_filename(&self) -> Option<String> {
        self.state
            .as_ref()
            .map(|state| path_codec::encode(self.id, &state.title))
    }

    /// Listing view of the current snapshot, without a query.
    pub fn summary(&self) -> Option<NoteSummary> {
        self.state.as_ref().map(|state| {
            NoteSummary::from_record(state, path_codec::encode(self.id, &state.title))
        })
    }
}

fn clamp_offset(offset: u64, len: usize) -> usize {
    usize::try_from(offset).map_or(len, |offset| offset.min(len))
}
