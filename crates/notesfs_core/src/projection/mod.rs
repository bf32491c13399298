//! Entity projection of note rows.
//!
//! # Responsibility
//! - Hold per-note cached state and decide when it must be refreshed.
//! - Translate byte-offset body operations into whole-body replacements.
//! - Bulk-hydrate every note for directory enumeration.
//!
//! # Invariants
//! - Body operations always refresh from the store before acting.
//! - Metadata accessors refresh only once the staleness window elapsed.
//! - Entities never share state; concurrent writers race (last write wins).

use crate::clock::{Clock, SystemClock};
use crate::config::FsConfig;
use crate::repo::note_store::NoteStore;
use std::sync::Arc;
use std::time::Duration;

pub mod collection;
pub mod note;

/// Store, clock and freshness policy shared by entities of one process.
#[derive(Clone)]
pub struct ProjectionContext {
    store: Arc<dyn NoteStore>,
    clock: Arc<dyn Clock>,
    staleness_window: Duration,
    max_body_len: u64,
}

impl ProjectionContext {
    pub fn new(store: Arc<dyn NoteStore>, clock: Arc<dyn Clock>, config: &FsConfig) -> Self {
        Self {
            store,
            clock,
            staleness_window: config.staleness_window,
            max_body_len: config.max_body_len,
        }
    }

    /// Context on the process clock.
    pub fn with_system_clock(store: Arc<dyn NoteStore>, config: &FsConfig) -> Self {
        Self::new(store, Arc::new(SystemClock), config)
    }

    pub fn store(&self) -> &dyn NoteStore {
        self.store.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn staleness_window(&self) -> Duration {
        self.staleness_window
    }

    /// Largest body a write or truncate may produce.
    pub fn max_body_len(&self) -> u64 {
        self.max_body_len
    }
}
