//! Async note repository façade.
//!
//! # Responsibility
//! - Decouple list/detail layers from the storage technology.
//! - Run store calls off the async workers and publish committed writes.
//! - Hand out live queries bound to the shared change bus.
//!
//! # Invariants
//! - A change is published only after the store call succeeded.
//! - All clones share one store and one change bus.

use crate::live::bus::{ChangeBus, ChangeKind, NoteChange};
use crate::live::query::LiveQuery;
use crate::model::note::{Note, NoteId};
use crate::repo::note_store::{NoteQuery, NoteStore, RepoResult};
use crate::repo::run_blocking;
use log::{error, info};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;

/// Default per-query result buffer.
pub const DEFAULT_LIVE_QUERY_BUFFER: usize = 16;

/// Cheaply cloneable handle to the shared note store.
#[derive(Clone)]
pub struct NoteRepository {
    store: Arc<dyn NoteStore>,
    changes: ChangeBus,
    runtime: Handle,
    live_buffer: usize,
}

impl NoteRepository {
    /// Creates a repository; live queries and drivers are spawned on `runtime`.
    pub fn new(store: Arc<dyn NoteStore>, changes: ChangeBus, runtime: Handle) -> Self {
        Self {
            store,
            changes,
            runtime,
            live_buffer: DEFAULT_LIVE_QUERY_BUFFER,
        }
    }

    /// Overrides the per-query result buffer.
    pub fn with_live_buffer(mut self, live_buffer: usize) -> Self {
        self.live_buffer = live_buffer.max(1);
        self
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub fn changes(&self) -> &ChangeBus {
        &self.changes
    }

    /// Starts a live query for an arbitrary filter.
    pub fn observe(&self, query: NoteQuery) -> LiveQuery {
        LiveQuery::spawn(
            query,
            Arc::clone(&self.store),
            &self.changes,
            &self.runtime,
            self.live_buffer,
        )
    }

    /// Every note, newest first.
    pub fn observe_all(&self) -> LiveQuery {
        self.observe(NoteQuery::All)
    }

    /// Favorite notes, newest first.
    pub fn observe_favorites(&self) -> LiveQuery {
        self.observe(NoteQuery::Favorites)
    }

    /// Notes whose title or content contains `text`.
    pub fn observe_search(&self, text: impl Into<String>) -> LiveQuery {
        self.observe(NoteQuery::Search(text.into()))
    }

    /// Zero or one note.
    pub fn observe_by_id(&self, id: NoteId) -> LiveQuery {
        self.observe(NoteQuery::ById(id))
    }

    /// One-shot read.
    pub async fn fetch(&self, query: NoteQuery) -> RepoResult<Vec<Note>> {
        let store = Arc::clone(&self.store);
        run_blocking(&self.runtime, move || store.list_notes(&query)).await
    }

    /// Inserts a transient note and returns the store-assigned id.
    pub async fn insert(&self, note: &Note) -> RepoResult<NoteId> {
        let started_at = Instant::now();
        let store = Arc::clone(&self.store);
        let note = note.clone();
        match run_blocking(&self.runtime, move || store.insert_note(&note)).await {
            Ok(id) => {
                info!(
                    "event=note_insert module=repo status=ok note_id={id} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                self.changes.publish(NoteChange::new(ChangeKind::Inserted, id));
                Ok(id)
            }
            Err(err) => {
                error!(
                    "event=note_insert module=repo status=error duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }

    /// Writes title, content, `updated_at` and favorite flag of a stored note.
    pub async fn update(&self, note: &Note) -> RepoResult<()> {
        let started_at = Instant::now();
        let id = note.id;
        let store = Arc::clone(&self.store);
        let note = note.clone();
        match run_blocking(&self.runtime, move || store.update_note(&note)).await {
            Ok(()) => {
                info!(
                    "event=note_update module=repo status=ok note_id={id} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                self.changes.publish(NoteChange::new(ChangeKind::Updated, id));
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=note_update module=repo status=error note_id={id} duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }

    /// Hard-deletes a note.
    pub async fn delete_by_id(&self, id: NoteId) -> RepoResult<()> {
        let started_at = Instant::now();
        let store = Arc::clone(&self.store);
        match run_blocking(&self.runtime, move || store.delete_note(id)).await {
            Ok(()) => {
                info!(
                    "event=note_delete module=repo status=ok note_id={id} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                self.changes.publish(NoteChange::new(ChangeKind::Deleted, id));
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=note_delete module=repo status=error note_id={id} duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }
}
