//! List query coordinator.
//!
//! # Responsibility
//! - Compose search text and the favorites-only flag into one live note list.
//! - Forward list-row actions (delete, favorite toggle) to the repository.
//!
//! # Invariants
//! - The observed source is a pure function of the latest filter values:
//!   non-blank search, then favorites, then all.
//! - Retargeting cancels the previous subscription before the next starts;
//!   superseded sources never reach `notes`.
//! - `notes` starts empty and keeps its last value when a source fails.

use crate::clock::Clock;
use crate::live::query::LiveResult;
use crate::live::slot::SubscriptionSlot;
use crate::model::note::Note;
use crate::repo::note_repository::NoteRepository;
use crate::repo::note_store::NoteQuery;
use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Live source selected for the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListSource {
    All,
    Favorites,
    Search(String),
}

impl ListSource {
    /// Store filter backing this source.
    pub fn query(&self) -> NoteQuery {
        match self {
            Self::All => NoteQuery::All,
            Self::Favorites => NoteQuery::Favorites,
            Self::Search(text) => NoteQuery::Search(text.clone()),
        }
    }
}

/// Picks the list source: search beats favorites, favorites beat all.
///
/// The search text is passed through untrimmed; only blankness is checked.
pub fn select_source(search_query: &str, favorites_only: bool) -> ListSource {
    if !search_query.trim().is_empty() {
        ListSource::Search(search_query.to_string())
    } else if favorites_only {
        ListSource::Favorites
    } else {
        ListSource::All
    }
}

/// UI intent driving the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub search_query: String,
    pub favorites_only: bool,
}

impl ListFilter {
    pub fn source(&self) -> ListSource {
        select_source(&self.search_query, self.favorites_only)
    }
}

/// Keeps one always-current, filtered note list.
pub struct ListQueryCoordinator {
    repo: NoteRepository,
    clock: Arc<dyn Clock>,
    filter: watch::Sender<ListFilter>,
    active: Mutex<Option<ListSource>>,
    notes: Arc<watch::Sender<Vec<Note>>>,
    slot: SubscriptionSlot,
}

impl ListQueryCoordinator {
    /// Creates the coordinator and starts observing all notes.
    pub fn new(repo: NoteRepository, clock: Arc<dyn Clock>) -> Self {
        let (filter, _) = watch::channel(ListFilter::default());
        let (notes, _) = watch::channel(Vec::new());
        let slot = SubscriptionSlot::new("list", repo.runtime().clone());
        let coordinator = Self {
            repo,
            clock,
            filter,
            active: Mutex::new(None),
            notes: Arc::new(notes),
            slot,
        };
        coordinator.retarget(&mut coordinator.lock_active());
        coordinator
    }

    /// Current filtered list (empty until the first emission).
    pub fn notes(&self) -> Vec<Note> {
        self.notes.borrow().clone()
    }

    pub fn subscribe_notes(&self) -> watch::Receiver<Vec<Note>> {
        self.notes.subscribe()
    }

    pub fn search_query(&self) -> String {
        self.filter.borrow().search_query.clone()
    }

    pub fn favorites_only(&self) -> bool {
        self.filter.borrow().favorites_only
    }

    pub fn filter(&self) -> ListFilter {
        self.filter.borrow().clone()
    }

    pub fn subscribe_filter(&self) -> watch::Receiver<ListFilter> {
        self.filter.subscribe()
    }

    /// Source currently observed, `None` after `close`.
    pub fn active_source(&self) -> Option<ListSource> {
        self.lock_active().clone()
    }

    /// Replaces the search text and retargets the list. No I/O.
    pub fn set_search_query(&self, text: impl Into<String>) {
        let text = text.into();
        let mut active = self.lock_active();
        self.filter.send_modify(|filter| filter.search_query = text);
        self.retarget(&mut active);
    }

    /// Sets the favorites-only flag and retargets the list. No I/O.
    pub fn set_favorites_only(&self, favorites_only: bool) {
        let mut active = self.lock_active();
        self.filter
            .send_modify(|filter| filter.favorites_only = favorites_only);
        self.retarget(&mut active);
    }

    /// Flips the favorites-only flag; returns the new value.
    pub fn toggle_favorites_only(&self) -> bool {
        let mut active = self.lock_active();
        let mut favorites_only = false;
        self.filter.send_modify(|filter| {
            filter.favorites_only = !filter.favorites_only;
            favorites_only = filter.favorites_only;
        });
        self.retarget(&mut active);
        favorites_only
    }

    /// Deletes `note` by id in the background. Failures are logged only.
    pub fn delete(&self, note: &Note) -> JoinHandle<()> {
        let repo = self.repo.clone();
        let id = note.id;
        self.repo.runtime().spawn(async move {
            if let Err(err) = repo.delete_by_id(id).await {
                warn!("event=list_delete module=list status=error note_id={id} error={err}");
            }
        })
    }

    /// Persists `note` with its favorite flag inverted, in the background.
    ///
    /// Built from the given snapshot, not from the latest stored row.
    pub fn toggle_favorite(&self, note: &Note) -> JoinHandle<()> {
        let repo = self.repo.clone();
        let mut toggled = note.clone();
        toggled.is_favorite = !toggled.is_favorite;
        toggled.updated_at = Some(self.clock.now());
        self.repo.runtime().spawn(async move {
            if let Err(err) = repo.update(&toggled).await {
                warn!(
                    "event=list_toggle_favorite module=list status=error note_id={} error={err}",
                    toggled.id
                );
            }
        })
    }

    /// Stops observing. The last list value is kept.
    pub fn close(&self) {
        let mut active = self.lock_active();
        self.slot.clear();
        *active = None;
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ListSource>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn retarget(&self, active: &mut Option<ListSource>) {
        let next = self.filter.borrow().source();
        if active.as_ref() == Some(&next) {
            return;
        }

        let live = self.repo.observe(next.query());
        let notes = Arc::clone(&self.notes);
        let label = format!("{next:?}");
        self.slot.replace(live, move |result: LiveResult| match result {
            Ok(list) => {
                debug!(
                    "event=list_emit module=list status=ok source={label} count={}",
                    list.len()
                );
                notes.send_replace(list);
            }
            Err(err) => {
                warn!("event=list_emit module=list status=error source={label} error={err}");
            }
        });
        *active = Some(next);
    }
}
