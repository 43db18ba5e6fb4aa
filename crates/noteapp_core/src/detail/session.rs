//! Detail edit session.
//!
//! # Responsibility
//! - Own the lifecycle of one note being viewed, created or edited.
//! - Keep field edits and the favorite toggle in memory until `save_note`.
//! - Stamp timestamps and assign the store id on save.
//!
//! # Invariants
//! - `load_note` cancels the previous load subscription before anything else.
//! - Field edits never perform I/O.
//! - Empty notes and unedited placeholders are never written; an edited
//!   placeholder is saved as a new note.
//! - Nothing is written while a load is pending.
//! - Every `save_note` call completes exactly once, whatever the store does.
//! - A failed save keeps the in-memory edits.

use crate::clock::Clock;
use crate::live::query::LiveResult;
use crate::live::slot::SubscriptionSlot;
use crate::model::note::{Note, NoteId, NEW_NOTE_ID, UNSAVED_NOTE_ID};
use crate::repo::note_repository::NoteRepository;
use crate::repo::note_store::RepoError;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Nothing loaded yet.
    #[default]
    Idle,
    /// Waiting for the first emission of an existing note.
    Loading,
    /// Note available for editing.
    Ready,
    /// A save is in flight.
    Saving,
}

/// Why the held note is a stand-in rather than real data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    NotFound,
    LoadFailed,
}

/// Observable state of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailState {
    pub note: Note,
    pub phase: SessionPhase,
    pub placeholder: Option<Placeholder>,
}

impl DetailState {
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, SessionPhase::Loading | SessionPhase::Saving)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Title and content were both blank.
    EmptyNote,
    /// The session holds an unedited not-found/error placeholder.
    Placeholder,
    /// A `load_note` is still waiting for its first result.
    Loading,
}

/// Result reported once per `save_note` call.
#[derive(Debug)]
pub enum SaveOutcome {
    Skipped(SkipReason),
    Inserted(NoteId),
    Updated(NoteId),
    Failed(RepoError),
}

impl SaveOutcome {
    /// Returns whether the note is durable after this save.
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Inserted(_) | Self::Updated(_))
    }
}

/// Edit session for a single note. Clones share the same state.
#[derive(Clone)]
pub struct DetailEditSession {
    repo: NoteRepository,
    clock: Arc<dyn Clock>,
    state: Arc<watch::Sender<DetailState>>,
    slot: SubscriptionSlot,
}

impl DetailEditSession {
    pub fn new(repo: NoteRepository, clock: Arc<dyn Clock>) -> Self {
        let (state, _) = watch::channel(DetailState::default());
        let slot = SubscriptionSlot::new("detail", repo.runtime().clone());
        Self {
            repo,
            clock,
            state: Arc::new(state),
            slot,
        }
    }

    pub fn snapshot(&self) -> DetailState {
        self.state.borrow().clone()
    }

    pub fn note(&self) -> Note {
        self.state.borrow().note.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.state.subscribe()
    }

    /// Starts editing note `id`, or a blank note for `NEW_NOTE_ID`.
    pub fn load_note(&self, id: NoteId) {
        self.slot.clear();

        if id == NEW_NOTE_ID || id == UNSAVED_NOTE_ID {
            self.state.send_replace(DetailState {
                note: Note::blank(),
                phase: SessionPhase::Ready,
                placeholder: None,
            });
            debug!("event=note_load module=detail status=ok mode=new");
            return;
        }

        self.state.send_modify(|state| state.phase = SessionPhase::Loading);
        let state = Arc::clone(&self.state);
        self.slot
            .replace(self.repo.observe_by_id(id), move |result: LiveResult| {
                state.send_modify(|state| apply_loaded(state, id, result));
            });
    }

    pub fn update_title(&self, title: impl Into<String>) {
        let title = title.into();
        self.edit(|note| note.title = title);
    }

    pub fn update_content(&self, content: impl Into<String>) {
        let content = content.into();
        self.edit(|note| note.content = content);
    }

    /// Flips the favorite flag in memory; persisted by the next save.
    pub fn toggle_favorite(&self) {
        self.edit(|note| note.is_favorite = !note.is_favorite);
    }

    /// Applies a field edit. Editing a placeholder turns it into a new draft
    /// and stops following the id that failed to load.
    fn edit(&self, change: impl FnOnce(&mut Note)) {
        if self.state.borrow().placeholder.is_some() {
            self.slot.clear();
            debug!("event=note_edit module=detail status=ok mode=placeholder_to_draft");
        }
        self.state.send_modify(|state| {
            change(&mut state.note);
            state.placeholder = None;
        });
    }

    /// Persists the held note.
    ///
    /// New notes are inserted with `created_at == updated_at`; existing notes
    /// are updated with a fresh `updated_at`. Store failures are reported as
    /// `SaveOutcome::Failed` and leave the edits in place. Nothing is written
    /// while a load is pending, since the held note still belongs to the
    /// previous target.
    pub async fn save_note(&self) -> SaveOutcome {
        let snapshot = self.snapshot();
        if snapshot.phase == SessionPhase::Loading {
            info!("event=note_save module=detail status=skipped reason=loading");
            return SaveOutcome::Skipped(SkipReason::Loading);
        }
        if snapshot.placeholder.is_some() {
            info!("event=note_save module=detail status=skipped reason=placeholder");
            return SaveOutcome::Skipped(SkipReason::Placeholder);
        }
        if snapshot.note.is_empty() {
            info!("event=note_save module=detail status=skipped reason=empty");
            return SaveOutcome::Skipped(SkipReason::EmptyNote);
        }

        let now = self.clock.now();
        let mut pending = snapshot.note;
        pending.updated_at = Some(now);
        let is_new = pending.is_transient();
        if is_new {
            pending.created_at = Some(now);
        }

        self.state.send_modify(|state| state.phase = SessionPhase::Saving);
        let outcome = if is_new {
            match self.repo.insert(&pending).await {
                Ok(id) => SaveOutcome::Inserted(id),
                Err(err) => SaveOutcome::Failed(err),
            }
        } else {
            match self.repo.update(&pending).await {
                Ok(()) => SaveOutcome::Updated(pending.id),
                Err(err) => SaveOutcome::Failed(err),
            }
        };

        self.state.send_modify(|state| {
            match &outcome {
                SaveOutcome::Inserted(id) if state.note.is_transient() => {
                    state.note.id = *id;
                    state.note.created_at = Some(now);
                    state.note.updated_at = Some(now);
                }
                SaveOutcome::Updated(id) if state.note.id == *id => {
                    state.note.updated_at = Some(now);
                }
                _ => {}
            }
            if state.phase == SessionPhase::Saving {
                state.phase = SessionPhase::Ready;
            }
        });

        match &outcome {
            SaveOutcome::Inserted(id) | SaveOutcome::Updated(id) => {
                info!("event=note_save module=detail status=ok note_id={id} new={is_new}");
            }
            SaveOutcome::Failed(err) => {
                error!("event=note_save module=detail status=error new={is_new} error={err}");
            }
            SaveOutcome::Skipped(_) => {}
        }
        outcome
    }

    /// Saves in the background and calls `on_saved` exactly once.
    ///
    /// If the save task is dropped before finishing (runtime shutdown, abort),
    /// `on_saved` still runs with `SaveOutcome::Failed`.
    pub fn save_note_then<F>(&self, on_saved: F) -> JoinHandle<()>
    where
        F: FnOnce(SaveOutcome) + Send + 'static,
    {
        let session = self.clone();
        let mut completion = Completion::new(on_saved);
        self.repo.runtime().spawn(async move {
            let outcome = session.save_note().await;
            completion.complete(outcome);
        })
    }

    /// Stops following the loaded note. The held note is kept.
    pub fn close(&self) {
        self.slot.clear();
        self.state.send_modify(|state| {
            if state.phase == SessionPhase::Loading {
                state.phase = SessionPhase::Ready;
            }
        });
    }
}

fn apply_loaded(state: &mut DetailState, id: NoteId, result: LiveResult) {
    match result {
        Ok(rows) => match rows.into_iter().next() {
            Some(note) => {
                state.note = note;
                state.placeholder = None;
            }
            None => {
                warn!("event=note_load module=detail status=not_found note_id={id}");
                state.note = Note::not_found_placeholder();
                state.placeholder = Some(Placeholder::NotFound);
            }
        },
        Err(err) => {
            error!("event=note_load module=detail status=error note_id={id} error={err}");
            state.note = Note::error_placeholder();
            state.placeholder = Some(Placeholder::LoadFailed);
        }
    }
    state.phase = SessionPhase::Ready;
}

/// Callback wrapper that fires once, on completion or on drop.
struct Completion<F: FnOnce(SaveOutcome)> {
    callback: Option<F>,
}

impl<F: FnOnce(SaveOutcome)> Completion<F> {
    fn new(callback: F) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    fn complete(&mut self, outcome: SaveOutcome) {
        if let Some(callback) = self.callback.take() {
            callback(outcome);
        }
    }
}

impl<F: FnOnce(SaveOutcome)> Drop for Completion<F> {
    fn drop(&mut self) {
        self.complete(SaveOutcome::Failed(RepoError::TaskFailed(
            "save task dropped before completion".to_string(),
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_fires_once_when_completed() {
        let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let mut completion = Completion::new(move |outcome: SaveOutcome| {
            sink.lock().unwrap().push(outcome.is_persisted());
        });
        completion.complete(SaveOutcome::Inserted(1));
        drop(completion);
        assert_eq!(*calls.lock().unwrap(), vec![true]);
    }

    #[test]
    fn completion_fires_on_drop() {
        let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let completion = Completion::new(move |outcome: SaveOutcome| {
            sink.lock()
                .unwrap()
                .push(matches!(outcome, SaveOutcome::Failed(_)));
        });
        drop(completion);
        assert_eq!(*calls.lock().unwrap(), vec![true]);
    }

    #[test]
    fn not_found_emission_installs_placeholder() {
        let mut state = DetailState {
            phase: SessionPhase::Loading,
            ..DetailState::default()
        };
        apply_loaded(&mut state, 9, Ok(Vec::new()));
        assert_eq!(state.placeholder, Some(Placeholder::NotFound));
        assert_eq!(state.note, Note::not_found_placeholder());
        assert!(!state.is_loading());
    }

    #[test]
    fn failed_emission_installs_error_placeholder() {
        let mut state = DetailState::default();
        apply_loaded(&mut state, 9, Err(RepoError::LockPoisoned));
        assert_eq!(state.placeholder, Some(Placeholder::LoadFailed));
        assert_eq!(state.note.title, "Error");
        assert_eq!(state.phase, SessionPhase::Ready);
    }
}
