//! Core domain logic for the note app.
//! This crate owns note persistence, live list queries and the edit lifecycle.

pub mod app;
pub mod clock;
pub mod config;
pub mod db;
pub mod detail;
pub mod list;
pub mod live;
pub mod logging;
pub mod model;
pub mod repo;

pub use app::{AppError, NoteApp};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, CoreConfig};
pub use detail::session::{
    DetailEditSession, DetailState, Placeholder, SaveOutcome, SessionPhase, SkipReason,
};
pub use list::coordinator::{select_source, ListFilter, ListQueryCoordinator, ListSource};
pub use live::{ChangeBus, ChangeKind, LiveQuery, NoteChange, SubscriptionSlot};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{
    format_relative, format_relative_text, Note, NoteId, NEW_NOTE_ID, UNSAVED_NOTE_ID,
};
pub use repo::note_repository::NoteRepository;
pub use repo::note_store::{NoteQuery, NoteStore, RepoError, RepoResult, SqliteNoteStore};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
