//! Note domain model.
//!
//! # Responsibility
//! - Define the note record and its identity sentinels.
//! - Derive list projections (`preview`, `is_empty`).
//! - Encode/decode ISO-8601 local date-time text used by storage.
//!
//! # Invariants
//! - `id == UNSAVED_NOTE_ID` marks an in-memory note that was never inserted.
//! - `created_at` is stamped once, on first insert; `updated_at` on every save.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Integer identity assigned by the store.
pub type NoteId = i64;

/// Identity carried by a note that has not been inserted yet.
pub const UNSAVED_NOTE_ID: NoteId = 0;

/// Screen-contract id meaning "open the editor for a new note".
pub const NEW_NOTE_ID: NoteId = -1;

/// Maximum number of content characters kept in `Note::preview`.
pub const PREVIEW_MAX_CHARS: usize = 100;

/// Storage format for timestamps (ISO-8601 local date-time, no offset).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const NOT_FOUND_TITLE: &str = "Note not found";
const ERROR_TITLE: &str = "Error";
const ERROR_CONTENT: &str = "Could not load note details.";

/// A short text note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Store-assigned id, or `UNSAVED_NOTE_ID` for transient notes.
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// Set at first insert. `None` on blank in-memory notes.
    pub created_at: Option<NaiveDateTime>,
    /// Refreshed by every committed mutation.
    pub updated_at: Option<NaiveDateTime>,
    pub is_favorite: bool,
}

impl Note {
    /// Creates a transient note with the given fields and no timestamps.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Blank transient note used for the "new note" intent.
    pub fn blank() -> Self {
        Self::default()
    }

    /// Placeholder shown when a requested note does not exist.
    pub fn not_found_placeholder() -> Self {
        Self::new(NOT_FOUND_TITLE, "")
    }

    /// Placeholder shown when loading a note failed.
    pub fn error_placeholder() -> Self {
        Self::new(ERROR_TITLE, ERROR_CONTENT)
    }

    /// Returns whether this note was never inserted.
    pub fn is_transient(&self) -> bool {
        self.id == UNSAVED_NOTE_ID
    }

    /// Returns whether both title and content are blank.
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }

    /// First 100 content characters with newlines flattened, trimmed.
    pub fn preview(&self) -> String {
        let head: String = self.content.chars().take(PREVIEW_MAX_CHARS).collect();
        head.replace('\n', " ").trim().to_string()
    }
}

/// Formats a timestamp into its stored text form.
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses stored timestamp text. Fractional seconds are optional.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_PARSE_FORMAT).ok()
}

/// Human label for list rows: `Today 09:30`, `Yesterday 18:02` or `Mar 05, 2024`.
pub fn format_relative(value: &NaiveDateTime, now: &NaiveDateTime) -> String {
    let today = now.date();
    let date = value.date();
    if date == today {
        format!("Today {}", value.format("%H:%M"))
    } else if Some(date) == today.pred_opt() {
        format!("Yesterday {}", value.format("%H:%M"))
    } else {
        value.format("%b %d, %Y").to_string()
    }
}

/// Same as `format_relative`, but starting from stored text.
///
/// Unparsable input is returned unchanged.
pub fn format_relative_text(value: &str, now: &NaiveDateTime) -> String {
    match parse_timestamp(value) {
        Some(parsed) => format_relative(&parsed, now),
        None => value.to_string(),
    }
}
