//! Note store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide synchronous CRUD and filtered list queries over the `notes` table.
//! - Keep SQL details and timestamp encoding inside the persistence boundary.
//!
//! # Invariants
//! - List results are ordered by `createdAt DESC, id DESC`.
//! - Inserts never write a caller-provided id; SQLite assigns it.
//! - Updates never rewrite `createdAt`.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::DbError;
use crate::model::note::{format_timestamp, parse_timestamp, Note, NoteId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    title,
    content,
    createdAt,
    updatedAt,
    isFavorite
FROM notes";

const NOTE_ORDER_SQL: &str = " ORDER BY createdAt DESC, id DESC";

const NOTE_COLUMNS: [&str; 6] = [
    "id",
    "title",
    "content",
    "createdAt",
    "updatedAt",
    "isFavorite",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence and query errors for note storage.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("note not found: {0}")]
    NotFound(NoteId),
    #[error("invalid note data: {0}")]
    InvalidData(String),
    #[error("note store requires table `{0}`")]
    MissingRequiredTable(&'static str),
    #[error("note store requires column `{column}` in table `{table}`")]
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    #[error("note store connection lock is poisoned")]
    LockPoisoned,
    #[error("note store task failed: {0}")]
    TaskFailed(String),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter applied by list/observe operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NoteQuery {
    /// Every note.
    All,
    /// Notes with `is_favorite = true`.
    Favorites,
    /// Notes whose title or content contains the text.
    Search(String),
    /// Zero or one note with the given id.
    ById(NoteId),
}

/// Synchronous storage contract consumed by `NoteRepository`.
pub trait NoteStore: Send + Sync {
    /// Lists notes matching `query`, newest first.
    fn list_notes(&self, query: &NoteQuery) -> RepoResult<Vec<Note>>;
    /// Inserts a transient note and returns the assigned id.
    fn insert_note(&self, note: &Note) -> RepoResult<NoteId>;
    /// Replaces title, content, `updatedAt` and favorite flag of a stored note.
    fn update_note(&self, note: &Note) -> RepoResult<()>;
    /// Hard-deletes a note by id.
    fn delete_note(&self, id: NoteId) -> RepoResult<()>;
}

/// SQLite-backed note store.
///
/// The connection is guarded by a mutex so the store can be shared with the
/// blocking pool.
pub struct SqliteNoteStore {
    conn: Mutex<Connection>,
}

impl SqliteNoteStore {
    /// Wraps a migrated connection after checking the `notes` schema.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_notes_table_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepoError::LockPoisoned)
    }
}

impl NoteStore for SqliteNoteStore {
    fn list_notes(&self, query: &NoteQuery) -> RepoResult<Vec<Note>> {
        let mut sql = String::from(NOTE_SELECT_SQL);
        let mut bind_values: Vec<Value> = Vec::new();

        match query {
            NoteQuery::All => {}
            NoteQuery::Favorites => sql.push_str(" WHERE isFavorite = 1"),
            NoteQuery::Search(text) => {
                sql.push_str(" WHERE title LIKE ?1 ESCAPE '\\' OR content LIKE ?1 ESCAPE '\\'");
                bind_values.push(Value::Text(format!("%{}%", escape_like(text))));
            }
            NoteQuery::ById(id) => {
                sql.push_str(" WHERE id = ?1");
                bind_values.push(Value::Integer(*id));
            }
        }
        sql.push_str(NOTE_ORDER_SQL);

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn insert_note(&self, note: &Note) -> RepoResult<NoteId> {
        if !note.is_transient() {
            return Err(RepoError::InvalidData(format!(
                "insert expects an unsaved note, got id {}",
                note.id
            )));
        }
        let created_at = note
            .created_at
            .as_ref()
            .ok_or_else(|| RepoError::InvalidData("insert requires created_at".to_string()))?;
        let updated_at = note
            .updated_at
            .as_ref()
            .ok_or_else(|| RepoError::InvalidData("insert requires updated_at".to_string()))?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO notes (
                title,
                content,
                createdAt,
                updatedAt,
                isFavorite
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                note.title.as_str(),
                note.content.as_str(),
                format_timestamp(created_at),
                format_timestamp(updated_at),
                bool_to_int(note.is_favorite),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_note(&self, note: &Note) -> RepoResult<()> {
        if note.id <= 0 {
            return Err(RepoError::InvalidData(format!(
                "update expects a persisted note, got id {}",
                note.id
            )));
        }
        let updated_at = note
            .updated_at
            .as_ref()
            .ok_or_else(|| RepoError::InvalidData("update requires updated_at".to_string()))?;

        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE notes
             SET
                title = ?1,
                content = ?2,
                updatedAt = ?3,
                isFavorite = ?4
             WHERE id = ?5;",
            params![
                note.title.as_str(),
                note.content.as_str(),
                format_timestamp(updated_at),
                bool_to_int(note.is_favorite),
                note.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(note.id));
        }
        Ok(())
    }

    fn delete_note(&self, id: NoteId) -> RepoResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM notes WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

/// Escapes `LIKE` wildcards so user text matches literally.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id: NoteId = row.get("id")?;
    let created_text: String = row.get("createdAt")?;
    let created_at = parse_timestamp(&created_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid createdAt value `{created_text}` for note {id}"
        ))
    })?;
    let updated_text: String = row.get("updatedAt")?;
    let updated_at = parse_timestamp(&updated_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid updatedAt value `{updated_text}` for note {id}"
        ))
    })?;
    let is_favorite = match row.get::<_, i64>("isFavorite")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid isFavorite value `{other}` for note {id}"
            )));
        }
    };

    Ok(Note {
        id,
        title: row.get("title")?,
        content: row.get("content")?,
        created_at: Some(created_at),
        updated_at: Some(updated_at),
        is_favorite,
    })
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

fn ensure_notes_table_ready(conn: &Connection) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'notes'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::MissingRequiredTable("notes"));
    }

    let mut stmt = conn.prepare("PRAGMA table_info(notes);")?;
    let mut rows = stmt.query([])?;
    let mut present = Vec::new();
    while let Some(row) = rows.next()? {
        present.push(row.get::<_, String>(1)?);
    }
    for column in NOTE_COLUMNS {
        if !present.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: "notes",
                column,
            });
        }
    }
    Ok(())
}
