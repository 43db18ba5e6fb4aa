#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use noteapp_core::db::open_db_in_memory;
use noteapp_core::{
    ChangeBus, ManualClock, Note, NoteId, NoteQuery, NoteRepository, NoteStore, RepoError,
    RepoResult, SqliteNoteStore,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .unwrap()
}

pub fn manual_clock() -> ManualClock {
    ManualClock::new(at(5, 9, 0))
}

pub fn memory_store() -> SqliteNoteStore {
    SqliteNoteStore::try_new(open_db_in_memory().unwrap()).unwrap()
}

/// Persisted-shape note ready for `insert_note`.
pub fn stamped(title: &str, content: &str, created: NaiveDateTime, favorite: bool) -> Note {
    Note {
        created_at: Some(created),
        updated_at: Some(created),
        is_favorite: favorite,
        ..Note::new(title, content)
    }
}

pub fn repository(store: Arc<dyn NoteStore>) -> NoteRepository {
    NoteRepository::new(store, ChangeBus::default(), Handle::current())
}

/// Waits until the watched value satisfies `pred` and returns a copy of it.
pub async fn wait_until<T, F>(rx: &mut watch::Receiver<T>, pred: F) -> T
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    let value = tokio::time::timeout(WAIT_TIMEOUT, rx.wait_for(pred))
        .await
        .expect("timed out waiting for state")
        .expect("state sender dropped");
    (*value).clone()
}

/// Gives spawned tasks and blocking reads time to run.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
}

pub fn titles(notes: &[Note]) -> Vec<&str> {
    notes.iter().map(|note| note.title.as_str()).collect()
}

/// SQLite store that counts calls, records inserts and can be told to fail.
pub struct RecordingStore {
    inner: SqliteNoteStore,
    pub reads: AtomicUsize,
    pub inserts: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
    pub inserted: Mutex<Vec<Note>>,
    pub updated: Mutex<Vec<Note>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: memory_store(),
            reads: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            inserted: Mutex::new(Vec::new()),
            updated: Mutex::new(Vec::new()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn seed(&self, note: &Note) -> NoteId {
        self.inner.insert_note(note).unwrap()
    }

    pub fn get(&self, id: NoteId) -> Option<Note> {
        self.find(&NoteQuery::ById(id)).into_iter().next()
    }

    /// Reads straight from SQLite without counting or failing.
    pub fn find(&self, query: &NoteQuery) -> Vec<Note> {
        self.inner.list_notes(query).unwrap()
    }

    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn write_guard(&self) -> RepoResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::InvalidData("store unavailable".to_string()));
        }
        Ok(())
    }
}

impl NoteStore for RecordingStore {
    fn list_notes(&self, query: &NoteQuery) -> RepoResult<Vec<Note>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepoError::InvalidData("store unavailable".to_string()));
        }
        self.inner.list_notes(query)
    }

    fn insert_note(&self, note: &Note) -> RepoResult<NoteId> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.write_guard()?;
        self.inserted.lock().unwrap().push(note.clone());
        self.inner.insert_note(note)
    }

    fn update_note(&self, note: &Note) -> RepoResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.write_guard()?;
        self.updated.lock().unwrap().push(note.clone());
        self.inner.update_note(note)
    }

    fn delete_note(&self, id: NoteId) -> RepoResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.write_guard()?;
        self.inner.delete_note(id)
    }
}
