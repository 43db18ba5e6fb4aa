mod common;

use common::{at, memory_store, stamped, titles};
use noteapp_core::{Note, NoteQuery, NoteStore, RepoError, SqliteNoteStore};
use rusqlite::Connection;

#[test]
fn insert_assigns_ids_and_lists_newest_first() {
    let store = memory_store();
    let first = store
        .insert_note(&stamped("Monday", "", at(4, 8, 0), false))
        .unwrap();
    let second = store
        .insert_note(&stamped("Tuesday", "", at(5, 8, 0), false))
        .unwrap();
    let third = store
        .insert_note(&stamped("Sunday", "", at(3, 8, 0), false))
        .unwrap();

    assert!(first > 0 && second > first && third > second);
    let notes = store.list_notes(&NoteQuery::All).unwrap();
    assert_eq!(titles(&notes), vec!["Tuesday", "Monday", "Sunday"]);
}

#[test]
fn equal_creation_times_fall_back_to_newest_id() {
    let store = memory_store();
    store
        .insert_note(&stamped("older", "", at(5, 9, 0), false))
        .unwrap();
    store
        .insert_note(&stamped("newer", "", at(5, 9, 0), false))
        .unwrap();

    let notes = store.list_notes(&NoteQuery::All).unwrap();
    assert_eq!(titles(&notes), vec!["newer", "older"]);
}

#[test]
fn stored_note_round_trips_every_field() {
    let store = memory_store();
    let mut note = stamped("Groceries", "milk\neggs", at(5, 9, 0), true);
    note.updated_at = Some(at(5, 10, 30));
    let id = store.insert_note(&note).unwrap();

    let loaded = store.list_notes(&NoteQuery::ById(id)).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0], Note { id, ..note });
}

#[test]
fn favorites_query_returns_only_favorites() {
    let store = memory_store();
    store
        .insert_note(&stamped("plain", "", at(3, 9, 0), false))
        .unwrap();
    store
        .insert_note(&stamped("starred", "", at(4, 9, 0), true))
        .unwrap();
    store
        .insert_note(&stamped("also starred", "", at(5, 9, 0), true))
        .unwrap();

    let notes = store.list_notes(&NoteQuery::Favorites).unwrap();
    assert_eq!(titles(&notes), vec!["also starred", "starred"]);
    assert!(notes.iter().all(|note| note.is_favorite));
}

#[test]
fn search_matches_title_or_content_substring() {
    let store = memory_store();
    store
        .insert_note(&stamped("Cake recipe", "flour", at(3, 9, 0), false))
        .unwrap();
    store
        .insert_note(&stamped("Party", "buy a cake", at(4, 9, 0), false))
        .unwrap();
    store
        .insert_note(&stamped("Errands", "post office", at(5, 9, 0), false))
        .unwrap();

    let notes = store
        .list_notes(&NoteQuery::Search("cake".to_string()))
        .unwrap();
    assert_eq!(titles(&notes), vec!["Party", "Cake recipe"]);
}

#[test]
fn search_treats_like_wildcards_literally() {
    let store = memory_store();
    store
        .insert_note(&stamped("discount", "100% off", at(3, 9, 0), false))
        .unwrap();
    store
        .insert_note(&stamped("budget", "1000 total", at(4, 9, 0), false))
        .unwrap();
    store
        .insert_note(&stamped("file_name", "", at(5, 9, 0), false))
        .unwrap();
    store
        .insert_note(&stamped("filename", "", at(5, 10, 0), false))
        .unwrap();

    let percent = store
        .list_notes(&NoteQuery::Search("100%".to_string()))
        .unwrap();
    assert_eq!(titles(&percent), vec!["discount"]);

    let underscore = store
        .list_notes(&NoteQuery::Search("file_".to_string()))
        .unwrap();
    assert_eq!(titles(&underscore), vec!["file_name"]);
}

#[test]
fn by_id_returns_zero_or_one_note() {
    let store = memory_store();
    let id = store
        .insert_note(&stamped("only", "", at(5, 9, 0), false))
        .unwrap();

    assert_eq!(store.list_notes(&NoteQuery::ById(id)).unwrap().len(), 1);
    assert!(store
        .list_notes(&NoteQuery::ById(id + 100))
        .unwrap()
        .is_empty());
}

#[test]
fn insert_rejects_persisted_ids_and_missing_timestamps() {
    let store = memory_store();

    let mut persisted = stamped("persisted", "", at(5, 9, 0), false);
    persisted.id = 7;
    assert!(matches!(
        store.insert_note(&persisted).unwrap_err(),
        RepoError::InvalidData(_)
    ));

    let unstamped = Note::new("unstamped", "");
    assert!(matches!(
        store.insert_note(&unstamped).unwrap_err(),
        RepoError::InvalidData(_)
    ));
    assert!(store.list_notes(&NoteQuery::All).unwrap().is_empty());
}

#[test]
fn update_rewrites_fields_but_keeps_created_at() {
    let store = memory_store();
    let id = store
        .insert_note(&stamped("draft", "", at(4, 9, 0), false))
        .unwrap();

    let edited = Note {
        id,
        title: "final".to_string(),
        content: "body".to_string(),
        created_at: Some(at(1, 0, 0)),
        updated_at: Some(at(5, 12, 0)),
        is_favorite: true,
    };
    store.update_note(&edited).unwrap();

    let loaded = store.list_notes(&NoteQuery::ById(id)).unwrap().remove(0);
    assert_eq!(loaded.title, "final");
    assert_eq!(loaded.content, "body");
    assert!(loaded.is_favorite);
    assert_eq!(loaded.created_at, Some(at(4, 9, 0)));
    assert_eq!(loaded.updated_at, Some(at(5, 12, 0)));
}

#[test]
fn update_and_delete_of_missing_note_return_not_found() {
    let store = memory_store();
    let mut ghost = stamped("ghost", "", at(5, 9, 0), false);
    ghost.id = 42;

    assert!(matches!(
        store.update_note(&ghost).unwrap_err(),
        RepoError::NotFound(42)
    ));
    assert!(matches!(
        store.delete_note(42).unwrap_err(),
        RepoError::NotFound(42)
    ));
}

#[test]
fn delete_removes_the_row() {
    let store = memory_store();
    let keep = store
        .insert_note(&stamped("keep", "", at(4, 9, 0), false))
        .unwrap();
    let drop_id = store
        .insert_note(&stamped("drop", "", at(5, 9, 0), false))
        .unwrap();

    store.delete_note(drop_id).unwrap();

    let notes = store.list_notes(&NoteQuery::All).unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].id, keep);
}

#[test]
fn try_new_requires_migrated_notes_table() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteNoteStore::try_new(conn).err().unwrap();
    assert!(matches!(err, RepoError::MissingRequiredTable("notes")));
}

#[test]
fn try_new_rejects_notes_table_missing_columns() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE notes (id INTEGER PRIMARY KEY, title TEXT);")
        .unwrap();
    let err = SqliteNoteStore::try_new(conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::MissingRequiredColumn { table: "notes", .. }
    ));
}

#[test]
fn corrupt_timestamp_is_reported_instead_of_masked() {
    let conn = noteapp_core::db::open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO notes (title, content, createdAt, updatedAt, isFavorite)
         VALUES ('broken', '', 'yesterday', '2024-03-05T09:00:00.000', 0);",
        [],
    )
    .unwrap();
    let store = SqliteNoteStore::try_new(conn).unwrap();

    let err = store.list_notes(&NoteQuery::All).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}
