//! CLI smoke entry point.
//!
//! # Responsibility
//! - Exercise the note core end to end: create, list, favorite, search, delete.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `noteapp_cli [config.json]`. Without a config the database lives in
//! memory and file logging stays off.

use log::info;
use noteapp_core::{
    format_relative, CoreConfig, ListQueryCoordinator, Note, NoteApp, NoteQuery, SaveOutcome,
    NEW_NOTE_ID,
};
use std::error::Error;
use std::time::Duration;
use tokio::sync::watch;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

type CliResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

fn main() -> CliResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => CoreConfig::from_file(path)?,
        None => CoreConfig::default(),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_time()
        .build()?;
    runtime.block_on(run(config))
}

async fn run(config: CoreConfig) -> CliResult<()> {
    println!("noteapp_core ping={}", noteapp_core::ping());
    println!("noteapp_core version={}", noteapp_core::core_version());

    let app = NoteApp::open(&config, tokio::runtime::Handle::current())?;
    let list = app.list_coordinator();
    let mut notes = list.subscribe_notes();
    let baseline = list.notes().len();

    for (title, content) in [
        ("Groceries", "milk, eggs, cake flour"),
        ("Birthday", "order the cake"),
        ("Errands", "post office"),
    ] {
        let session = app.detail_session();
        session.load_note(NEW_NOTE_ID);
        session.update_title(title);
        session.update_content(content);
        match session.save_note().await {
            SaveOutcome::Inserted(id) => println!("created id={id} title={title}"),
            SaveOutcome::Failed(err) => return Err(err.into()),
            other => println!("save title={title} outcome={other:?}"),
        }
    }

    let all = settle(&mut notes, |shown| shown.len() >= baseline + 3).await?;
    print_list("all", &all, &app);

    if let Some(birthday) = all.iter().find(|note| note.title == "Birthday") {
        list.toggle_favorite(birthday).await?;
    }
    list.set_favorites_only(true);
    let favorites = settle(&mut notes, |shown| {
        shown.iter().all(|note| note.is_favorite)
            && shown.iter().any(|note| note.title == "Birthday")
    })
    .await?;
    print_list("favorites", &favorites, &app);

    list.set_search_query("cake");
    let matches = settle(&mut notes, |shown| {
        shown.iter().any(|note| note.title == "Groceries")
    })
    .await?;
    print_list("search=cake", &matches, &app);

    delete_titled(&list, &matches, "Groceries").await?;
    let remaining = settle(&mut notes, |shown| {
        shown.iter().all(|note| note.title != "Groceries")
    })
    .await?;
    print_list("search=cake after delete", &remaining, &app);

    list.close();
    let total = app.repository().fetch(NoteQuery::All).await?.len();
    println!("total notes={total}");
    info!("event=cli_smoke module=cli status=ok total={total}");
    Ok(())
}

async fn settle<F>(notes: &mut watch::Receiver<Vec<Note>>, ready: F) -> CliResult<Vec<Note>>
where
    F: FnMut(&Vec<Note>) -> bool,
{
    let shown = tokio::time::timeout(SETTLE_TIMEOUT, notes.wait_for(ready)).await??;
    Ok(shown.clone())
}

async fn delete_titled(list: &ListQueryCoordinator, notes: &[Note], title: &str) -> CliResult<()> {
    if let Some(note) = notes.iter().find(|note| note.title == title) {
        list.delete(note).await?;
        println!("deleted id={} title={title}", note.id);
    }
    Ok(())
}

fn print_list(label: &str, notes: &[Note], app: &NoteApp) {
    let now = app.clock().now();
    println!("[{label}] count={}", notes.len());
    for note in notes {
        let created = note
            .created_at
            .as_ref()
            .map(|value| format_relative(value, &now))
            .unwrap_or_default();
        let star = if note.is_favorite { "*" } else { " " };
        println!(
            "  {star} #{} {} ({created}) {}",
            note.id,
            note.title,
            note.preview()
        );
    }
}
