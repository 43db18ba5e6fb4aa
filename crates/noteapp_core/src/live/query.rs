//! Live (push-based) note queries.
//!
//! # Invariants
//! - The change bus is subscribed before the first read, so no write that
//!   commits after `observe` returns can be missed.
//! - A result set identical to the previous emission is not re-sent.
//! - Dropping a `LiveQuery` cancels its producer task.

use crate::live::bus::{ChangeBus, NoteChange};
use crate::model::note::Note;
use crate::repo::note_store::{NoteQuery, NoteStore, RepoResult};
use crate::repo::run_blocking;
use log::{debug, warn};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// One emission of a live query.
pub type LiveResult = RepoResult<Vec<Note>>;

/// Subscription to a filtered note list that re-emits after relevant writes.
pub struct LiveQuery {
    query: NoteQuery,
    receiver: mpsc::Receiver<LiveResult>,
    cancel: CancellationToken,
}

impl LiveQuery {
    pub(crate) fn spawn(
        query: NoteQuery,
        store: Arc<dyn NoteStore>,
        bus: &ChangeBus,
        runtime: &Handle,
        buffer: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let cancel = CancellationToken::new();
        let changes = bus.subscribe();
        runtime.spawn(produce(
            query.clone(),
            runtime.clone(),
            store,
            changes,
            sender,
            cancel.clone(),
        ));
        Self {
            query,
            receiver,
            cancel,
        }
    }

    pub fn query(&self) -> &NoteQuery {
        &self.query
    }

    /// Waits for the next result set. `None` once the query has ended.
    pub async fn next(&mut self) -> Option<LiveResult> {
        self.receiver.recv().await
    }

    /// Stops the producer. Already buffered results are discarded.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn produce(
    query: NoteQuery,
    runtime: Handle,
    store: Arc<dyn NoteStore>,
    mut changes: broadcast::Receiver<NoteChange>,
    sender: mpsc::Sender<LiveResult>,
    cancel: CancellationToken,
) {
    let mut last_emitted: Option<Vec<Note>> = None;
    loop {
        let read_store = Arc::clone(&store);
        let read_query = query.clone();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = run_blocking(&runtime, move || read_store.list_notes(&read_query)) => result,
        };

        let item = match result {
            Ok(notes) if last_emitted.as_ref() == Some(&notes) => None,
            Ok(notes) => {
                last_emitted = Some(notes.clone());
                Some(Ok(notes))
            }
            Err(err) => {
                warn!("event=live_query module=live status=error query={query:?} error={err}");
                last_emitted = None;
                Some(Err(err))
            }
        };

        if let Some(item) = item {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = sender.send(item) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }

        if !wait_for_relevant_change(&query, &mut changes, &cancel).await {
            break;
        }
    }
    debug!("event=live_query module=live status=stopped query={query:?}");
}

/// Returns `false` when the query should stop.
async fn wait_for_relevant_change(
    query: &NoteQuery,
    changes: &mut broadcast::Receiver<NoteChange>,
    cancel: &CancellationToken,
) -> bool {
    loop {
        let received = tokio::select! {
            biased;
            _ = cancel.cancelled() => return false,
            received = changes.recv() => received,
        };
        match received {
            Ok(change) if change.affects(query) => return true,
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                debug!("event=live_query module=live status=lagged skipped={skipped}");
                return true;
            }
            Err(RecvError::Closed) => return false,
        }
    }
}
