//! Change bus for committed note writes.

use crate::model::note::NoteId;
use crate::repo::note_store::NoteQuery;
use log::debug;
use tokio::sync::broadcast;

/// Default broadcast channel capacity.
pub const DEFAULT_CHANGE_BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Inserted,
    Updated,
    Deleted,
}

/// One committed write against the `notes` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteChange {
    pub kind: ChangeKind,
    pub id: NoteId,
}

impl NoteChange {
    pub fn new(kind: ChangeKind, id: NoteId) -> Self {
        Self { kind, id }
    }

    /// Returns whether `query` may produce a different result after this write.
    ///
    /// Id lookups only care about their own row; every other filter is
    /// re-evaluated on any write.
    pub fn affects(&self, query: &NoteQuery) -> bool {
        match query {
            NoteQuery::ById(id) => *id == self.id,
            NoteQuery::All | NoteQuery::Favorites | NoteQuery::Search(_) => true,
        }
    }
}

/// Fan-out of `NoteChange` events to live queries.
///
/// Publishing never blocks. Without subscribers, events are dropped.
#[derive(Debug, Clone)]
pub struct ChangeBus {
    sender: broadcast::Sender<NoteChange>,
}

impl ChangeBus {
    /// Creates a bus; a zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NoteChange> {
        self.sender.subscribe()
    }

    pub fn publish(&self, change: NoteChange) {
        match self.sender.send(change) {
            Ok(receivers) => debug!(
                "event=note_change module=live status=ok kind={:?} note_id={} receivers={}",
                change.kind, change.id, receivers
            ),
            Err(_) => debug!(
                "event=note_change module=live status=dropped kind={:?} note_id={}",
                change.kind, change.id
            ),
        }
    }

    /// Number of live queries currently listening.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANGE_BUS_CAPACITY)
    }
}
