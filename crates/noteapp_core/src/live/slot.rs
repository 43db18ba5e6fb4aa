//! Single-occupancy subscription slot.
//!
//! A slot owns at most one running subscription. `replace` cancels the
//! current one and starts the next while holding the slot lock; deliveries
//! take the same lock and re-check their own cancellation token, so a
//! superseded subscription cannot deliver after `replace` returns.

use crate::live::query::{LiveQuery, LiveResult};
use log::debug;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Anything a slot can drive: an async sequence of items that ends with `None`.
pub trait LiveSource: Send + 'static {
    type Item: Send + 'static;

    fn next_item(&mut self) -> impl Future<Output = Option<Self::Item>> + Send;
}

impl LiveSource for LiveQuery {
    type Item = LiveResult;

    fn next_item(&mut self) -> impl Future<Output = Option<Self::Item>> + Send {
        self.next()
    }
}

impl<T: Send + 'static> LiveSource for mpsc::Receiver<T> {
    type Item = T;

    fn next_item(&mut self) -> impl Future<Output = Option<Self::Item>> + Send {
        self.recv()
    }
}

struct ActiveSubscription {
    generation: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Drop for ActiveSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

#[derive(Default)]
struct SlotShared {
    active: Mutex<Option<ActiveSubscription>>,
}

impl SlotShared {
    fn lock(&self) -> MutexGuard<'_, Option<ActiveSubscription>> {
        // A panicking consumer callback must not wedge the slot.
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Holder for one cancellable subscription (latest wins).
///
/// Clones share the same slot. The running subscription is cancelled when the
/// last clone is dropped.
#[derive(Clone)]
pub struct SubscriptionSlot {
    name: &'static str,
    shared: Arc<SlotShared>,
    runtime: Handle,
}

impl SubscriptionSlot {
    pub fn new(name: &'static str, runtime: Handle) -> Self {
        Self {
            name,
            shared: Arc::new(SlotShared::default()),
            runtime,
        }
    }

    /// Cancels the current subscription and starts driving `source`.
    ///
    /// `on_item` runs under the slot lock; it must not call back into this
    /// slot.
    pub fn replace<S, F>(&self, source: S, on_item: F)
    where
        S: LiveSource,
        F: FnMut(S::Item) + Send + 'static,
    {
        let mut active = self.shared.lock();
        let generation = active.as_ref().map_or(1, |current| current.generation + 1);
        drop(active.take());

        let cancel = CancellationToken::new();
        let task = self.runtime.spawn(drive(
            source,
            on_item,
            cancel.clone(),
            Arc::downgrade(&self.shared),
        ));
        *active = Some(ActiveSubscription {
            generation,
            cancel,
            task,
        });
        debug!(
            "event=slot_replace module=live status=ok slot={} generation={}",
            self.name, generation
        );
    }

    /// Cancels the current subscription, if any.
    pub fn clear(&self) {
        let previous = self.shared.lock().take();
        if let Some(previous) = previous {
            debug!(
                "event=slot_clear module=live status=ok slot={} generation={}",
                self.name, previous.generation
            );
        }
    }

    /// Returns whether a subscription is installed and still running.
    pub fn is_active(&self) -> bool {
        self.shared
            .lock()
            .as_ref()
            .is_some_and(|current| !current.task.is_finished())
    }

    /// Number of subscriptions started so far (0 when never used).
    pub fn generation(&self) -> u64 {
        self.shared
            .lock()
            .as_ref()
            .map_or(0, |current| current.generation)
    }
}

async fn drive<S, F>(
    mut source: S,
    mut on_item: F,
    cancel: CancellationToken,
    shared: Weak<SlotShared>,
) where
    S: LiveSource,
    F: FnMut(S::Item) + Send + 'static,
{
    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = source.next_item() => item,
        };
        let Some(item) = item else {
            break;
        };
        if !deliver(&shared, &cancel, &mut on_item, item) {
            break;
        }
    }
}

fn deliver<T, F>(
    shared: &Weak<SlotShared>,
    cancel: &CancellationToken,
    on_item: &mut F,
    item: T,
) -> bool
where
    F: FnMut(T),
{
    let Some(shared) = shared.upgrade() else {
        return false;
    };
    let _active = shared.lock();
    if cancel.is_cancelled() {
        return false;
    }
    on_item(item);
    true
}
