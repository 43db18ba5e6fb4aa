//! Push-based live queries over the note store.
//!
//! # Responsibility
//! - Broadcast committed writes (`ChangeBus`).
//! - Re-run filtered queries after relevant writes (`LiveQuery`).
//! - Hold at most one cancellable subscription per logical slot
//!   (`SubscriptionSlot`).
//!
//! # Invariants
//! - Cancelling a subscription stops delivery before a replacement starts.
//! - A cancelled subscription never delivers another item.

pub mod bus;
pub mod query;
pub mod slot;

pub use bus::{ChangeBus, ChangeKind, NoteChange};
pub use query::LiveQuery;
pub use slot::{LiveSource, SubscriptionSlot};
