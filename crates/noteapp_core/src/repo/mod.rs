//! Repository layer: storage contract, SQLite implementation and async façade.
//!
//! # Responsibility
//! - Define the synchronous `NoteStore` contract and its SQLite implementation.
//! - Expose the async `NoteRepository` used by the list and detail layers.
//!
//! # Invariants
//! - Store calls never run on async worker threads; they go through
//!   `run_blocking`.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod note_repository;
pub mod note_store;

use note_store::{RepoError, RepoResult};
use tokio::runtime::Handle;

/// Runs a blocking store call on the runtime's blocking pool.
pub(crate) async fn run_blocking<T, F>(runtime: &Handle, call: F) -> RepoResult<T>
where
    F: FnOnce() -> RepoResult<T> + Send + 'static,
    T: Send + 'static,
{
    runtime
        .spawn_blocking(call)
        .await
        .map_err(|err| RepoError::TaskFailed(err.to_string()))?
}
