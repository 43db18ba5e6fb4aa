//! Process-level wiring.
//!
//! # Responsibility
//! - Build the single shared store, change bus and repository from config.
//! - Hand the same repository to every coordinator and session.
//!
//! # Invariants
//! - One `NoteApp` owns exactly one SQLite connection.

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, CoreConfig};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::detail::session::DetailEditSession;
use crate::list::coordinator::ListQueryCoordinator;
use crate::live::bus::ChangeBus;
use crate::logging::{init_logging, LoggingError};
use crate::repo::note_repository::NoteRepository;
use crate::repo::note_store::{RepoError, SqliteNoteStore};
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Logging(#[from] LoggingError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Shared note store plus factories for list and detail cores.
#[derive(Clone)]
pub struct NoteApp {
    repo: NoteRepository,
    clock: Arc<dyn Clock>,
}

impl NoteApp {
    /// Opens the configured database with the system clock.
    ///
    /// File logging is started when `config.log_dir` is set.
    pub fn open(config: &CoreConfig, runtime: Handle) -> Result<Self, AppError> {
        Self::open_with_clock(config, runtime, Arc::new(SystemClock))
    }

    pub fn open_with_clock(
        config: &CoreConfig,
        runtime: Handle,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        config.validate()?;
        if let Some(log_dir) = &config.log_dir {
            init_logging(&config.log_level, log_dir)?;
        }

        let conn = match &config.db_path {
            Some(path) => open_db(path)?,
            None => open_db_in_memory()?,
        };
        let store = SqliteNoteStore::try_new(conn)?;
        let repo = NoteRepository::new(
            Arc::new(store),
            ChangeBus::new(config.change_bus_capacity),
            runtime,
        )
        .with_live_buffer(config.live_query_buffer);

        Ok(Self { repo, clock })
    }

    /// Wraps an existing repository (custom stores, tests).
    pub fn from_repository(repo: NoteRepository, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub fn repository(&self) -> &NoteRepository {
        &self.repo
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Core for the list screen; starts observing all notes.
    pub fn list_coordinator(&self) -> ListQueryCoordinator {
        ListQueryCoordinator::new(self.repo.clone(), Arc::clone(&self.clock))
    }

    /// Core for the detail screen, initially idle.
    pub fn detail_session(&self) -> DetailEditSession {
        DetailEditSession::new(self.repo.clone(), Arc::clone(&self.clock))
    }
}
