//! DowntimeEngine - the entry point for front ends.
//!
//! Owns the settings, the active-stoppage store and the history handle, and
//! exposes the operations a front end needs. There is no global state: the
//! engine is created by whoever drives the session and passed around
//! explicitly.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use downtime_core::{DowntimeEngine, ReasonChoice};
//!
//! let mut engine = DowntimeEngine::new()?;
//! let now = chrono::Local::now().naive_local();
//! let stoppage = engine.open_stoppage(
//!     "operador",
//!     "Raku-Raku",
//!     &ReasonChoice::Listed("Troca de Cor".into()),
//!     now,
//! )?;
//! let outcome = engine.close_stoppage(&stoppage.id, chrono::Local::now().naive_local());
//! ```

use std::path::PathBuf;

use chrono::NaiveDateTime;

use crate::active::ActiveStore;
use crate::aggregate::{summarize, HistorySummary};
use crate::catalog::{Process, ReasonChoice};
use crate::config::{load_config, save_config, AppConfig};
use crate::error::{DowntimeError, Result};
use crate::history::{HistoryRow, HistoryStore};
use crate::storage::{ensure_dir, history_file, StorageConfig};
use crate::types::{ClosedStoppage, Stoppage};

/// What happened when a stoppage was closed.
///
/// The stoppage has left the active store regardless of the two results
/// below. A failed history write means the record exists only in `closed`
/// and should be reported to the operator prominently.
#[derive(Debug)]
pub struct CloseOutcome {
    pub closed: ClosedStoppage,
    pub history: Result<()>,
    pub side_file: Result<()>,
}

impl CloseOutcome {
    pub fn is_recorded(&self) -> bool {
        self.history.is_ok()
    }
}

/// The main engine for downtime tracking.
#[derive(Debug)]
pub struct DowntimeEngine {
    storage: StorageConfig,
    config: AppConfig,
    active: ActiveStore,
    history: HistoryStore,
}

impl DowntimeEngine {
    /// Creates an engine rooted in the default app directory.
    pub fn new() -> Result<Self> {
        Self::with_storage(StorageConfig::new()?)
    }

    /// Creates an engine with a custom storage configuration.
    ///
    /// Loads settings and any stoppages left open by a previous run.
    ///
    /// An unusable history directory is only logged here; it surfaces as an
    /// error on the history operations themselves.
    pub fn with_storage(storage: StorageConfig) -> Result<Self> {
        storage.ensure_dirs()?;
        let config = load_config(&storage.config_file());
        if let Err(e) = ensure_dir(&config.storage_directory) {
            tracing::warn!(
                dir = %config.storage_directory.display(),
                error = %e,
                "History directory is not available"
            );
        }

        let active = ActiveStore::load(&storage.active_file());
        let history = HistoryStore::new(history_file(&config.storage_directory));

        tracing::info!(
            root = %storage.root().display(),
            history = %history.path().display(),
            open_stoppages = active.len(),
            "Downtime engine ready"
        );

        Ok(Self {
            storage,
            config,
            active,
            history,
        })
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn history_store(&self) -> &HistoryStore {
        &self.history
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Stoppages API
    // ─────────────────────────────────────────────────────────────────────────────

    /// Opens a stoppage for `process` (display name or slug).
    pub fn open_stoppage(
        &mut self,
        employee: &str,
        process: &str,
        reason: &ReasonChoice,
        now: NaiveDateTime,
    ) -> Result<Stoppage> {
        let process = Process::parse(process)?;
        self.active.open(employee, process, reason, now)
    }

    /// Open stoppages in the order they were opened.
    pub fn active_stoppages(&self) -> &[Stoppage] {
        self.active.list()
    }

    /// Closes a stoppage and appends it to the history.
    ///
    /// Returns `None` if no open stoppage has this id. The stoppage is
    /// removed from the active list even when the history write fails.
    pub fn close_stoppage(&mut self, id: &str, now: NaiveDateTime) -> Option<CloseOutcome> {
        let entry = self.active.close(id, now)?;
        let history = self.history.append(&entry.closed);
        if let Err(e) = &history {
            tracing::error!(
                id = %entry.closed.id,
                process = %entry.closed.process,
                reason = %entry.closed.reason,
                duration_minutes = entry.closed.duration_minutes,
                error = %e,
                "Failed to save stoppage to history"
            );
        }
        Some(CloseOutcome {
            closed: entry.closed,
            history,
            side_file: entry.persisted,
        })
    }

    /// Final save of the open stoppages before the program exits.
    pub fn shutdown(&self) -> Result<()> {
        self.active.save()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // History API
    // ─────────────────────────────────────────────────────────────────────────────

    /// `None` when there is no history table yet.
    pub fn history(&self) -> Result<Option<Vec<HistoryRow>>> {
        let mut rows = Vec::new();
        let found = self.history.for_each_row(|row| rows.push(row))?;
        Ok(found.then_some(rows))
    }

    pub fn summary(&self) -> Result<HistorySummary> {
        summarize(&self.history)
    }

    /// Deletes all history. The caller is responsible for confirmation.
    pub fn wipe_history(&self) -> Result<bool> {
        self.history.wipe()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Settings API
    // ─────────────────────────────────────────────────────────────────────────────

    /// Moves future history writes to `dir` and saves the settings.
    ///
    /// Existing history in the previous directory is left where it is.
    pub fn set_storage_directory(&mut self, dir: PathBuf) -> Result<()> {
        if dir.as_os_str().is_empty() {
            return Err(DowntimeError::Validation(
                "storage directory must not be empty".to_string(),
            ));
        }
        ensure_dir(&dir)?;

        let mut updated = self.config.clone();
        updated.storage_directory = dir;
        save_config(&self.storage.config_file(), &updated)?;

        self.history = HistoryStore::new(history_file(&updated.storage_directory));
        self.config = updated;
        tracing::info!(dir = %self.config.storage_directory.display(), "Storage directory changed");
        Ok(())
    }

    /// Remembers `user` for the next start, or forgets it with `None`.
    pub fn remember_user(&mut self, user: Option<&str>) -> Result<()> {
        let mut updated = self.config.clone();
        updated.set_remembered_user(user);
        save_config(&self.storage.config_file(), &updated)?;
        self.config = updated;
        Ok(())
    }

    /// One-line status: open stoppage count and current user.
    pub fn status_line(&self, user: &str) -> String {
        format!("Paradas ativas: {} • Usuário: {}", self.active.len(), user)
    }
}
