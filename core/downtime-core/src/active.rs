//! Active-stoppage store: the open stoppages, mirrored to a side file.
//!
//! The in-memory list is the source of truth while the program runs. After
//! every `open` and `close` the whole list is rewritten to
//! `paradas_ativas.json`, so an abrupt shutdown loses at most the operation
//! in flight.
//!
//! # File Format
//!
//! ```json
//! [
//!   {
//!     "id": "01HV...",
//!     "employee": "operador",
//!     "process": "Raku-Raku",
//!     "reason": "Troca de Cor",
//!     "started_at": "2024-03-14 08:00:00",
//!     "ended_at": null,
//!     "duration": null
//!   }
//! ]
//! ```
//!
//! Files written by the older tool use Portuguese keys (`funcionario`,
//! `processo`, `motivo`, `inicio`, `fim`, `duracao`) and carry no `id`; both
//! are accepted on load.
//!
//! # Defensive Design
//!
//! - Missing, empty or corrupt file: empty store, never an error.
//! - Individual records with an unknown process, unreadable timestamp or an
//!   end time already set are skipped with a warning.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::catalog::{resolve_reason, Process, ReasonChoice};
use crate::error::{DowntimeError, Result};
use crate::storage::atomic_write;
use crate::types::{format_timestamp, parse_timestamp, ClosedStoppage, Stoppage};

/// One entry of the side file.
#[derive(Debug, Serialize, Deserialize)]
struct SideRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(alias = "funcionario")]
    employee: String,
    #[serde(alias = "processo")]
    process: String,
    #[serde(alias = "motivo")]
    reason: String,
    #[serde(alias = "inicio")]
    started_at: String,
    #[serde(default, alias = "fim")]
    ended_at: Option<String>,
    #[serde(default, alias = "duracao")]
    duration: Option<f64>,
}

impl From<&Stoppage> for SideRecord {
    fn from(s: &Stoppage) -> Self {
        SideRecord {
            id: Some(s.id.clone()),
            employee: s.employee.clone(),
            process: s.process.name().to_string(),
            reason: s.reason.clone(),
            started_at: format_timestamp(&s.started_at),
            ended_at: None,
            duration: None,
        }
    }
}

impl SideRecord {
    fn into_stoppage(self) -> Result<Stoppage> {
        if self.ended_at.is_some() || self.duration.is_some() {
            return Err(DowntimeError::Validation(
                "record is already closed".to_string(),
            ));
        }
        let process = Process::parse(&self.process)?;
        let started_at = parse_timestamp(&self.started_at)?;
        Ok(Stoppage {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| ulid::Ulid::new().to_string()),
            employee: self.employee,
            process,
            reason: self.reason,
            started_at,
        })
    }
}

/// The result of removing a stoppage from the store.
///
/// The closed record is always handed back, even if rewriting the side file
/// failed, so the caller can still append it to the history.
#[derive(Debug)]
pub struct ClosedEntry {
    pub closed: ClosedStoppage,
    pub persisted: Result<()>,
}

/// Ordered list of open stoppages, optionally backed by a side file.
///
/// Create with [`ActiveStore::load`] at startup, or
/// [`ActiveStore::new_in_memory`] for tests.
#[derive(Debug)]
pub struct ActiveStore {
    stoppages: Vec<Stoppage>,
    file_path: Option<PathBuf>,
}

impl ActiveStore {
    pub fn new_in_memory() -> Self {
        ActiveStore {
            stoppages: Vec::new(),
            file_path: None,
        }
    }

    pub fn new(file_path: &Path) -> Self {
        ActiveStore {
            stoppages: Vec::new(),
            file_path: Some(file_path.to_path_buf()),
        }
    }

    /// Reads the side file. Absent or malformed content means nothing was
    /// in progress.
    pub fn load(file_path: &Path) -> Self {
        let mut store = ActiveStore::new(file_path);

        let content = match fs_err::read_to_string(file_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return store,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read active stoppages, starting empty");
                return store;
            }
        };

        if content.trim().is_empty() {
            tracing::warn!(path = %file_path.display(), "Empty active stoppage file");
            return store;
        }

        let records: Vec<SideRecord> = match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    path = %file_path.display(),
                    error = %e,
                    "Corrupt active stoppage file, starting empty"
                );
                return store;
            }
        };

        for (index, record) in records.into_iter().enumerate() {
            match record.into_stoppage() {
                Ok(stoppage) => store.stoppages.push(stoppage),
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping unreadable active stoppage");
                }
            }
        }

        tracing::debug!(count = store.stoppages.len(), "Loaded active stoppages");
        store
    }

    /// Rewrites the side file with the full current list.
    pub fn save(&self) -> Result<()> {
        let Some(file_path) = self.file_path.as_ref() else {
            return Ok(());
        };

        let records: Vec<SideRecord> = self.stoppages.iter().map(SideRecord::from).collect();
        let content = serde_json::to_string_pretty(&records).map_err(|e| DowntimeError::Json {
            context: "serializing active stoppages".to_string(),
            source: e,
        })?;

        atomic_write(file_path, &content)
    }

    /// Opens a stoppage and persists the list.
    ///
    /// Validation happens before anything changes. If the side file cannot
    /// be written the new entry is dropped again, so memory never holds a
    /// stoppage the file does not.
    pub fn open(
        &mut self,
        employee: &str,
        process: Process,
        reason: &ReasonChoice,
        now: NaiveDateTime,
    ) -> Result<Stoppage> {
        let employee = employee.trim();
        if employee.is_empty() {
            return Err(DowntimeError::Validation(
                "employee must not be empty".to_string(),
            ));
        }
        let reason = resolve_reason(process, reason)?;

        let stoppage = Stoppage::new(employee, process, &reason, now);
        self.stoppages.push(stoppage.clone());

        if let Err(e) = self.save() {
            self.stoppages.pop();
            return Err(e);
        }

        tracing::info!(
            id = %stoppage.id,
            process = %stoppage.process,
            reason = %stoppage.reason,
            employee = %stoppage.employee,
            "Stoppage opened"
        );
        Ok(stoppage)
    }

    /// Open stoppages in the order they were opened.
    pub fn list(&self) -> &[Stoppage] {
        &self.stoppages
    }

    pub fn get(&self, id: &str) -> Option<&Stoppage> {
        self.stoppages.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.stoppages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stoppages.is_empty()
    }

    /// Closes the stoppage with `id` at `now` and removes it.
    ///
    /// Returns `None` when no such stoppage is open; that is not an error.
    pub fn close(&mut self, id: &str, now: NaiveDateTime) -> Option<ClosedEntry> {
        let index = self.stoppages.iter().position(|s| s.id == id)?;
        let closed = self.stoppages.remove(index).close(now);

        let persisted = self.save();
        if let Err(e) = &persisted {
            tracing::warn!(id = %closed.id, error = %e, "Failed to rewrite active stoppages after close");
        }

        tracing::info!(
            id = %closed.id,
            process = %closed.process,
            duration_minutes = closed.duration_minutes,
            "Stoppage closed"
        );
        Some(ClosedEntry { closed, persisted })
    }
}
