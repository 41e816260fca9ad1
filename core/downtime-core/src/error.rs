//! Error types for downtime-core operations.

use std::path::PathBuf;

/// All errors that can occur in downtime-core operations.
///
/// Validation failures are raised before any state is touched. Storage
/// failures wrap the underlying I/O, JSON or SQLite error together with a
/// short description of what was being attempted.
#[derive(Debug, thiserror::Error)]
pub enum DowntimeError {
    // ─────────────────────────────────────────────────────────────────────
    // Validation Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Unknown process: {0}")]
    UnknownProcess(String),

    #[error("Reason {reason:?} is not listed for process {process}")]
    UnknownReason { process: String, reason: String },

    #[error("Invalid stoppage: {0}")]
    Validation(String),

    // ─────────────────────────────────────────────────────────────────────
    // Storage Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("History table error: {path}: {source}")]
    History {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Invalid timestamp {value:?}: expected {format}")]
    InvalidTimestamp { value: String, format: &'static str },

    #[error("Could not determine {0}")]
    DirectoryNotFound(&'static str),
}

impl DowntimeError {
    /// True for errors raised by input checks rather than storage.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DowntimeError::UnknownProcess(_)
                | DowntimeError::UnknownReason { .. }
                | DowntimeError::Validation(_)
        )
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        DowntimeError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn history(path: impl Into<PathBuf>, source: rusqlite::Error) -> Self {
        DowntimeError::History {
            path: path.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using DowntimeError.
pub type Result<T> = std::result::Result<T, DowntimeError>;

// Conversion for string error compatibility
impl From<DowntimeError> for String {
    fn from(err: DowntimeError) -> String {
        err.to_string()
    }
}
