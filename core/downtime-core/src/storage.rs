//! Storage paths and file helpers.
//!
//! `StorageConfig` owns the application root, which holds the settings file,
//! the active-stoppage side file and logs. The history table lives in the
//! operator-chosen storage directory recorded in [`crate::config::AppConfig`],
//! so it is resolved separately through [`history_file`].
//!
//! Tests use `StorageConfig::with_root(temp_dir)` for isolation.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{DowntimeError, Result};

/// File name of the history table inside the storage directory.
pub const HISTORY_FILE_NAME: &str = "paradas.db";

const APP_DIR_NAME: &str = ".controle-paradas";
const DEFAULT_HISTORY_DIR_NAME: &str = "ControleParadas";

/// Central configuration for application-owned paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for app data (default: ~/.controle-paradas)
    root: PathBuf,
}

impl StorageConfig {
    /// Resolves the default root under the user's home directory.
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().ok_or(DowntimeError::DirectoryNotFound("home directory"))?;
        Ok(Self {
            root: home.join(APP_DIR_NAME),
        })
    }

    /// Creates a StorageConfig with a custom root directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to config.json (settings record).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Path to the side file mirroring open stoppages.
    pub fn active_file(&self) -> PathBuf {
        self.root.join("paradas_ativas.json")
    }

    /// Path to the rolling log directory.
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        ensure_dir(&self.root)
    }
}

/// Default storage directory for the history table:
/// `~/Documents/ControleParadas`, falling back to the home directory.
pub fn default_history_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Documents")))
        .map(|d| d.join(DEFAULT_HISTORY_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_DIR_NAME))
}

/// Path to the history table inside a storage directory.
pub fn history_file(storage_dir: &Path) -> PathBuf {
    storage_dir.join(HISTORY_FILE_NAME)
}

/// Creates a directory and its parents if missing.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs_err::create_dir_all(dir)
        .map_err(|e| DowntimeError::io(format!("creating directory {}", dir.display()), e))
}

/// Writes content to a file atomically using temp file + rename.
///
/// Readers see either the previous file or the new one, never a partial write.
pub(crate) fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    ensure_dir(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| DowntimeError::io(format!("creating temp file in {}", dir.display()), e))?;

    tmp.write_all(contents.as_bytes())
        .map_err(|e| DowntimeError::io(format!("writing temp file for {}", path.display()), e))?;

    tmp.flush()
        .map_err(|e| DowntimeError::io(format!("flushing temp file for {}", path.display()), e))?;

    tmp.persist(path).map_err(|e| {
        DowntimeError::io(
            format!("persisting temp file to {}", path.display()),
            e.error,
        )
    })?;

    Ok(())
}
