//! Settings persistence.
//!
//! The settings record is small and rewritten wholesale after every change.
//! Loading never fails: a missing or unreadable file yields the defaults.
//! Otherwise the file is merged over the defaults key by key, so a missing or
//! mistyped key only resets that one setting.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::{DowntimeError, Result};
use crate::storage::{atomic_write, default_history_dir};

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the history table.
    #[serde(alias = "diretorio")]
    pub storage_directory: PathBuf,
    /// Pre-fill the operator field with `last_user` on the next start.
    #[serde(alias = "remember_me")]
    pub remember_user: bool,
    pub last_user: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            storage_directory: default_history_dir(),
            remember_user: false,
            last_user: String::new(),
        }
    }
}

impl AppConfig {
    /// Records the login preference: remember `user`, or forget any
    /// remembered user when `None`.
    pub fn set_remembered_user(&mut self, user: Option<&str>) {
        match user {
            Some(name) => {
                self.remember_user = true;
                self.last_user = name.trim().to_string();
            }
            None => {
                self.remember_user = false;
                self.last_user.clear();
            }
        }
    }

    /// The user to pre-fill, if remembering is on.
    pub fn remembered_user(&self) -> Option<&str> {
        if self.remember_user && !self.last_user.is_empty() {
            Some(&self.last_user)
        } else {
            None
        }
    }
}

/// Loads the settings, returning defaults if the file is missing or malformed.
pub fn load_config(path: &Path) -> AppConfig {
    let content = match fs_err::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return AppConfig::default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read settings, using defaults");
            return AppConfig::default();
        }
    };

    let map = match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            tracing::warn!(path = %path.display(), "Settings file is not an object, using defaults");
            return AppConfig::default();
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Malformed settings file, using defaults"
            );
            return AppConfig::default();
        }
    };

    let mut config = AppConfig::default();
    merge_key(&map, &["storage_directory", "diretorio"], &mut config.storage_directory);
    merge_key(&map, &["remember_user", "remember_me"], &mut config.remember_user);
    merge_key(&map, &["last_user"], &mut config.last_user);
    config
}

/// Overwrites `slot` with the first of `keys` present in `map`, keeping the
/// default when the value has the wrong type.
fn merge_key<T: DeserializeOwned>(map: &Map<String, Value>, keys: &[&str], slot: &mut T) {
    let Some((key, value)) = keys
        .iter()
        .find_map(|key| map.get(*key).map(|value| (*key, value)))
    else {
        return;
    };
    match T::deserialize(value) {
        Ok(parsed) => *slot = parsed,
        Err(e) => tracing::warn!(key, error = %e, "Ignoring invalid setting, keeping default"),
    }
}

/// Saves the settings, overwriting the file.
pub fn save_config(path: &Path, config: &AppConfig) -> Result<()> {
    let content = serde_json::to_string_pretty(config).map_err(|e| DowntimeError::Json {
        context: "serializing settings".to_string(),
        source: e,
    })?;
    atomic_write(path, &content)
}
