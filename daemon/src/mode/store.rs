//! Key-value preferences file holding the persisted mode
//!
//! The file is a flat JSON object. Only `MODE_KEY` is owned here; any other
//! keys are preserved on write.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::Mode;

/// Key under which the mode name is stored
pub const MODE_KEY: &str = "service_mode";

/// Errors that can occur while persisting the mode
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access preferences file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid preferences JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistent mode storage backed by a JSON file
#[derive(Debug, Clone)]
pub struct ModeStore {
    path: PathBuf,
}

impl ModeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored mode
    ///
    /// A missing file, unreadable file, malformed JSON or any value other
    /// than an exact stored mode name yields `Mode::Off`.
    pub fn load(&self) -> Mode {
        let entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "could not read preferences, using OFF");
                return Mode::Off;
            }
        };

        let mode = match entries.get(MODE_KEY) {
            Some(Value::String(name)) => Mode::parse_or_off(name),
            Some(other) => {
                warn!(value = %other, "stored mode is not a string, using OFF");
                Mode::Off
            }
            None => Mode::Off,
        };

        debug!(%mode, path = ?self.path, "loaded mode");
        mode
    }

    /// Persist the mode, keeping unrelated keys intact
    pub fn save(&self, mode: Mode) -> Result<(), StoreError> {
        // A corrupt file is replaced rather than blocking the save
        let mut entries = self.read_entries().unwrap_or_default();
        entries.insert(MODE_KEY.to_string(), Value::String(mode.as_str().to_string()));

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_owned(),
                source,
            })?;
        }

        let bytes = serde_json::to_vec_pretty(&Value::Object(entries))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        debug!(%mode, path = ?self.path, "saved mode");
        Ok(())
    }

    fn read_entries(&self) -> Result<Map<String, Value>, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> ModeStore {
        ModeStore::new(dir.path().join("prefs.json"))
    }

    #[test]
    fn test_missing_file_is_off() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(store_in(&dir).load(), Mode::Off);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.save(Mode::Background).unwrap();
        assert_eq!(store.load(), Mode::Background);

        store.save(Mode::Active).unwrap();
        assert_eq!(store.load(), Mode::Active);
    }

    #[test]
    fn test_invalid_value_falls_back_to_off() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), r#"{"service_mode":"FOREGROUND"}"#).unwrap();
        assert_eq!(store.load(), Mode::Off);

        std::fs::write(store.path(), "not json").unwrap();
        assert_eq!(store.load(), Mode::Off);

        std::fs::write(store.path(), r#"{"service_mode":3}"#).unwrap();
        assert_eq!(store.load(), Mode::Off);
    }

    #[test]
    fn test_loosely_spelled_names_load_as_off() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        for raw in [r#"{"service_mode":"active"}"#, r#"{"service_mode":" ACTIVE "}"#] {
            std::fs::write(store.path(), raw).unwrap();
            assert_eq!(store.load(), Mode::Off, "{raw}");
        }
    }

    #[test]
    fn test_save_preserves_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), r#"{"key_logging":"ACTIVE"}"#).unwrap();

        store.save(Mode::Active).unwrap();

        let raw: Value = serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["key_logging"], "ACTIVE");
        assert_eq!(raw[MODE_KEY], "ACTIVE");
    }

    #[test]
    fn test_save_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModeStore::new(dir.path().join("nested").join("prefs.json"));
        store.save(Mode::Active).unwrap();
        assert_eq!(store.load(), Mode::Active);
    }
}
