//! Local key-value storage, one string entry per project.
//!
//! The file is a JSON object mapping keys such as
//! `my-project.monitoring-grid-order` to the serialized document text, the
//! way browser local storage holds strings. Every operation rereads the file
//! so several `pmd` processes see each other's writes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde_json::{Map, Value};

use crate::atomic::write_json_atomic;
use crate::store::{StoreError, StoreResult};

/// One project's entry in the local-storage file.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
    key: String,
}

impl LocalStore {
    /// Store for `key` inside the file at `path`.
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    /// Storage file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entry key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Raw stored value, `None` when the entry or the file is absent.
    ///
    /// Non-string values (hand-edited files) are returned as their JSON text.
    pub fn read(&self) -> StoreResult<Option<String>> {
        let map = self.read_map()?;
        Ok(map.get(&self.key).map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }))
    }

    /// Stores `text` under the key, replacing any previous value.
    pub fn write(&self, text: &str) -> StoreResult<()> {
        let mut map = self.writable_map()?;
        map.insert(self.key.clone(), Value::String(text.to_string()));
        self.write_map(map)
    }

    /// Removes the entry. Returns whether one existed.
    pub fn remove(&self) -> StoreResult<bool> {
        let mut map = self.writable_map()?;
        if map.remove(&self.key).is_none() {
            return Ok(false);
        }
        self.write_map(map)?;
        Ok(true)
    }

    /// Every key in the file, for diagnostics.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.read_map()?.keys().cloned().collect())
    }

    fn read_map(&self) -> StoreResult<Map<String, Value>> {
        match self.load_map()? {
            Some(map) => Ok(map),
            None => {
                tracing::warn!(
                    "local storage {:?} is not a JSON object, treating it as empty",
                    self.path
                );
                Ok(Map::new())
            }
        }
    }

    /// Map to modify and write back. A corrupt file is moved aside first
    /// so the rewrite cannot drop other projects' entries unseen.
    fn writable_map(&self) -> StoreResult<Map<String, Value>> {
        if let Some(map) = self.load_map()? {
            return Ok(map);
        }
        let backup = self.corrupt_backup_path();
        fs::rename(&self.path, &backup).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::warn!(
            "local storage {:?} is not a JSON object, moved it to {:?}",
            self.path,
            backup
        );
        Ok(Map::new())
    }

    /// Parsed file contents, `None` when the file is not a JSON object.
    fn load_map(&self) -> StoreResult<Option<Map<String, Value>>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Some(Map::new())),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(Some(Map::new()));
        }
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) | Err(_) => Ok(None),
        }
    }

    fn corrupt_backup_path(&self) -> PathBuf {
        let timestamp = Local::now().format("%Y%m%d-%H%M%S%.6f");
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "local-storage.json".to_string());
        self.path.with_file_name(format!("{name}.corrupt.{timestamp}"))
    }

    fn write_map(&self, map: Map<String, Value>) -> StoreResult<()> {
        write_json_atomic(&self.path, &Value::Object(map)).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
