//! Per-user configuration properties held by the daemon.
//!
//! Each user owns one [`ConfigurationProperty`]: a list of `{id, config}`
//! records, one per project plus the reserved `default` record holding the
//! baseline. Properties are loaded lazily from `<data_dir>/users/<user>.json`
//! and written through on every change.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::atomic::write_json_atomic;
use crate::DEFAULT_CONFIGURATION_ID;

/// Errors from property storage.
#[derive(Debug, thiserror::Error)]
pub enum PropertyError {
    /// The user name cannot be used as a file name.
    #[error("invalid user name: {0:?}")]
    InvalidUser(String),

    /// Writing the property file failed.
    #[error("failed to write {path:?}: {source}")]
    Io {
        /// Property file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The property could not be encoded.
    #[error("failed to encode property: {0}")]
    Serialize(String),
}

/// One stored configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRecord {
    /// Project slug, or `default`.
    pub id: String,
    /// The stored document, as sent by the client.
    pub config: Value,
}

/// All configurations of one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationProperty {
    #[serde(default)]
    configurations: Vec<ConfigRecord>,
}

impl ConfigurationProperty {
    /// Stored configuration for `id`.
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.configurations
            .iter()
            .find(|record| record.id == id)
            .map(|record| &record.config)
    }

    /// Stored configuration for `id`, falling back to the `default` record.
    pub fn get_or_default(&self, id: &str) -> Option<&Value> {
        self.get(id).or_else(|| self.get(DEFAULT_CONFIGURATION_ID))
    }

    /// Updates the record for `id`, or appends one.
    pub fn set(&mut self, id: &str, config: Value) {
        match self.configurations.iter_mut().find(|record| record.id == id) {
            Some(record) => record.config = config,
            None => self.configurations.push(ConfigRecord {
                id: id.to_string(),
                config,
            }),
        }
    }

    /// Deletes the record for `id`. Returns whether one existed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.configurations.len();
        self.configurations.retain(|record| record.id != id);
        self.configurations.len() != before
    }

    /// `true` if `id` has no override or its override equals the `default`
    /// record.
    pub fn is_synced(&self, id: &str) -> bool {
        match self.get(id) {
            None => true,
            Some(config) => self.get(DEFAULT_CONFIGURATION_ID) == Some(config),
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }
}

/// Thread-safe map of loaded user properties backed by files.
#[derive(Debug, Clone)]
pub struct PropertyStore {
    data_dir: PathBuf,
    users: Arc<RwLock<HashMap<String, ConfigurationProperty>>>,
}

impl PropertyStore {
    /// Store keeping property files under `<data_dir>/users`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Directory holding the property files.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Number of users loaded since start.
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    /// Stored configuration `id` of `user` (no default fallback).
    pub async fn get(&self, user: &str, id: &str) -> Result<Option<Value>, PropertyError> {
        validate_user(user)?;
        if let Some(property) = self.users.read().await.get(user) {
            return Ok(property.get(id).cloned());
        }
        let mut users = self.users.write().await;
        Ok(self.loaded(&mut users, user).get(id).cloned())
    }

    /// Whether `user`'s override of `id` matches their default.
    pub async fn is_synced(&self, user: &str, id: &str) -> Result<bool, PropertyError> {
        validate_user(user)?;
        let mut users = self.users.write().await;
        Ok(self.loaded(&mut users, user).is_synced(id))
    }

    /// Creates or updates a record and persists the property.
    pub async fn set(&self, user: &str, id: &str, config: Value) -> Result<(), PropertyError> {
        validate_user(user)?;
        let mut users = self.users.write().await;
        let property = self.loaded(&mut users, user);
        property.set(id, config);
        let snapshot = property.clone();
        self.persist(user, &snapshot)
    }

    /// Deletes a record. Returns whether one existed; the file is only
    /// rewritten if it did.
    pub async fn remove(&self, user: &str, id: &str) -> Result<bool, PropertyError> {
        validate_user(user)?;
        let mut users = self.users.write().await;
        let property = self.loaded(&mut users, user);
        if !property.remove(id) {
            return Ok(false);
        }
        let snapshot = property.clone();
        self.persist(user, &snapshot)?;
        Ok(true)
    }

    fn user_path(&self, user: &str) -> PathBuf {
        self.data_dir.join("users").join(format!("{user}.json"))
    }

    fn loaded<'a>(
        &self,
        users: &'a mut HashMap<String, ConfigurationProperty>,
        user: &str,
    ) -> &'a mut ConfigurationProperty {
        users
            .entry(user.to_string())
            .or_insert_with(|| self.read_property(user))
    }

    fn read_property(&self, user: &str) -> ConfigurationProperty {
        let path = self.user_path(user);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return ConfigurationProperty::default(),
            Err(e) => {
                tracing::warn!("Cannot read {:?}, starting empty: {}", path, e);
                return ConfigurationProperty::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(property) => {
                tracing::debug!("Loaded property of {} from {:?}", user, path);
                property
            }
            Err(e) => {
                tracing::warn!("Corrupt property file {:?}, starting empty: {}", path, e);
                ConfigurationProperty::default()
            }
        }
    }

    fn persist(&self, user: &str, property: &ConfigurationProperty) -> Result<(), PropertyError> {
        let path = self.user_path(user);
        let value =
            serde_json::to_value(property).map_err(|e| PropertyError::Serialize(e.to_string()))?;
        write_json_atomic(&path, &value).map_err(|source| PropertyError::Io { path, source })
    }
}

/// User names become file names, so path separators and leading dots are
/// rejected.
fn validate_user(user: &str) -> Result<(), PropertyError> {
    if user.is_empty() || user.contains('/') || user.contains('\\') || user.starts_with('.') {
        return Err(PropertyError::InvalidUser(user.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_updates_in_place_or_appends() {
        let mut property = ConfigurationProperty::default();
        property.set("alpha", json!(["A"]));
        property.set("beta", json!(["B"]));
        property.set("alpha", json!(["C"]));

        assert_eq!(property.len(), 2);
        assert_eq!(property.get("alpha"), Some(&json!(["C"])));
        assert!(property.remove("alpha"));
        assert!(!property.remove("alpha"));
        assert_eq!(property.len(), 1);
    }

    #[test]
    fn get_or_default_falls_back() {
        let mut property = ConfigurationProperty::default();
        assert_eq!(property.get_or_default("alpha"), None);
        property.set(DEFAULT_CONFIGURATION_ID, json!([{"id": "A"}]));
        assert_eq!(property.get_or_default("alpha"), Some(&json!([{"id": "A"}])));
        assert_eq!(property.get("alpha"), None);
    }

    #[test]
    fn synced_compares_against_default_record() {
        let mut property = ConfigurationProperty::default();
        assert!(property.is_synced("alpha"));

        property.set("alpha", json!([{"id": "A"}]));
        assert!(!property.is_synced("alpha"));

        property.set(DEFAULT_CONFIGURATION_ID, json!([{"id": "A"}]));
        assert!(property.is_synced("alpha"));
    }

    #[test]
    fn user_names_are_validated() {
        assert!(validate_user("alice").is_ok());
        assert!(validate_user("first.last").is_ok());
        for bad in ["", "../etc", ".hidden", "a/b", "a\\b"] {
            assert!(validate_user(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[tokio::test]
    async fn writes_through_and_reloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PropertyStore::new(dir.path());
        store.set("alice", "alpha", json!([{"id": "A"}])).await.expect("set");

        let file = dir.path().join("users/alice.json");
        let on_disk: Value =
            serde_json::from_str(&fs::read_to_string(&file).expect("read")).expect("json");
        assert_eq!(
            on_disk,
            json!({"configurations": [{"id": "alpha", "config": [{"id": "A"}]}]})
        );

        let reopened = PropertyStore::new(dir.path());
        assert_eq!(
            reopened.get("alice", "alpha").await.expect("get"),
            Some(json!([{"id": "A"}]))
        );
        assert_eq!(reopened.user_count().await, 1);
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PropertyStore::new(dir.path());
        store.set("alice", "alpha", json!(["A"])).await.expect("set");

        assert_eq!(store.get("bob", "alpha").await.expect("get"), None);
        assert!(!store.remove("bob", "alpha").await.expect("remove"));
        assert!(!dir.path().join("users/bob.json").exists());
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("users")).expect("mkdir");
        fs::write(dir.path().join("users/alice.json"), "not json").expect("seed");

        let store = PropertyStore::new(dir.path());
        assert_eq!(store.get("alice", "alpha").await.expect("get"), None);
    }

    #[tokio::test]
    async fn invalid_user_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PropertyStore::new(dir.path());
        let err = store
            .set("../escape", "alpha", json!([]))
            .await
            .expect_err("rejected");
        assert!(matches!(err, PropertyError::InvalidUser(_)));
    }
}
