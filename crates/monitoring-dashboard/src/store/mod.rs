//! Configuration store gateway.
//!
//! Persists a project's layout override either in a local key-value file or
//! through the configuration daemon. Both variants share the same contract:
//! `load` falls back to the baseline, `save` replaces the override, `reset`
//! removes it, and `is_default` compares against the baseline. Nothing else
//! in the crate touches persistent storage.

pub mod local;
pub mod remote;

use std::path::PathBuf;
use std::time::Duration;

use portlet_grid::{codec, ConfigurationDocument, WidgetRegistry};
use serde::{Deserialize, Serialize};

use crate::client::ClientError;
use crate::config::error::ConfigError;
use crate::config::schema::Config;
use crate::project::ProjectId;

pub use local::LocalStore;
pub use remote::RemoteStore;

/// Where overrides are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageVariant {
    /// Local key-value file
    #[default]
    Local,
    /// Per-user property held by the configuration daemon
    Remote,
}

impl StorageVariant {
    /// Lowercase name as written in the config file.
    pub fn as_str(self) -> &'static str {
        match self {
            StorageVariant::Local => "local",
            StorageVariant::Remote => "remote",
        }
    }
}

/// A persistence failure.
///
/// The in-memory layout is never rolled back on these; callers surface them
/// and keep going.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the local storage file failed.
    #[error("Local storage {path:?}: {source}")]
    Io {
        /// Storage file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The daemon rejected a command.
    #[error("Daemon rejected {command}: {message}")]
    Remote {
        /// Command name.
        command: String,
        /// Error reported by the daemon.
        message: String,
    },

    /// The daemon could not be reached or the exchange broke off.
    #[error(transparent)]
    Connection(#[from] ClientError),

    /// The daemon did not answer in time.
    #[error("Daemon did not answer within {}", humantime::format_duration(*.0))]
    Timeout(Duration),

    /// A value could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialize(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
enum StoreBackend {
    Local(LocalStore),
    Remote(RemoteStore),
}

/// One project's configuration store with its baseline.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    backend: StoreBackend,
    baseline: ConfigurationDocument,
}

impl ConfigStore {
    /// Store backed by local storage.
    pub fn local(store: LocalStore, baseline: ConfigurationDocument) -> Self {
        Self {
            backend: StoreBackend::Local(store),
            baseline,
        }
    }

    /// Store backed by the daemon.
    pub fn remote(store: RemoteStore, baseline: ConfigurationDocument) -> Self {
        Self {
            backend: StoreBackend::Remote(store),
            baseline,
        }
    }

    /// Builds the store selected by `dashboard.storage`.
    ///
    /// `config_path` is handed to a lazily started daemon.
    pub fn from_config(
        config: &Config,
        project: &ProjectId,
        baseline: ConfigurationDocument,
        config_path: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let store = match config.dashboard.storage {
            StorageVariant::Local => Self::local(
                LocalStore::new(config.local_storage_path(), project.local_key()),
                baseline,
            ),
            StorageVariant::Remote => {
                let timeout = config.remote_timeout()?;
                let remote = RemoteStore::new(
                    config.socket_path(),
                    config.remote_user(),
                    project.slug(),
                    timeout,
                )
                .with_autostart(config.remote.autostart, config_path);
                Self::remote(remote, baseline)
            }
        };
        Ok(store)
    }

    /// Which variant this is.
    pub fn variant(&self) -> StorageVariant {
        match self.backend {
            StoreBackend::Local(_) => StorageVariant::Local,
            StoreBackend::Remote(_) => StorageVariant::Remote,
        }
    }

    /// The baseline document.
    pub fn baseline(&self) -> &ConfigurationDocument {
        &self.baseline
    }

    /// The daemon client, for the remote variant.
    pub fn remote_store(&self) -> Option<&RemoteStore> {
        match &self.backend {
            StoreBackend::Remote(remote) => Some(remote),
            StoreBackend::Local(_) => None,
        }
    }

    /// Stored override, or the baseline if there is none.
    ///
    /// A stored value that does not parse as a document is logged and
    /// replaced by the baseline. Only I/O and daemon failures are errors.
    pub async fn load(&self) -> StoreResult<ConfigurationDocument> {
        match &self.backend {
            StoreBackend::Local(local) => {
                let Some(text) = local.read()? else {
                    return Ok(self.baseline.clone());
                };
                match codec::parse_document(&text) {
                    Ok(document) => Ok(document),
                    Err(e) => {
                        tracing::warn!(
                            "Ignoring stored configuration {}: {}",
                            local.key(),
                            e
                        );
                        Ok(self.baseline.clone())
                    }
                }
            }
            StoreBackend::Remote(remote) => {
                remote.register_default(&self.baseline).await?;
                let Some(value) = remote.get().await? else {
                    return Ok(self.baseline.clone());
                };
                match codec::parse_value(value) {
                    Ok(document) => Ok(document),
                    Err(e) => {
                        tracing::warn!(
                            "Ignoring stored configuration for {}: {}",
                            remote.project(),
                            e
                        );
                        Ok(self.baseline.clone())
                    }
                }
            }
        }
    }

    /// Replaces the stored override with `document`.
    pub async fn save(&self, document: &ConfigurationDocument) -> StoreResult<()> {
        match &self.backend {
            StoreBackend::Local(local) => local.write(&document.to_json()),
            StoreBackend::Remote(remote) => remote.save(document).await,
        }
    }

    /// Deletes the stored override and returns the baseline to reload.
    pub async fn reset(&self) -> StoreResult<ConfigurationDocument> {
        match &self.backend {
            StoreBackend::Local(local) => {
                if local.remove()? {
                    tracing::debug!("Removed local override {}", local.key());
                }
            }
            StoreBackend::Remote(remote) => remote.reset().await?,
        }
        Ok(self.baseline.clone())
    }

    /// Narrows the baseline to widgets `registry` knows, in minimal-diff
    /// form, and returns the ids that were dropped.
    ///
    /// A stale baseline entry never reaches the grid, so keeping it would
    /// make every layout look overridden.
    pub fn restrict_baseline(&mut self, registry: &WidgetRegistry) -> Vec<String> {
        let dropped = codec::unavailable_ids(&self.baseline, registry);
        let installed = codec::retain_registered(&self.baseline, registry);
        self.baseline = codec::normalize(&installed, registry);
        dropped
    }

    /// Returns `true` if `document` equals the baseline.
    pub fn is_default(&self, document: &ConfigurationDocument) -> bool {
        codec::diff_equals(document, &self.baseline)
    }
}
