//! Remote store: the user's configuration property held by `pmd daemon`.
//!
//! Every request opens its own connection, sends one command and reads one
//! response. The configured timeout covers the whole exchange.

use std::path::{Path, PathBuf};
use std::time::Duration;

use portlet_grid::ConfigurationDocument;
use serde_json::Value;

use crate::client::{connect, connect_with_lazy_start, ClientError};
use crate::store::{StoreError, StoreResult};
use crate::{DaemonStatus, IpcCommand};

/// Client for one user's override of one project.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    socket_path: PathBuf,
    user: String,
    project: String,
    timeout: Duration,
    autostart: bool,
    config_path: Option<PathBuf>,
}

impl RemoteStore {
    /// Store for `user`'s override of `project` (a project slug).
    pub fn new(
        socket_path: impl Into<PathBuf>,
        user: impl Into<String>,
        project: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            socket_path: socket_path.into(),
            user: user.into(),
            project: project.into(),
            timeout,
            autostart: false,
            config_path: None,
        }
    }

    /// Starts the daemon on first use when it is not running.
    /// `config_path` is passed on to the spawned daemon.
    pub fn with_autostart(mut self, autostart: bool, config_path: Option<PathBuf>) -> Self {
        self.autostart = autostart;
        self.config_path = config_path;
        self
    }

    /// Daemon socket.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// User owning the property.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Configuration id of the project.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Stored override as raw JSON, `None` when the user has none.
    pub async fn get(&self) -> StoreResult<Option<Value>> {
        let data = self.request(self.scoped("GET")).await?;
        Ok(data.filter(|value| !value.is_null()))
    }

    /// Creates or replaces the override.
    pub async fn save(&self, document: &ConfigurationDocument) -> StoreResult<()> {
        let command = self.scoped("SAVE").with_config(document_value(document)?);
        self.request(command).await.map(|_| ())
    }

    /// Deletes the override.
    pub async fn reset(&self) -> StoreResult<()> {
        self.request(self.scoped("RESET")).await.map(|_| ())
    }

    /// Records `baseline` as the user's default entry, which `synced`
    /// compares against.
    pub async fn register_default(&self, baseline: &ConfigurationDocument) -> StoreResult<()> {
        let command = IpcCommand::new("DEFAULT")
            .with_user(&self.user)
            .with_config(document_value(baseline)?);
        self.request(command).await.map(|_| ())
    }

    /// Returns `true` when the user has no override or it equals the
    /// registered default.
    pub async fn synced(&self) -> StoreResult<bool> {
        match self.request(self.scoped("SYNCED")).await? {
            Some(Value::Bool(synced)) => Ok(synced),
            other => Err(StoreError::Serialize(format!(
                "SYNCED returned {}",
                other.unwrap_or(Value::Null)
            ))),
        }
    }

    /// Daemon health and counters.
    pub async fn status(&self) -> StoreResult<DaemonStatus> {
        let data = self.request(IpcCommand::new("STATUS")).await?;
        serde_json::from_value(data.unwrap_or(Value::Null))
            .map_err(|e| StoreError::Serialize(format!("STATUS payload: {e}")))
    }

    fn scoped(&self, cmd: &str) -> IpcCommand {
        IpcCommand::new(cmd)
            .with_user(&self.user)
            .with_project(&self.project)
    }

    async fn request(&self, command: IpcCommand) -> StoreResult<Option<Value>> {
        let exchange = async {
            let mut client = if self.autostart {
                connect_with_lazy_start(&self.socket_path, self.config_path.as_deref()).await?
            } else {
                connect(&self.socket_path).await?
            };
            let response = client
                .send(&command)
                .await
                .map_err(ClientError::ConnectionFailed)?;
            Ok::<_, ClientError>(response)
        };

        let response = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))??;

        tracing::debug!("{} for {}/{}: ok={}", command.cmd, self.user, self.project, response.ok);
        if !response.ok {
            return Err(StoreError::Remote {
                command: command.cmd,
                message: response.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(response.data)
    }
}

fn document_value(document: &ConfigurationDocument) -> StoreResult<Value> {
    serde_json::to_value(document.entries()).map_err(|e| StoreError::Serialize(e.to_string()))
}
