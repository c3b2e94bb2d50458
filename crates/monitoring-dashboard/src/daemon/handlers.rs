//! Command handlers for the daemon socket protocol.
//!
//! Each `handle_*` function processes a single JSON IPC command received from
//! a client connection and returns a JSON Lines response string.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::daemon::property::PropertyStore;
use crate::{DaemonStatus, IpcCommand, IpcResponse, DEFAULT_CONFIGURATION_ID};

/// Shared daemon state passed to each client handler.
#[derive(Clone)]
pub(super) struct DaemonState {
    pub(super) properties: PropertyStore,
    pub(super) start_time: Instant,
    pub(super) started_at: DateTime<Local>,
    pub(super) active_connections: Arc<AtomicUsize>,
    pub(super) socket_path: String,
}

/// Handles the GET command.
///
/// Expects `cmd.user` and `cmd.project`. Responds with the stored override,
/// or no data when there is none.
pub(super) async fn handle_get_command(cmd: &IpcCommand, properties: &PropertyStore) -> String {
    let (user, project) = match user_and_project(cmd) {
        Ok(args) => args,
        Err(line) => return line,
    };
    match properties.get(user, project).await {
        Ok(config) => IpcResponse::success(config).to_json_line(),
        Err(e) => IpcResponse::error(e.to_string()).to_json_line(),
    }
}

/// Handles the SAVE command.
///
/// Expects `cmd.user`, `cmd.project` and `cmd.config`. The document must
/// parse as a configuration document; the reserved `default` id can only
/// be written through DEFAULT.
pub(super) async fn handle_save_command(cmd: &IpcCommand, properties: &PropertyStore) -> String {
    let (user, project) = match user_and_project(cmd) {
        Ok(args) => args,
        Err(line) => return line,
    };
    if project == DEFAULT_CONFIGURATION_ID {
        return IpcResponse::error(format!(
            "SAVE: '{DEFAULT_CONFIGURATION_ID}' is reserved, use DEFAULT"
        ))
        .to_json_line();
    }
    let config = match validated_config(cmd) {
        Ok(config) => config,
        Err(line) => return line,
    };

    match properties.set(user, project, config).await {
        Ok(()) => {
            tracing::info!("Saved configuration {} for {}", project, user);
            IpcResponse::success(None).to_json_line()
        }
        Err(e) => {
            tracing::error!("Failed to save configuration {} for {}: {}", project, user, e);
            IpcResponse::error(e.to_string()).to_json_line()
        }
    }
}

/// Handles the RESET command.
///
/// Expects `cmd.user` and `cmd.project`. Responds with whether an override
/// existed.
pub(super) async fn handle_reset_command(cmd: &IpcCommand, properties: &PropertyStore) -> String {
    let (user, project) = match user_and_project(cmd) {
        Ok(args) => args,
        Err(line) => return line,
    };
    match properties.remove(user, project).await {
        Ok(existed) => {
            if existed {
                tracing::info!("Reset configuration {} for {}", project, user);
            }
            IpcResponse::success(Some(Value::Bool(existed))).to_json_line()
        }
        Err(e) => IpcResponse::error(e.to_string()).to_json_line(),
    }
}

/// Handles the DEFAULT command.
///
/// Expects `cmd.user` and `cmd.config`. Stores the baseline under the
/// reserved `default` id. Clients send it on every load, so unchanged
/// baselines are not rewritten.
pub(super) async fn handle_default_command(cmd: &IpcCommand, properties: &PropertyStore) -> String {
    let Some(user) = cmd.user.as_deref() else {
        return IpcResponse::error("DEFAULT requires user").to_json_line();
    };
    let config = match validated_config(cmd) {
        Ok(config) => config,
        Err(line) => return line,
    };

    let current = match properties.get(user, DEFAULT_CONFIGURATION_ID).await {
        Ok(current) => current,
        Err(e) => return IpcResponse::error(e.to_string()).to_json_line(),
    };
    if current.as_ref() == Some(&config) {
        return IpcResponse::success(None).to_json_line();
    }
    match properties.set(user, DEFAULT_CONFIGURATION_ID, config).await {
        Ok(()) => IpcResponse::success(None).to_json_line(),
        Err(e) => IpcResponse::error(e.to_string()).to_json_line(),
    }
}

/// Handles the SYNCED command.
///
/// Expects `cmd.user` and `cmd.project`. Responds `true` when the project has
/// no override or the override equals the user's default.
pub(super) async fn handle_synced_command(cmd: &IpcCommand, properties: &PropertyStore) -> String {
    let (user, project) = match user_and_project(cmd) {
        Ok(args) => args,
        Err(line) => return line,
    };
    match properties.is_synced(user, project).await {
        Ok(synced) => IpcResponse::success(Some(Value::Bool(synced))).to_json_line(),
        Err(e) => IpcResponse::error(e.to_string()).to_json_line(),
    }
}

/// Handles the STATUS command.
///
/// Returns daemon health information.
pub(super) async fn handle_status_command(state: &DaemonState) -> String {
    let status = DaemonStatus {
        uptime_seconds: state.start_time.elapsed().as_secs(),
        started_at: state.started_at.to_rfc3339(),
        users: state.properties.user_count().await,
        active_connections: state.active_connections.load(Ordering::Relaxed),
        socket_path: state.socket_path.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    IpcResponse::success(Some(
        serde_json::to_value(&status).expect("failed to serialize DaemonStatus"),
    ))
    .to_json_line()
}

fn user_and_project(cmd: &IpcCommand) -> Result<(&str, &str), String> {
    let Some(user) = cmd.user.as_deref() else {
        return Err(IpcResponse::error(format!("{} requires user", cmd.cmd)).to_json_line());
    };
    let Some(project) = cmd.project.as_deref() else {
        return Err(IpcResponse::error(format!("{} requires project", cmd.cmd)).to_json_line());
    };
    Ok((user, project))
}

fn validated_config(cmd: &IpcCommand) -> Result<Value, String> {
    let Some(config) = cmd.config.clone() else {
        return Err(IpcResponse::error(format!("{} requires config", cmd.cmd)).to_json_line());
    };
    if let Err(e) = portlet_grid::codec::parse_value(config.clone()) {
        return Err(IpcResponse::error(format!("invalid configuration: {e}")).to_json_line());
    }
    Ok(config)
}
