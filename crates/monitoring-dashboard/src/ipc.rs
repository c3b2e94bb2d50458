//! IPC wire types for the JSON Lines protocol between the remote store and
//! the configuration daemon.

use std::time::Duration;

/// IPC protocol version. Included in every message for forward/backward
/// compatibility.
pub const IPC_VERSION: u32 = 1;

/// Reserved configuration id holding a user's baseline.
pub const DEFAULT_CONFIGURATION_ID: &str = "default";

/// Incoming command from a client to the daemon.
///
/// Every message is a single JSON line:
/// `{"version": 1, "cmd": "GET", "user": "alice", "project": "my-project"}\n`
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IpcCommand {
    /// Protocol version (must be [`IPC_VERSION`]).
    pub version: u32,
    /// Command name (GET, SAVE, RESET, DEFAULT, SYNCED, STATUS).
    pub cmd: String,
    /// User owning the configuration property.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Project configuration id (for GET, SAVE, RESET, SYNCED).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Configuration document (for SAVE and DEFAULT).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

impl IpcCommand {
    /// Creates a command with no arguments.
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            version: IPC_VERSION,
            cmd: cmd.into(),
            user: None,
            project: None,
            config: None,
        }
    }

    /// Sets the user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the project id.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Attaches a configuration document.
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = Some(config);
        self
    }

    /// Serializes to a JSON line (with trailing newline).
    pub fn to_json_line(&self) -> String {
        let json = serde_json::to_string(self).expect("failed to serialize IpcCommand");
        format!("{}\n", json)
    }
}

/// Response envelope from daemon to client.
///
/// Sent as a single JSON line: `{"version": 1, "ok": true, ...}\n`
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IpcResponse {
    /// Protocol version.
    pub version: u32,
    /// Whether the command succeeded.
    pub ok: bool,
    /// Error message when `ok` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Command-specific payload (varies by command).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl IpcResponse {
    /// Creates a success response with optional data payload.
    pub fn success(data: Option<serde_json::Value>) -> Self {
        Self {
            version: IPC_VERSION,
            ok: true,
            error: None,
            data,
        }
    }

    /// Creates an error response with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            version: IPC_VERSION,
            ok: false,
            error: Some(message.into()),
            data: None,
        }
    }

    /// Serializes to a JSON line (with trailing newline).
    pub fn to_json_line(&self) -> String {
        let json = serde_json::to_string(self).expect("failed to serialize IpcResponse");
        format!("{}\n", json)
    }
}

/// Payload of the STATUS command.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DaemonStatus {
    /// Seconds since the daemon started.
    pub uptime_seconds: u64,
    /// RFC 3339 start timestamp.
    pub started_at: String,
    /// Users with a loaded configuration property.
    pub users: usize,
    /// Connected clients, including the one asking.
    pub active_connections: usize,
    /// Socket the daemon listens on.
    pub socket_path: String,
    /// Daemon package version.
    pub version: String,
}

/// Formats an uptime as `1d 2h 3m`, `2h 3m`, `3m 4s` or `4s`.
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (days, hours, minutes, seconds) = (
        secs / 86_400,
        (secs % 86_400) / 3_600,
        (secs % 3_600) / 60,
        secs % 60,
    );
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_omits_unset_fields() {
        let line = IpcCommand::new("STATUS").to_json_line();
        assert_eq!(line, "{\"version\":1,\"cmd\":\"STATUS\"}\n");
    }

    #[test]
    fn command_with_arguments() {
        let cmd = IpcCommand::new("SAVE")
            .with_user("alice")
            .with_project("my-project")
            .with_config(json!([{"id": "A"}]));
        let parsed: IpcCommand =
            serde_json::from_str(cmd.to_json_line().trim()).expect("round trip");
        assert_eq!(parsed, cmd);
        assert_eq!(parsed.config, Some(json!([{"id": "A"}])));
    }

    #[test]
    fn command_parses_without_optional_fields() {
        let cmd: IpcCommand =
            serde_json::from_str(r#"{"version":1,"cmd":"GET","user":"bob"}"#).expect("parse");
        assert_eq!(cmd.user.as_deref(), Some("bob"));
        assert!(cmd.project.is_none());
        assert!(cmd.config.is_none());
    }

    #[test]
    fn response_success_and_error_lines() {
        let ok = IpcResponse::success(Some(json!(true))).to_json_line();
        assert_eq!(ok, "{\"version\":1,\"ok\":true,\"data\":true}\n");

        let err = IpcResponse::error("boom").to_json_line();
        assert_eq!(err, "{\"version\":1,\"ok\":false,\"error\":\"boom\"}\n");
    }

    #[test]
    fn uptime_formatting() {
        let cases = [
            (0, "0s"),
            (59, "59s"),
            (61, "1m 1s"),
            (3_660, "1h 1m"),
            (90_061, "1d 1h 1m"),
        ];
        for (secs, expected) in cases {
            assert_eq!(format_uptime(Duration::from_secs(secs)), expected, "{secs}s");
        }
    }
}
