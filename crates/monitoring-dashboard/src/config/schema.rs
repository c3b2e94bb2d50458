//! TOML configuration schema types for the portlet dashboard.
//!
//! All structs derive `Deserialize` and `Serialize` with defaults via
//! `#[serde(default)]`. Empty strings mean "resolve the default location";
//! the `Config::*` resolution helpers do that resolution.
//!
//! Duration fields use human-readable strings (e.g. `"5s"`, `"750ms"`)
//! parsed by the `humantime` crate at the call site.

use std::path::PathBuf;
use std::time::Duration;

use portlet_grid::DefaultsPolicy;
use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::config::xdg;
use crate::store::StorageVariant;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration encompassing all sections.
///
/// ```toml
/// [dashboard]
/// [local]
/// [remote]
/// [daemon]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Which project the dashboard shows and how its layout persists.
    pub dashboard: DashboardConfig,
    /// Local-storage variant settings.
    pub local: LocalConfig,
    /// Remote (daemon-backed) variant settings.
    pub remote: RemoteConfig,
    /// Configuration daemon settings.
    pub daemon: TomlDaemonConfig,
}

impl Config {
    /// Path of the widget definition file.
    pub fn portlets_path(&self) -> PathBuf {
        non_empty_path(&self.dashboard.portlets).unwrap_or_else(xdg::portlets_path)
    }

    /// Path of the explicit baseline document, if one is configured.
    pub fn baseline_path(&self) -> Option<PathBuf> {
        non_empty_path(&self.dashboard.baseline)
    }

    /// Path of the local-storage file.
    pub fn local_storage_path(&self) -> PathBuf {
        non_empty_path(&self.local.storage_path).unwrap_or_else(xdg::local_storage_path)
    }

    /// Socket the remote variant connects to and the daemon binds.
    pub fn socket_path(&self) -> PathBuf {
        non_empty_path(&self.remote.socket).unwrap_or_else(xdg::socket_path)
    }

    /// Directory the daemon keeps per-user properties in.
    pub fn daemon_data_dir(&self) -> PathBuf {
        non_empty_path(&self.daemon.data_dir).unwrap_or_else(xdg::data_dir)
    }

    /// Log file path, `None` when logs go to stderr (daemon) or nowhere (TUI).
    pub fn log_file(&self) -> Option<PathBuf> {
        non_empty_path(&self.daemon.log_file)
    }

    /// User the remote variant stores overrides for.
    ///
    /// Falls back to `$USER`, then to `"anonymous"`.
    pub fn remote_user(&self) -> String {
        if !self.remote.user.is_empty() {
            return self.remote.user.clone();
        }
        std::env::var("USER")
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| "anonymous".to_string())
    }

    /// Parsed `remote.timeout`.
    pub fn remote_timeout(&self) -> Result<Duration, ConfigError> {
        let timeout = humantime::parse_duration(&self.remote.timeout).map_err(|e| {
            ConfigError::InvalidValue {
                field: "remote.timeout".to_string(),
                message: e.to_string(),
            }
        })?;
        if timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "remote.timeout".to_string(),
                message: "timeout must be greater than zero".to_string(),
            });
        }
        Ok(timeout)
    }
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    if value.trim().is_empty() {
        None
    } else {
        Some(xdg::expand_tilde(value))
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Project selection, storage variant and defaults policy.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Project display name or URL path. Empty derives it from the current
    /// directory name.
    pub project: String,
    /// Where layout overrides persist.
    pub storage: StorageVariant,
    /// Whether serialized entries omit attributes equal to the widget default.
    pub defaults: DefaultsPolicy,
    /// Widget definition file. Empty means `portlets.json` in the config dir.
    pub portlets: String,
    /// Explicit baseline document. Empty derives the baseline from the
    /// definitions flagged `"default": true`.
    pub baseline: String,
}

// ---------------------------------------------------------------------------
// Local
// ---------------------------------------------------------------------------

/// Local-storage variant settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LocalConfig {
    /// Key-value file holding one entry per project. Empty means
    /// `$XDG_DATA_HOME/portlet-dashboard/local-storage.json`.
    pub storage_path: String,
}

// ---------------------------------------------------------------------------
// Remote
// ---------------------------------------------------------------------------

/// Remote variant settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RemoteConfig {
    /// Daemon socket. Empty means `$XDG_RUNTIME_DIR/portlet-dashboard.sock`.
    pub socket: String,
    /// User the overrides belong to. Empty means `$USER`.
    pub user: String,
    /// Bound on connect, write and read of each request.
    pub timeout: String,
    /// Spawn the daemon when it is not running.
    pub autostart: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            socket: String::new(),
            user: String::new(),
            timeout: "5s".to_string(),
            autostart: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Daemon
// ---------------------------------------------------------------------------

/// Daemon process configuration from the TOML `[daemon]` section.
///
/// Named `TomlDaemonConfig` to avoid collision with the runtime
/// `crate::daemon::DaemonConfig`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TomlDaemonConfig {
    /// Logging verbosity when `PMD_LOG` is unset.
    pub log_level: LogLevel,
    /// Path to log file. Empty string means stderr.
    pub log_file: String,
    /// Property directory. Empty means the XDG data dir.
    pub data_dir: String,
}

/// Log verbosity levels (kebab-case in TOML).
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LogLevel {
    /// Only errors.
    Error,
    /// Errors and warnings.
    Warn,
    /// Informational messages (default).
    #[default]
    Info,
    /// Debug-level detail.
    Debug,
    /// Full trace output.
    Trace,
}

impl LogLevel {
    /// Filter directive for this level.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_config_all_fields() {
        let toml_str = r#"
[dashboard]
project = "My Project"
storage = "remote"
defaults = "explicit"
portlets = "/etc/pmd/portlets.json"
baseline = "/etc/pmd/baseline.json"

[local]
storage_path = "/var/lib/pmd/local.json"

[remote]
socket = "/run/pmd.sock"
user = "alice"
timeout = "750ms"
autostart = true

[daemon]
log_level = "debug"
log_file = "/var/log/pmd.log"
data_dir = "/var/lib/pmd"
"#;
        let config: Config = toml::from_str(toml_str).expect("valid TOML should parse");
        assert_eq!(config.dashboard.project, "My Project");
        assert_eq!(config.dashboard.storage, StorageVariant::Remote);
        assert_eq!(config.dashboard.defaults, DefaultsPolicy::Explicit);
        assert_eq!(config.portlets_path(), PathBuf::from("/etc/pmd/portlets.json"));
        assert_eq!(
            config.baseline_path(),
            Some(PathBuf::from("/etc/pmd/baseline.json"))
        );
        assert_eq!(
            config.local_storage_path(),
            PathBuf::from("/var/lib/pmd/local.json")
        );
        assert_eq!(config.socket_path(), PathBuf::from("/run/pmd.sock"));
        assert_eq!(config.remote_user(), "alice");
        assert_eq!(
            config.remote_timeout().expect("valid timeout"),
            Duration::from_millis(750)
        );
        assert!(config.remote.autostart);
        assert_eq!(config.daemon.log_level, LogLevel::Debug);
        assert_eq!(config.log_file(), Some(PathBuf::from("/var/log/pmd.log")));
        assert_eq!(config.daemon_data_dir(), PathBuf::from("/var/lib/pmd"));
    }

    #[test]
    fn parse_empty_string_uses_all_defaults() {
        let config: Config = toml::from_str("").expect("empty string should parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.dashboard.storage, StorageVariant::Local);
        assert_eq!(config.dashboard.defaults, DefaultsPolicy::Omit);
        assert_eq!(config.remote.timeout, "5s");
        assert!(config.baseline_path().is_none());
        assert!(config.log_file().is_none());
    }

    #[test]
    fn parse_unknown_fields_are_ignored() {
        let toml_str = r#"
unknown_key = "hello"

[dashboard]
future_field = 42
"#;
        let config: Config = toml::from_str(toml_str).expect("unknown fields are ignored");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn invalid_storage_variant_is_rejected() {
        let result: Result<Config, _> = toml::from_str("[dashboard]\nstorage = \"cloud\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn remote_timeout_rejects_garbage_and_zero() {
        let mut config = Config::default();
        config.remote.timeout = "soon".to_string();
        assert!(matches!(
            config.remote_timeout(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "remote.timeout"
        ));

        config.remote.timeout = "0s".to_string();
        assert!(config.remote_timeout().is_err());
    }

    #[test]
    fn remote_user_prefers_configured_value() {
        let mut config = Config::default();
        config.remote.user = "bob".to_string();
        assert_eq!(config.remote_user(), "bob");
    }

    #[test]
    fn log_level_directives() {
        let levels = [
            (LogLevel::Error, "error"),
            (LogLevel::Warn, "warn"),
            (LogLevel::Info, "info"),
            (LogLevel::Debug, "debug"),
            (LogLevel::Trace, "trace"),
        ];
        for (level, directive) in levels {
            assert_eq!(level.as_str(), directive);
        }
    }
}
