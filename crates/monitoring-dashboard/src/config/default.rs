//! Default configuration template and file creation utilities.
//!
//! Provides a commented TOML template that matches `Config::default()` and
//! functions to write it to the XDG config path (or an explicit path).

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::error::ConfigError;
use crate::config::xdg;

// ---------------------------------------------------------------------------
// Default TOML template
// ---------------------------------------------------------------------------

/// A commented TOML template with all default values.
///
/// Every value here must match `Config::default()` from `schema.rs`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Portlet Dashboard Configuration
#
# This file was generated with the built-in defaults.
# Modify options to customize how the dashboard loads and stores layouts.
#
# Location: $XDG_CONFIG_HOME/portlet-dashboard/config.toml

# ==============================================================================
# Dashboard
# ==============================================================================

[dashboard]

# Project whose layout is shown.
# A display name ("My Project") or a URL path ("/jenkins/job/My%20Project/").
# Empty uses the name of the current directory.
project = ""

# Where layout overrides are persisted.
# Options: "local", "remote"
#   local  - a key-value file on this machine, one entry per project
#   remote - the pmd configuration daemon, stored per user and project
storage = "local"

# How attributes equal to a widget's default are written.
# Options: "omit", "explicit"
#   omit     - entries carry only what differs from the widget default
#   explicit - entries always carry width, height and color
defaults = "omit"

# Widget definition file: a JSON list of
# {"id", "width", "height", "color", "icon", "link", "default"}.
# Empty means portlets.json next to this file.
portlets = ""

# Baseline layout the dashboard is compared against and reset to.
# Empty derives it from the definitions marked "default": true.
baseline = ""

# ==============================================================================
# Local storage
# ==============================================================================

[local]

# Key-value file holding local layout overrides.
# Empty means $XDG_DATA_HOME/portlet-dashboard/local-storage.json
storage_path = ""

# ==============================================================================
# Remote storage
# ==============================================================================

[remote]

# Socket of the configuration daemon.
# Empty means $XDG_RUNTIME_DIR/portlet-dashboard.sock
socket = ""

# User whose overrides are read and written. Empty means $USER.
user = ""

# Upper bound for connecting to, writing to and reading from the daemon.
# Examples: "5s", "750ms"
timeout = "5s"

# Start the daemon in the background when it is not running.
autostart = false

# ==============================================================================
# Daemon
# ==============================================================================

[daemon]

# Logging verbosity level. PMD_LOG overrides it.
# Options: "error", "warn", "info", "debug", "trace"
log_level = "info"

# Path to log file. Empty string means stderr for the daemon and no logging
# for the TUI.
log_file = ""

# Directory holding per-user layout properties (users/<user>.json).
# Empty means $XDG_DATA_HOME/portlet-dashboard
data_dir = ""
"#;

// ---------------------------------------------------------------------------
// File creation functions
// ---------------------------------------------------------------------------

/// Creates (or force-overwrites) the default config file at the XDG path.
pub fn create_default_config(force: bool) -> Result<PathBuf, ConfigError> {
    create_default_config_at(&xdg::config_path(), force)
}

/// Creates (or force-overwrites) the default config file at `path`.
///
/// - If the file exists and `force` is `false`, returns `ConfigError::AlreadyExists`.
/// - If the file exists and `force` is `true`, backs it up to `.toml.backup` first.
/// - Returns the path where the config was written.
pub fn create_default_config_at(path: &Path, force: bool) -> Result<PathBuf, ConfigError> {
    if path.exists() {
        if !force {
            return Err(ConfigError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        let backup_path = path.with_extension("toml.backup");
        fs::rename(path, &backup_path).map_err(|e| ConfigError::WriteError {
            path: backup_path.clone(),
            source: e,
        })?;
        tracing::info!("Backed up existing config to {}", backup_path.display());
    }

    write_default_config(path)?;
    Ok(path.to_path_buf())
}

/// Writes the default template to `path`, creating parent dirs and setting 0600 permissions.
fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let write_error = |source| ConfigError::WriteError {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        xdg::ensure_dir(parent).map_err(write_error)?;
    }

    fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(write_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(write_error)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
