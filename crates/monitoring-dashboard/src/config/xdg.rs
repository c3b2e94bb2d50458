//! Platform-aware path resolution for portlet-dashboard.
//!
//! On **Linux**, follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/portlet-dashboard` or `~/.config/portlet-dashboard`
//! - Data: `$XDG_DATA_HOME/portlet-dashboard` or `~/.local/share/portlet-dashboard`
//! - Runtime/socket: `$XDG_RUNTIME_DIR` or `/tmp`
//!
//! On **macOS**, uses Apple conventions with XDG env var overrides:
//! - Config and data: `~/Library/Application Support/portlet-dashboard`
//! - Runtime/socket: `$XDG_RUNTIME_DIR` or `$TMPDIR` or `/tmp`

use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "portlet-dashboard";

/// Value of an XDG directory variable, if set.
fn xdg_var(name: &str) -> Option<PathBuf> {
    std::env::var_os(name).map(PathBuf::from)
}

fn home() -> PathBuf {
    dirs::home_dir().expect("could not determine home directory")
}

/// Configuration directory: `$XDG_CONFIG_HOME/portlet-dashboard` when set
/// (any platform), else `~/.config/portlet-dashboard` on Linux and the
/// Application Support directory on macOS.
pub fn config_dir() -> PathBuf {
    let base = xdg_var("XDG_CONFIG_HOME").unwrap_or_else(|| {
        if cfg!(target_os = "macos") {
            dirs::config_dir().expect("could not determine config directory")
        } else {
            home().join(".config")
        }
    });
    base.join(APP_NAME)
}

/// The main configuration file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Data directory holding local storage and daemon state.
///
/// Same resolution as [`config_dir`] with `$XDG_DATA_HOME` and
/// `~/.local/share`.
pub fn data_dir() -> PathBuf {
    let base = xdg_var("XDG_DATA_HOME").unwrap_or_else(|| {
        if cfg!(target_os = "macos") {
            dirs::data_dir().expect("could not determine data directory")
        } else {
            home().join(".local/share")
        }
    });
    base.join(APP_NAME)
}

/// Default location of the local-storage file.
pub fn local_storage_path() -> PathBuf {
    data_dir().join("local-storage.json")
}

/// Default location of the widget definition file.
pub fn portlets_path() -> PathBuf {
    config_dir().join("portlets.json")
}

/// Directory for the daemon socket: `$XDG_RUNTIME_DIR`, then `$TMPDIR`
/// on macOS, then `/tmp`.
pub fn runtime_dir() -> PathBuf {
    if let Some(dir) = xdg_var("XDG_RUNTIME_DIR") {
        return dir;
    }
    if cfg!(target_os = "macos") {
        if let Some(tmp) = xdg_var("TMPDIR") {
            return tmp;
        }
    }
    PathBuf::from("/tmp")
}

/// `runtime_dir()/portlet-dashboard.sock`.
pub fn socket_path() -> PathBuf {
    runtime_dir().join(format!("{APP_NAME}.sock"))
}

/// Replaces a leading `~` with the home directory. Other paths are
/// returned unchanged.
pub fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some("") => home(),
        Some(rest) if rest.starts_with('/') => home().join(&rest[1..]),
        _ => PathBuf::from(path),
    }
}

/// Creates a directory and all parent directories with mode 0700.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}
