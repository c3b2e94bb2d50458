//! Logging initialization for `pmd`.
//!
//! Configures the `tracing` subscriber with level filtering via the `PMD_LOG`
//! environment variable. Falls back to the configured `daemon.log_level`
//! (default `info`) when the variable is unset or invalid. Records emitted
//! through the `log` facade by `portlet-grid` are forwarded to the same
//! subscriber.
//!
//! # Usage
//!
//! ```bash
//! # Configured level
//! pmd daemon
//!
//! # Debug level
//! PMD_LOG=debug pmd daemon
//!
//! # Module-specific filtering
//! PMD_LOG=portlet_grid=debug,warn pmd show
//! ```

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::schema::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "PMD_LOG";

/// Installs the global subscriber, writing to `log_file` or to stderr.
///
/// A second call is a no-op, so commands that run inside one another
/// (a foreground daemon started from `pmd status`) do not fail.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened.
pub fn init(level: LogLevel, log_file: Option<&Path>) -> io::Result<()> {
    match log_file {
        Some(path) => install_file(level, open_log_file(path)?),
        None => {
            let installed = fmt()
                .with_env_filter(filter_for(level))
                .with_target(false)
                .with_writer(io::stderr)
                .try_init();
            if installed.is_err() {
                tracing::debug!("tracing subscriber already installed");
            }
        }
    }
    Ok(())
}

/// Like [`init`], but never writes to the terminal: logs go to `log_file`
/// or nowhere. Used while the TUI owns the screen.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened.
pub fn init_quiet(level: LogLevel, log_file: Option<&Path>) -> io::Result<()> {
    if let Some(path) = log_file {
        install_file(level, open_log_file(path)?);
    }
    Ok(())
}

fn install_file(level: LogLevel, file: File) {
    let installed = fmt()
        .with_env_filter(filter_for(level))
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// `PMD_LOG` if set and valid, otherwise `level`.
fn filter_for(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}
