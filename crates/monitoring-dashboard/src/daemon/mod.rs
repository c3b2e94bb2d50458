//! Configuration daemon.
//!
//! Holds every user's configuration property and serves the remote store
//! variant over a Unix socket. This module provides process lifecycle
//! management, daemonization, and the main entry point.

mod handlers;
pub mod logging;
pub mod property;
pub mod server;

pub use property::{ConfigurationProperty, PropertyStore};
pub use server::SocketServer;

use std::error::Error;
use std::path::PathBuf;

use fork::{daemon, Fork};
use tokio::runtime::Runtime;
use tokio::signal;
use tokio::signal::unix::{signal as unix_signal, SignalKind};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::config::schema::{Config, LogLevel};

/// Result type alias for daemon operations.
pub type DaemonResult<T> = Result<T, Box<dyn Error>>;

/// Runtime settings of one daemon process.
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonConfig {
    /// Socket to listen on.
    pub socket_path: PathBuf,
    /// Whether to detach from the terminal.
    pub daemonize: bool,
    /// Directory holding `users/<user>.json`.
    pub data_dir: PathBuf,
    /// Level used when `PMD_LOG` is unset.
    pub log_level: LogLevel,
    /// Log file, `None` for stderr.
    pub log_file: Option<PathBuf>,
}

impl DaemonConfig {
    /// Settings from the `[remote]` and `[daemon]` sections. `socket`
    /// overrides `remote.socket`.
    pub fn from_config(config: &Config, socket: Option<PathBuf>, daemonize: bool) -> Self {
        Self {
            socket_path: socket.unwrap_or_else(|| config.socket_path()),
            daemonize,
            data_dir: config.daemon_data_dir(),
            log_level: config.daemon.log_level,
            log_file: config.log_file(),
        }
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
///
/// If SIGTERM handler registration fails, falls back to SIGINT only.
async fn wait_for_shutdown() {
    match unix_signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!("received SIGINT (Ctrl+C), shutting down");
                },
                _ = sigterm.recv() => {
                    info!("received SIGTERM, shutting down");
                },
            }
        }
        Err(e) => {
            warn!(error = %e, "could not register SIGTERM handler, using SIGINT only");
            if let Err(e) = signal::ctrl_c().await {
                error!(error = %e, "failed waiting for SIGINT");
            } else {
                info!("received SIGINT (Ctrl+C), shutting down");
            }
        }
    }
}

/// Daemonize the current process.
///
/// The parent exits with code 0; the child continues detached.
///
/// * `nochdir` - If false, changes the working directory to `/`.
/// * `noclose` - If false, redirects stdin/stdout/stderr to /dev/null.
///
/// Must be called BEFORE starting the Tokio runtime: forking after it
/// starts breaks its signal handling.
pub fn daemonize_process(nochdir: bool, noclose: bool) -> DaemonResult<()> {
    match daemon(nochdir, noclose) {
        Ok(Fork::Child) => Ok(()),
        Ok(Fork::Parent(_)) => {
            std::process::exit(0);
        }
        Err(e) => Err(Box::new(std::io::Error::other(format!(
            "Failed to daemonize: {}",
            e
        )))),
    }
}

/// Runs the daemon until SIGINT or SIGTERM.
///
/// Daemonizes first if requested, then starts logging and the runtime,
/// binds the socket and serves clients. The socket file is removed on
/// shutdown.
pub fn run_daemon(config: DaemonConfig) -> DaemonResult<()> {
    if config.daemonize {
        // Keep the working directory so relative data and log paths resolve.
        daemonize_process(true, false)?;
    }

    logging::init(config.log_level, config.log_file.as_deref())?;

    info!(
        socket_path = %config.socket_path.display(),
        data_dir = %config.data_dir.display(),
        daemonize = config.daemonize,
        "configuration daemon starting"
    );

    let runtime = Runtime::new().map_err(|e| {
        Box::new(std::io::Error::other(format!(
            "Failed to create Tokio runtime: {}",
            e
        ))) as Box<dyn Error>
    })?;

    runtime.block_on(async {
        let properties = PropertyStore::new(&config.data_dir);
        let mut server =
            SocketServer::new(config.socket_path.to_string_lossy().into_owned(), properties);
        server.start().await?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(async move {
            wait_for_shutdown().await;
            let _ = shutdown_tx.send(());
        });

        info!("daemon running, press Ctrl+C or send SIGTERM to stop");
        server.run_with_shutdown(shutdown_rx).await?;
        Ok::<(), Box<dyn Error>>(())
    })?;

    info!("daemon stopped");
    Ok(())
}
