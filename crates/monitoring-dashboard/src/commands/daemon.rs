//! Daemon commands.
//!
//! - `daemon` - run the configuration daemon
//! - `status` - daemon health plus the project's sync state

use monitoring_dashboard::config::loader::ConfigLoader;
use monitoring_dashboard::config::schema::{Config, LogLevel};
use monitoring_dashboard::daemon::{logging, run_daemon};
use monitoring_dashboard::project::ProjectId;
use monitoring_dashboard::store::RemoteStore;
use monitoring_dashboard::{format_uptime, DaemonConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

/// Runs the daemon in the foreground or detached.
pub(crate) fn run_daemon_command(
    config_path: Option<&Path>,
    socket: Option<PathBuf>,
    daemonize: bool,
) -> ExitCode {
    let config = match ConfigLoader::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Daemonization and the runtime start inside run_daemon, in that order.
    if let Err(e) = run_daemon(DaemonConfig::from_config(&config, socket, daemonize)) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Queries STATUS and SYNCED and prints them.
pub(crate) fn run_status_command(config_path: Option<&Path>, project: Option<&str>) -> ExitCode {
    let config = match ConfigLoader::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logging::init(LogLevel::Warn, None) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }
    let store = match status_store(&config, project) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    rt.block_on(async {
        let status = match store.status().await {
            Ok(status) => status,
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
        };
        println!("Daemon: running");
        println!("  Version:     {}", status.version);
        println!("  Uptime:      {}", format_uptime(Duration::from_secs(status.uptime_seconds)));
        println!("  Started:     {}", status.started_at);
        println!("  Users:       {}", status.users);
        println!("  Connections: {}", status.active_connections);
        println!("  Socket:      {}", status.socket_path);

        match store.synced().await {
            Ok(synced) => {
                let state = if synced { "synced with the baseline" } else { "overridden" };
                println!("Project {} ({}): {}", store.project(), store.user(), state);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        }
    })
}

/// Remote store for the status query. Never starts the daemon.
fn status_store(config: &Config, project: Option<&str>) -> Result<RemoteStore, String> {
    let project = ProjectId::resolve(project.unwrap_or(&config.dashboard.project));
    let timeout = config.remote_timeout().map_err(|e| e.to_string())?;
    Ok(RemoteStore::new(
        config.socket_path(),
        config.remote_user(),
        project.slug(),
        timeout,
    ))
}
