//! Portlet Monitoring Dashboard - CLI entry point
//!
//! `pmd` edits a project's dashboard layout from the command line or the
//! TUI, and runs the configuration daemon that holds remote overrides.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use commands::DashboardCommand;

/// Portlet monitoring dashboard
#[derive(Parser)]
#[command(name = "pmd")]
#[command(version, about = "Portlet monitoring dashboard")]
struct Cli {
    /// Configuration file (default: $XDG_CONFIG_HOME/portlet-dashboard/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project name or dashboard URL path (overrides dashboard.project)
    #[arg(long, global = true)]
    project: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the pmd CLI
#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Dashboard(DashboardCommand),

    /// Start the configuration daemon
    Daemon {
        /// Run as a background daemon (detached from terminal)
        #[arg(long)]
        daemonize: bool,

        /// Socket path (overrides remote.socket)
        #[arg(long)]
        socket: Option<PathBuf>,
    },

    /// Check daemon health and whether the project is synced
    Status,

    /// Manage configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Actions for the `config` subcommand.
#[derive(Subcommand)]
enum ConfigAction {
    /// Create default configuration file
    Init {
        /// Overwrite existing configuration (creates backup)
        #[arg(long)]
        force: bool,
    },
    /// Show configuration file path
    Path,
    /// Validate configuration file
    Validate,
}

fn main() -> ExitCode {
    // Parse CLI arguments BEFORE any fork/runtime operations so errors reach
    // the terminal.
    let cli = Cli::parse();
    let config = cli.config.as_deref();
    let project = cli.project.as_deref();

    match cli.command {
        Commands::Dashboard(command) => commands::run_dashboard_command(config, project, command),
        Commands::Daemon { daemonize, socket } => {
            commands::run_daemon_command(config, socket, daemonize)
        }
        Commands::Status => commands::run_status_command(config, project),
        Commands::Config { action } => match action {
            ConfigAction::Init { force } => commands::run_config_init(config, force),
            ConfigAction::Path => commands::run_config_path(config),
            ConfigAction::Validate => commands::run_config_validate(config),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_apply_to_every_subcommand() {
        let cli = Cli::try_parse_from(["pmd", "show", "--project", "My Project", "--config", "/tmp/c.toml"])
            .expect("parse");
        assert_eq!(cli.project.as_deref(), Some("My Project"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(
            cli.command,
            Commands::Dashboard(DashboardCommand::Show { html: false })
        ));
    }

    #[test]
    fn add_accepts_optional_geometry() {
        let cli = Cli::try_parse_from(["pmd", "add", "pr-overview", "--width", "3", "--color", "green"])
            .expect("parse");
        match cli.command {
            Commands::Dashboard(DashboardCommand::Add {
                id,
                width,
                height,
                color,
            }) => {
                assert_eq!(id, "pr-overview");
                assert_eq!(width, Some(3));
                assert_eq!(height, None);
                assert_eq!(color.as_deref(), Some("green"));
            }
            _ => panic!("unexpected command variant"),
        }
    }

    #[test]
    fn spans_outside_the_grid_are_rejected() {
        assert!(Cli::try_parse_from(["pmd", "resize", "A", "6", "1"]).is_err());
        assert!(Cli::try_parse_from(["pmd", "resize", "A", "0", "1"]).is_err());
        assert!(Cli::try_parse_from(["pmd", "add", "A", "--height", "9"]).is_err());
        assert!(Cli::try_parse_from(["pmd", "resize", "A", "5", "1"]).is_ok());
    }

    #[test]
    fn move_takes_an_index() {
        let cli = Cli::try_parse_from(["pmd", "move", "A", "2"]).expect("parse");
        match cli.command {
            Commands::Dashboard(command) => assert_eq!(
                command,
                DashboardCommand::Move {
                    id: "A".to_string(),
                    index: 2
                }
            ),
            _ => panic!("unexpected command variant"),
        }
        assert!(Cli::try_parse_from(["pmd", "move", "A", "-1"]).is_err());
    }

    #[test]
    fn daemon_socket_is_optional() {
        let cli = Cli::try_parse_from(["pmd", "daemon"]).expect("parse");
        match cli.command {
            Commands::Daemon { daemonize, socket } => {
                assert!(!daemonize);
                assert_eq!(socket, None);
            }
            _ => panic!("unexpected command variant"),
        }

        let cli = Cli::try_parse_from(["pmd", "daemon", "--daemonize", "--socket", "/custom/path.sock"])
            .expect("parse");
        match cli.command {
            Commands::Daemon { daemonize, socket } => {
                assert!(daemonize);
                assert_eq!(socket, Some(PathBuf::from("/custom/path.sock")));
            }
            _ => panic!("unexpected command variant"),
        }
    }

    #[test]
    fn config_init_takes_force() {
        let cli = Cli::try_parse_from(["pmd", "config", "init", "--force"]).expect("parse");
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Init { force: true }
            }
        ));
        assert!(matches!(
            Cli::try_parse_from(["pmd", "status"]).expect("parse").command,
            Commands::Status
        ));
    }
}
