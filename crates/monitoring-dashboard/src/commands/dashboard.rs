//! Layout commands on one project's dashboard.
//!
//! Each command loads the session (stored override or baseline), applies
//! one change, lets the session persist it and prints the outcome.

use clap::Subcommand;
use monitoring_dashboard::config::loader::ConfigLoader;
use monitoring_dashboard::config::schema::{Config, LogLevel};
use monitoring_dashboard::daemon::logging;
use monitoring_dashboard::presenter::SystemClipboard;
use monitoring_dashboard::tui::app::App;
use monitoring_dashboard::DashboardSession;
use std::error::Error;
use std::path::Path;
use std::process::ExitCode;

/// Commands that act on one project's layout.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub(crate) enum DashboardCommand {
    /// Print the configuration panel
    Show {
        /// Print an HTML fragment instead of text
        #[arg(long)]
        html: bool,
    },

    /// Place a hidden portlet
    Add {
        /// Portlet id
        id: String,
        /// Width in grid units (default: the portlet's default)
        #[arg(long, value_parser = span_parser())]
        width: Option<u32>,
        /// Height in grid units (default: the portlet's default)
        #[arg(long, value_parser = span_parser())]
        height: Option<u32>,
        /// Color (default: the portlet's default)
        #[arg(long)]
        color: Option<String>,
    },

    /// Hide a placed portlet
    Remove {
        /// Portlet id
        id: String,
    },

    /// Move a placed portlet to a position among the visible ones
    Move {
        /// Portlet id
        id: String,
        /// Zero-based target position
        index: usize,
    },

    /// Change the span of a placed portlet
    Resize {
        /// Portlet id
        id: String,
        /// Width in grid units
        #[arg(value_parser = span_parser())]
        width: u32,
        /// Height in grid units
        #[arg(value_parser = span_parser())]
        height: u32,
    },

    /// Change the color of a placed portlet
    Recolor {
        /// Portlet id
        id: String,
        /// New color
        color: String,
    },

    /// Copy the displayed configuration to the clipboard
    Copy,

    /// Delete the stored override and return to the baseline
    Reset,

    /// Launch the terminal user interface
    Tui,
}

/// Widget spans are 1 to 5 grid units.
fn span_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(1..=5)
}

/// Loads the project's session and runs `command` on it.
pub(crate) fn run_dashboard_command(
    config_path: Option<&Path>,
    project: Option<&str>,
    command: DashboardCommand,
) -> ExitCode {
    let config = match ConfigLoader::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_logging(&config, &command) {
        eprintln!("Error: failed to open log file: {e}");
        return ExitCode::FAILURE;
    }

    let mut session =
        match DashboardSession::from_config(&config, project, config_path.map(Path::to_path_buf)) {
            Ok(session) => session,
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
    let result = rt.block_on(async {
        session.init().await;
        execute(session, command).await
    });
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// The TUI owns the terminal, so it only logs to the configured file.
fn init_logging(config: &Config, command: &DashboardCommand) -> std::io::Result<()> {
    match command {
        DashboardCommand::Tui => {
            logging::init_quiet(config.daemon.log_level, config.log_file().as_deref())
        }
        _ => logging::init(LogLevel::Warn, None),
    }
}

async fn execute(
    mut session: DashboardSession,
    command: DashboardCommand,
) -> Result<(), Box<dyn Error>> {
    match command {
        DashboardCommand::Show { html: true } => println!("{}", session.view().to_html()),
        DashboardCommand::Show { html: false } => print!("{}", session.view().to_text()),
        DashboardCommand::Add {
            id,
            width,
            height,
            color,
        } => {
            let widget = session.add(&id, width, height, color.as_deref()).await?;
            println!(
                "Added {} ({}x{}, {})",
                widget.id, widget.width, widget.height, widget.color
            );
        }
        DashboardCommand::Remove { id } => {
            session.remove(&id).await?;
            println!("Removed {id}");
        }
        DashboardCommand::Move { id, index } => {
            session.move_to(&id, index).await?;
            let order: Vec<&str> = session.visible().iter().map(|w| w.id.as_str()).collect();
            println!("Moved {id}: {}", order.join(", "));
        }
        DashboardCommand::Resize { id, width, height } => {
            session.resize(&id, width, height).await?;
            println!("Resized {id} to {width}x{height}");
        }
        DashboardCommand::Recolor { id, color } => {
            session.recolor(&id, &color).await?;
            println!("{id} is now {color}");
        }
        DashboardCommand::Copy => {
            session.copy(&mut SystemClipboard)?;
            println!("Copied configuration to clipboard");
        }
        DashboardCommand::Reset => {
            session.reset().await?;
            println!("Layout reset to the baseline");
        }
        DashboardCommand::Tui => {
            let mut app = App::new(session);
            app.run().await?;
        }
    }
    Ok(())
}
