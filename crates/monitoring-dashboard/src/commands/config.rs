//! `pmd config` subcommands.

use monitoring_dashboard::config::{default, loader::ConfigLoader, xdg};
use std::path::Path;
use std::process::ExitCode;

/// Writes the commented template to `path` (or the XDG location).
pub(crate) fn run_config_init(path: Option<&Path>, force: bool) -> ExitCode {
    let result = match path {
        Some(path) => default::create_default_config_at(path, force),
        None => default::create_default_config(force),
    };
    match result {
        Ok(path) => {
            println!("Created configuration at {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Config error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Prints the configuration file in use.
pub(crate) fn run_config_path(path: Option<&Path>) -> ExitCode {
    match path {
        Some(path) => println!("{}", path.display()),
        None => println!("{}", xdg::config_path().display()),
    }
    ExitCode::SUCCESS
}

/// Parses the configuration file and prints the result.
pub(crate) fn run_config_validate(path: Option<&Path>) -> ExitCode {
    match ConfigLoader::load(path) {
        Ok(config) => {
            if let Err(e) = config.remote_timeout() {
                eprintln!("Config error: {e}");
                return ExitCode::FAILURE;
            }
            println!("Configuration is valid");
            println!("{config:#?}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Config error: {e}");
            ExitCode::FAILURE
        }
    }
}
