//! Command implementations for the `pmd` CLI.
//!
//! - `dashboard` - layout commands on one project (show, add, ..., tui)
//! - `daemon` - configuration daemon lifecycle and health
//! - `config` - configuration file management

pub(crate) mod config;
pub(crate) mod daemon;
pub(crate) mod dashboard;

pub(crate) use config::*;
pub(crate) use daemon::*;
pub(crate) use dashboard::*;
