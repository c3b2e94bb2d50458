//! Portlet monitoring dashboard
//!
//! Session, configuration stores and operator surfaces for a dashboard built
//! on [`portlet_grid`]. A project's layout override lives either in a local
//! key-value file or in the per-user properties held by the configuration
//! daemon (`pmd daemon`), which clients reach over a Unix socket.
//!
//! # Platform Support
//!
//! Unix-like systems only: the daemon uses Unix domain sockets, `fork()` and
//! Unix signals.

/// Atomic JSON file writes.
pub mod atomic;

/// Client module for daemon communication with lazy-start capability.
pub mod client;

/// Configuration file, XDG paths and widget definitions.
pub mod config;

/// Configuration daemon: per-user properties behind a Unix socket.
pub mod daemon;

/// Panel badges, JSON preview and clipboard.
pub mod presenter;

/// Project identity and derived storage keys.
pub mod project;

/// The live dashboard of one project.
pub mod session;

/// Local and remote configuration stores.
pub mod store;

/// TUI module providing the terminal user interface for the dashboard.
pub mod tui;

/// IPC wire types for JSON Lines protocol.
mod ipc;
pub use ipc::*;

pub use daemon::DaemonConfig;
pub use session::{DashboardSession, SessionError, SessionResult};
pub use store::{ConfigStore, StorageVariant, StoreError};
