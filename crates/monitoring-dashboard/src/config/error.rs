//! Configuration error types for loading and parsing TOML config files.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading, resolving or writing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("Invalid configuration at {path}:{line}:{column}: {message}")]
    ParseError {
        /// Path to the file containing the error.
        path: PathBuf,
        /// One-based line index of the error (0 if unknown).
        line: usize,
        /// One-based column index of the error (0 if unknown).
        column: usize,
        /// Human-readable description of the parse failure.
        message: String,
    },

    /// An explicitly requested file does not exist.
    #[error("{message}\nPath: {path}")]
    NotFound {
        /// Path that was requested but does not exist.
        path: PathBuf,
        /// What was being looked for.
        message: String,
    },

    /// A configuration file already exists at the target path.
    #[error("Configuration file already exists: {path}")]
    AlreadyExists {
        /// Path where the file already exists.
        path: PathBuf,
    },

    /// Failed to write a configuration file to disk.
    #[error("Failed to write configuration file: {path}")]
    WriteError {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration to TOML.
    #[error("Failed to serialize configuration: {message}")]
    SerializeError {
        /// Description of the serialization failure.
        message: String,
    },

    /// A field parsed but holds a value that cannot be used.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Dotted field name, e.g. `remote.timeout`.
        field: String,
        /// Why the value was rejected.
        message: String,
    },

    /// The widget definition or baseline file is not a valid document.
    #[error("Invalid dashboard file {path}: {source}")]
    Dashboard {
        /// File that failed to load.
        path: PathBuf,
        /// Parse failure reported by the grid crate.
        #[source]
        source: portlet_grid::Error,
    },
}
