//! Client side of the configuration daemon socket.
//!
//! Provides connection setup with optional lazy start of the daemon.

mod connection;

pub use connection::{connect, connect_with_lazy_start, Client, ClientError};

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
