//! Client connection functionality with lazy-start capability.
//!
//! This module provides the core connection logic for the client, including
//! automatic daemon startup when the daemon is not running.

use std::env::current_exe;
use std::error::Error;
use std::fmt;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::time::sleep;

use crate::client::ClientResult;
use crate::{IpcCommand, IpcResponse};

/// Error types for client operations.
#[derive(Debug)]
pub enum ClientError {
    /// The daemon failed to start within the retry window.
    ///
    /// Contains the last connection error for diagnostic purposes.
    DaemonStartFailed {
        /// Number of connection attempts made.
        attempts: u32,
        /// The last error encountered during retry attempts.
        last_error: Option<io::Error>,
    },

    /// The daemon is not listening and lazy start is disabled.
    NotRunning(io::Error),

    /// Connection failed with an error lazy start cannot fix
    /// (permission denied, invalid path).
    ConnectionFailed(io::Error),

    /// Failed to spawn the daemon process.
    SpawnFailed(io::Error),

    /// Failed to determine the current executable path, which is needed to
    /// spawn the daemon from the same binary.
    ExecutableNotFound(io::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::DaemonStartFailed {
                attempts,
                last_error,
            } => {
                write!(
                    f,
                    "Daemon failed to start after {} attempts. Last error: {}",
                    attempts,
                    last_error
                        .as_ref()
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "unknown".to_string())
                )
            }
            ClientError::NotRunning(e) => {
                write!(
                    f,
                    "Configuration daemon is not running ({}). \
                    Start it with `pmd daemon` or set remote.autostart = true",
                    e
                )
            }
            ClientError::ConnectionFailed(e) => {
                write!(
                    f,
                    "Connection to daemon failed: {}. \
                    This error cannot be resolved by lazy-starting the daemon",
                    e
                )
            }
            ClientError::SpawnFailed(e) => {
                write!(f, "Failed to spawn daemon process: {}", e)
            }
            ClientError::ExecutableNotFound(e) => {
                write!(f, "Failed to find current executable: {}", e)
            }
        }
    }
}

impl Error for ClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ClientError::DaemonStartFailed { last_error, .. } => {
                last_error.as_ref().map(|e| e as &(dyn Error + 'static))
            }
            ClientError::NotRunning(e) => Some(e),
            ClientError::ConnectionFailed(e) => Some(e),
            ClientError::SpawnFailed(e) => Some(e),
            ClientError::ExecutableNotFound(e) => Some(e),
        }
    }
}

/// A connection to the configuration daemon.
#[derive(Debug)]
pub struct Client {
    reader: BufReader<tokio::net::unix::OwnedReadHalf>,
    writer: tokio::net::unix::OwnedWriteHalf,
}

impl Client {
    /// Wraps an established connection.
    pub fn new(stream: UnixStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Sends one command and reads its response line.
    ///
    /// A closed connection or an unparsable response is an
    /// `io::ErrorKind::UnexpectedEof` / `InvalidData` error.
    pub async fn send(&mut self, command: &IpcCommand) -> io::Result<IpcResponse> {
        self.writer
            .write_all(command.to_json_line().as_bytes())
            .await?;
        self.writer.flush().await?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "daemon closed the connection",
            ));
        }
        serde_json::from_str(line.trim()).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid daemon response: {e}"),
            )
        })
    }
}

/// Backoff configuration for connection retries.
const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 500;
const MAX_RETRIES: u32 = 10;

/// Connects to a running daemon without trying to start one.
pub async fn connect(socket_path: &Path) -> ClientResult<Client> {
    match UnixStream::connect(socket_path).await {
        Ok(stream) => Ok(Client::new(stream)),
        Err(e) if is_not_running(&e) => Err(ClientError::NotRunning(e)),
        Err(e) => Err(ClientError::ConnectionFailed(e)),
    }
}

/// Connects to the daemon, starting it if it is not running.
///
/// When the first attempt finds no daemon, spawns `pmd daemon --daemonize`
/// from the current executable and retries with exponential backoff
/// (10ms doubling up to 500ms, 10 attempts). Concurrent callers race on
/// binding the socket, so at most one daemon survives.
pub async fn connect_with_lazy_start(
    socket_path: &Path,
    config_path: Option<&Path>,
) -> ClientResult<Client> {
    match UnixStream::connect(socket_path).await {
        Ok(stream) => {
            tracing::debug!("Connected to existing daemon at {:?}", socket_path);
            return Ok(Client::new(stream));
        }
        Err(e) if is_not_running(&e) => {
            tracing::info!(
                "Daemon not running at {:?} ({}), attempting lazy-start",
                socket_path,
                e
            );
        }
        Err(e) => {
            tracing::error!(
                "Connection to daemon at {:?} failed with non-recoverable error: {}",
                socket_path,
                e
            );
            return Err(ClientError::ConnectionFailed(e));
        }
    }

    spawn_daemon(socket_path, config_path)?;

    let mut last_error: Option<io::Error> = None;
    for attempt in 0..MAX_RETRIES {
        let delay = calculate_backoff(attempt);
        sleep(delay).await;

        match UnixStream::connect(socket_path).await {
            Ok(stream) => {
                tracing::info!("Connected to daemon after {} retries", attempt + 1);
                return Ok(Client::new(stream));
            }
            Err(e) => {
                tracing::debug!(
                    "Connection attempt {} failed: {}, retrying in {:?}",
                    attempt + 1,
                    e,
                    delay
                );
                last_error = Some(e);
            }
        }
    }

    Err(ClientError::DaemonStartFailed {
        attempts: MAX_RETRIES,
        last_error,
    })
}

fn is_not_running(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
    )
}

/// Spawns `pmd daemon --daemonize --socket <path>` in the background.
///
/// Only spawns; readiness is checked by the caller.
fn spawn_daemon(socket_path: &Path, config_path: Option<&Path>) -> Result<(), ClientError> {
    let exe = current_exe().map_err(ClientError::ExecutableNotFound)?;
    tracing::info!("Spawning daemon from {:?}", exe);

    let mut command = Command::new(&exe);
    if let Some(config) = config_path {
        command.arg("--config").arg(config);
    }
    let child = command
        .args(["daemon", "--daemonize", "--socket"])
        .arg(socket_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(ClientError::SpawnFailed)?;

    tracing::info!("Daemon spawned successfully with PID {}", child.id());
    Ok(())
}

/// Exponential backoff for the given zero-indexed attempt, capped at
/// `MAX_BACKOFF_MS`.
fn calculate_backoff(attempt: u32) -> Duration {
    let delay_ms = INITIAL_BACKOFF_MS.saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
    Duration::from_millis(delay_ms.min(MAX_BACKOFF_MS))
}

#[cfg(test)]
mod tests;
