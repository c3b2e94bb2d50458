//! Unix socket server for the configuration daemon.
//!
//! Clients (remote stores in `pmd show`, `pmd tui` and friends) connect,
//! send JSON Lines commands and read one JSON line back per command. Each
//! connection is served by its own task; the per-user properties are shared
//! behind a lock.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;

use crate::daemon::handlers::{
    handle_default_command, handle_get_command, handle_reset_command, handle_save_command,
    handle_status_command, handle_synced_command, DaemonState,
};
use crate::daemon::property::PropertyStore;
use crate::{IpcCommand, IpcResponse, IPC_VERSION};

/// Unix socket server for daemon IPC.
///
/// The `SocketServer` handles:
/// - Stale socket cleanup on startup
/// - Socket cleanup on shutdown (via Drop)
/// - Connection acceptance, one task per client
pub struct SocketServer {
    /// Path to the Unix socket file
    socket_path: String,
    /// The Unix listener, set after start() is called
    listener: Option<UnixListener>,
    /// Per-user configuration properties
    properties: PropertyStore,
    /// Timestamp when the server was created (for uptime calculation).
    start_time: Instant,
    /// Count of currently active client connections.
    active_connections: Arc<AtomicUsize>,
}

impl SocketServer {
    /// Creates a server for `socket_path` serving `properties`.
    ///
    /// The server is not started until `start()` is called.
    pub fn new(socket_path: String, properties: PropertyStore) -> Self {
        tracing::debug!("Creating SocketServer with path: {}", socket_path);
        Self {
            socket_path,
            listener: None,
            properties,
            start_time: Instant::now(),
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns the configured socket path.
    pub fn socket_path(&self) -> &str {
        &self.socket_path
    }

    /// Returns the count of active connections.
    pub fn active_connection_count(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Removes a socket file left behind by a crashed daemon.
    ///
    /// # Errors
    ///
    /// Returns `AddrInUse` if a live daemon still answers on the socket.
    async fn cleanup_stale_socket(&self) -> std::io::Result<()> {
        let path = Path::new(&self.socket_path);
        if !path.exists() {
            return Ok(());
        }

        match UnixStream::connect(&self.socket_path).await {
            Ok(_) => {
                tracing::error!("Another daemon is already running at {}", self.socket_path);
                Err(std::io::Error::new(
                    std::io::ErrorKind::AddrInUse,
                    "Another daemon is already running",
                ))
            }
            Err(_) => {
                tracing::info!("Removing stale socket file at {}", self.socket_path);
                fs::remove_file(path)
            }
        }
    }

    /// Cleans up any stale socket and binds.
    ///
    /// # Errors
    ///
    /// Returns an error if another daemon is running, the stale socket cannot
    /// be removed, or binding fails.
    pub async fn start(&mut self) -> std::io::Result<()> {
        self.cleanup_stale_socket().await?;

        if let Some(parent) = Path::new(&self.socket_path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        self.listener = Some(listener);
        tracing::info!("Socket server started at {}", self.socket_path);
        Ok(())
    }

    /// Runs the accept loop until `shutdown_rx` fires.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` if called before `start()`.
    pub async fn run_with_shutdown(
        &self,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> std::io::Result<()> {
        let Some(listener) = self.listener.as_ref() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Server not started - call start() first",
            ));
        };

        let daemon_state = DaemonState {
            properties: self.properties.clone(),
            start_time: self.start_time,
            started_at: Local::now(),
            active_connections: Arc::clone(&self.active_connections),
            socket_path: self.socket_path.clone(),
        };

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, _addr)) => {
                            tracing::debug!("Accepted new client connection");
                            let state = daemon_state.clone();
                            tokio::spawn(async move {
                                state.active_connections.fetch_add(1, Ordering::Relaxed);
                                let result = handle_client(stream, &state).await;
                                state.active_connections.fetch_sub(1, Ordering::Relaxed);
                                if let Err(e) = result {
                                    tracing::warn!("Client handler error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        Ok(())
    }
}

impl Drop for SocketServer {
    fn drop(&mut self) {
        if self.listener.is_none() {
            return;
        }
        let path = Path::new(&self.socket_path);
        if path.exists() {
            tracing::debug!("Cleaning up socket file: {}", self.socket_path);
            if let Err(e) = fs::remove_file(path) {
                tracing::error!(
                    "Failed to remove socket file '{}': {}. \
                    Next daemon start may fail. Manually remove the file if needed.",
                    self.socket_path,
                    e
                );
            }
        }
    }
}

/// Serves one client until it disconnects.
async fn handle_client(stream: UnixStream, state: &DaemonState) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            tracing::debug!("Client disconnected");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = dispatch(trimmed, state).await;
        writer.write_all(response.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Parses one command line and runs its handler.
async fn dispatch(line: &str, state: &DaemonState) -> String {
    let cmd: IpcCommand = match serde_json::from_str(line) {
        Ok(cmd) => cmd,
        Err(e) => return IpcResponse::error(format!("invalid command: {e}")).to_json_line(),
    };
    if cmd.version != IPC_VERSION {
        return IpcResponse::error(format!(
            "unsupported protocol version {} (expected {})",
            cmd.version, IPC_VERSION
        ))
        .to_json_line();
    }

    tracing::debug!("{} from {:?}", cmd.cmd, cmd.user);
    match cmd.cmd.to_uppercase().as_str() {
        "GET" => handle_get_command(&cmd, &state.properties).await,
        "SAVE" => handle_save_command(&cmd, &state.properties).await,
        "RESET" => handle_reset_command(&cmd, &state.properties).await,
        "DEFAULT" => handle_default_command(&cmd, &state.properties).await,
        "SYNCED" => handle_synced_command(&cmd, &state.properties).await,
        "STATUS" => handle_status_command(state).await,
        other => IpcResponse::error(format!("unknown command: {other}")).to_json_line(),
    }
}
