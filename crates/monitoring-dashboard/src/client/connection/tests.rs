use super::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::time::timeout;

/// Atomic counter for generating unique socket paths across parallel tests.
static TEST_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Socket paths have a short length limit, so stay out of deep TMPDIRs.
fn create_temp_dir() -> TempDir {
    TempDir::new_in("/tmp").expect("Failed to create temp directory in /tmp")
}

fn unique_socket_path(temp_dir: &TempDir, prefix: &str) -> PathBuf {
    let count = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    temp_dir.path().join(format!("{}_{}.sock", prefix, count))
}

/// Accepts one connection and answers every line with `reply`.
fn spawn_echo_daemon(listener: UnixListener, reply: &'static str) -> tokio::task::JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let mut received = Vec::new();
        let Ok(Ok((stream, _))) = timeout(Duration::from_secs(5), listener.accept()).await else {
            return received;
        };
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            received.push(line);
            if writer.write_all(reply.as_bytes()).await.is_err() {
                break;
            }
        }
        received
    })
}

#[test]
fn test_client_error_display() {
    let err = ClientError::DaemonStartFailed {
        attempts: 10,
        last_error: None,
    };
    let display = err.to_string();
    assert!(display.contains("Daemon failed to start after 10 attempts"));
    assert!(display.contains("Last error: unknown"));
}

#[test]
fn test_not_running_display_mentions_autostart() {
    let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
    let display = ClientError::NotRunning(io_err).to_string();
    assert!(display.contains("not running"));
    assert!(display.contains("remote.autostart"));
}

#[test]
fn test_client_error_connection_failed_display() {
    let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
    let display = ClientError::ConnectionFailed(io_err).to_string();
    assert!(display.contains("Connection to daemon failed"));
    assert!(display.contains("cannot be resolved by lazy-starting"));
}

#[test]
fn test_client_error_sources() {
    let no_source = ClientError::DaemonStartFailed {
        attempts: 5,
        last_error: None,
    };
    assert!(no_source.source().is_none());

    let errors = [
        ClientError::DaemonStartFailed {
            attempts: 5,
            last_error: Some(io::Error::new(io::ErrorKind::ConnectionRefused, "refused")),
        },
        ClientError::NotRunning(io::Error::new(io::ErrorKind::NotFound, "gone")),
        ClientError::ConnectionFailed(io::Error::new(io::ErrorKind::PermissionDenied, "no")),
        ClientError::SpawnFailed(io::Error::new(io::ErrorKind::NotFound, "binary not found")),
        ClientError::ExecutableNotFound(io::Error::new(io::ErrorKind::NotFound, "exe")),
    ];
    for err in &errors {
        assert!(err.source().is_some(), "{err:?} should have a source");
    }
}

#[test]
fn test_backoff_delays() {
    let expected = [10, 20, 40, 80, 160, 320, 500, 500, 500, 500];
    for (attempt, ms) in expected.iter().enumerate() {
        assert_eq!(
            calculate_backoff(attempt as u32),
            Duration::from_millis(*ms),
            "attempt {attempt}"
        );
    }
    assert_eq!(calculate_backoff(MAX_RETRIES), Duration::from_millis(MAX_BACKOFF_MS));
    assert_eq!(calculate_backoff(200), Duration::from_millis(MAX_BACKOFF_MS));
}

#[test]
fn test_client_error_is_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<ClientError>();
    assert_sync::<ClientError>();
}

#[tokio::test]
async fn test_connect_to_missing_socket_is_not_running() {
    let temp_dir = create_temp_dir();
    let socket_path = unique_socket_path(&temp_dir, "missing");

    let result = connect(&socket_path).await;
    assert!(matches!(result, Err(ClientError::NotRunning(_))));
}

#[tokio::test]
async fn test_client_connects_to_existing_daemon() {
    let temp_dir = create_temp_dir();
    let socket_path = unique_socket_path(&temp_dir, "existing_daemon");
    let listener = UnixListener::bind(&socket_path).expect("Failed to bind socket");
    let server = spawn_echo_daemon(listener, "{\"version\":1,\"ok\":true}\n");

    let connect_result = timeout(
        Duration::from_secs(2),
        connect_with_lazy_start(&socket_path, None),
    )
    .await
    .expect("connection timed out");
    let mut client = connect_result.expect("failed to connect to existing daemon");

    let response = client
        .send(&IpcCommand::new("STATUS"))
        .await
        .expect("send");
    assert!(response.ok);
    drop(client);

    let received = server.await.expect("server task panicked");
    assert_eq!(received, vec!["{\"version\":1,\"cmd\":\"STATUS\"}".to_string()]);
}

#[tokio::test]
async fn test_send_reports_invalid_response() {
    let temp_dir = create_temp_dir();
    let socket_path = unique_socket_path(&temp_dir, "garbage");
    let listener = UnixListener::bind(&socket_path).expect("Failed to bind socket");
    let _server = spawn_echo_daemon(listener, "not json\n");

    let mut client = connect(&socket_path).await.expect("connect");
    let err = client
        .send(&IpcCommand::new("STATUS"))
        .await
        .expect_err("garbage must not parse");
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
}

#[tokio::test]
async fn test_send_reports_closed_connection() {
    let temp_dir = create_temp_dir();
    let socket_path = unique_socket_path(&temp_dir, "closed");
    let listener = UnixListener::bind(&socket_path).expect("Failed to bind socket");
    let server = tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            drop(stream);
        }
    });

    let mut client = connect(&socket_path).await.expect("connect");
    server.await.expect("server task panicked");
    let result = client.send(&IpcCommand::new("STATUS")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_concurrent_clients_connect_to_existing_daemon() {
    let temp_dir = create_temp_dir();
    let socket_path = unique_socket_path(&temp_dir, "concurrent");
    let listener = UnixListener::bind(&socket_path).expect("Failed to bind socket");

    let accept_handle = tokio::spawn(async move {
        let mut connections = 0;
        while let Ok(Ok((stream, _))) = timeout(Duration::from_secs(5), listener.accept()).await
        {
            connections += 1;
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                drop(stream);
            });
            if connections >= 3 {
                break;
            }
        }
        connections
    });

    let mut handles = Vec::new();
    for _ in 0..3 {
        let path = socket_path.clone();
        handles.push(tokio::spawn(async move {
            timeout(Duration::from_secs(3), connect_with_lazy_start(&path, None)).await
        }));
    }

    let mut successful_connections = 0;
    for handle in handles {
        if let Ok(Ok(Ok(_))) = handle.await {
            successful_connections += 1;
        }
    }
    assert_eq!(successful_connections, 3);
    assert_eq!(accept_handle.await.expect("Accept task panicked"), 3);
}

#[tokio::test]
async fn test_connection_to_invalid_path_fails() {
    let invalid_path = PathBuf::from("/nonexistent/directory/socket.sock");
    assert!(connect(&invalid_path).await.is_err());
}
