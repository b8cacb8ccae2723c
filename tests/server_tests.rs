//! Integration tests for the server module

use std::path::Path;
use std::time::Duration;
use studygroup::app::App;
use studygroup::backend::{
    AttendeeChange, IdentityProvider, MemoryBackend, RemoteBackend, RuleSet, SessionQuery,
    SessionStore, SessionUpdate, StoreError,
};
use studygroup::error::AppError;
use studygroup::prefs::LocalPrefs;
use studygroup::protocol::{
    deserialize, serialize, ClientMessage, ErrorKind, ServerMessage, PROTOCOL_VERSION,
};
use studygroup::server::connection::{read_message, write_message};
use studygroup::server::ServerListener;
use studygroup::session::{Location, SessionForm};
use tempfile::tempdir;
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

struct TestServer {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    async fn start(socket_path: &Path, backend: MemoryBackend) -> Self {
        let server = ServerListener::new("test".to_string(), socket_path.to_path_buf(), backend);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        // Start server in background
        let handle = tokio::spawn(async move { server.run(shutdown_rx).await });

        // Wait for server to start
        for _ in 0..50 {
            if socket_path.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        Self {
            shutdown_tx,
            handle,
        }
    }

    async fn stop(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = timeout(Duration::from_secs(2), self.handle).await;
    }
}

async fn recv(stream: &mut UnixStream) -> ServerMessage {
    let bytes = timeout(Duration::from_secs(2), read_message(stream))
        .await
        .expect("Should receive message")
        .expect("Read should succeed")
        .expect("Message should not be empty");
    deserialize(&bytes).expect("Should deserialize")
}

async fn send(stream: &mut UnixStream, msg: &ClientMessage) {
    write_message(stream, &serialize(msg).unwrap()).await.unwrap();
}

fn form(subject: &str, limit: u32) -> SessionForm {
    SessionForm {
        subject: subject.to_string(),
        subject_name: "Computer Networks".to_string(),
        location: Some(Location::BorchardtLibrary),
        date: "03/11/2026".to_string(),
        time: "11:00 AM".to_string(),
        description: String::new(),
        attendee_limit: std::num::NonZeroU32::new(limit),
    }
}

#[tokio::test]
async fn test_server_sends_welcome() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("test.sock");
    let server = TestServer::start(&socket_path, MemoryBackend::new()).await;

    let mut stream = UnixStream::connect(&socket_path).await.unwrap();

    match recv(&mut stream).await {
        ServerMessage::Welcome {
            protocol_version, ..
        } => {
            assert_eq!(protocol_version, PROTOCOL_VERSION);
        }
        other => panic!("Expected Welcome message, got {:?}", other),
    }

    // Clean up
    drop(stream);
    server.stop().await;
}

#[tokio::test]
async fn test_server_handles_hello() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("test_hello.sock");
    let server = TestServer::start(&socket_path, MemoryBackend::new()).await;

    let mut stream = UnixStream::connect(&socket_path).await.unwrap();
    let _ = recv(&mut stream).await;

    send(
        &mut stream,
        &ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
        },
    )
    .await;
    match recv(&mut stream).await {
        ServerMessage::Ack { for_command } => assert_eq!(for_command, "Hello"),
        other => panic!("Expected Ack message, got {:?}", other),
    }

    send(
        &mut stream,
        &ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION + 1,
        },
    )
    .await;
    match recv(&mut stream).await {
        ServerMessage::Error { kind, .. } => assert_eq!(kind, ErrorKind::InvalidArgument),
        other => panic!("Expected Error message, got {:?}", other),
    }

    drop(stream);
    server.stop().await;
}

#[tokio::test]
async fn test_garbage_gets_error_reply_and_connection_survives() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("garbage.sock");
    let server = TestServer::start(&socket_path, MemoryBackend::new()).await;

    let mut stream = UnixStream::connect(&socket_path).await.unwrap();
    let _ = recv(&mut stream).await;

    write_message(&mut stream, b"\xc1 not msgpack").await.unwrap();
    match recv(&mut stream).await {
        ServerMessage::Error { kind, .. } => assert_eq!(kind, ErrorKind::InvalidArgument),
        other => panic!("Expected Error message, got {:?}", other),
    }

    send(
        &mut stream,
        &ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
        },
    )
    .await;
    assert!(matches!(recv(&mut stream).await, ServerMessage::Ack { .. }));

    drop(stream);
    server.stop().await;
}

#[tokio::test]
async fn test_remote_backend_round_trip() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("remote.sock");
    let server = TestServer::start(&socket_path, MemoryBackend::new()).await;

    let remote = RemoteBackend::connect(&socket_path).await.unwrap();
    remote.ping().await.unwrap();

    let ada = remote.sign_up("ada@uni.edu", "secret1").await.unwrap();
    let err = remote.sign_up("ada@uni.edu", "secret1").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::AlreadyExists(_))
    ));

    let mut app = App::new(remote, LocalPrefs::in_memory());
    app.sign_in("ada@uni.edu", "secret1").await.unwrap();
    let created = app.create_session(form("CSE2NET", 0)).await.unwrap();

    let details = app.session_details(&created.id).await.unwrap();
    assert!(details.is_host);
    assert_eq!(details.session.created_by, ada.user.uid);
    assert_eq!(details.session.attendee_limit, None);

    let found = app
        .backend()
        .query(&ada.token, &SessionQuery::all().created_by(ada.user.uid.clone()))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);

    app.delete_session(&created.id).await.unwrap();
    assert!(app.my_sessions().await.unwrap().hosting.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_server_enforces_capacity_when_configured() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("capacity.sock");
    let backend = MemoryBackend::new().with_rules(RuleSet {
        enforce_capacity: true,
        host_only_writes: true,
    });
    let server = TestServer::start(&socket_path, backend).await;

    let mut host = App::new(
        RemoteBackend::connect(&socket_path).await.unwrap(),
        LocalPrefs::in_memory(),
    );
    host.sign_up("host@uni.edu", "secret1", Some("Host")).await.unwrap();
    let id = host.create_session(form("CSE2NET", 1)).await.unwrap().id;

    let mut a = App::new(
        RemoteBackend::connect(&socket_path).await.unwrap(),
        LocalPrefs::in_memory(),
    );
    a.sign_up("a@uni.edu", "secret1", None).await.unwrap();
    let mut b = App::new(
        RemoteBackend::connect(&socket_path).await.unwrap(),
        LocalPrefs::in_memory(),
    );
    b.sign_up("b@uni.edu", "secret1", None).await.unwrap();

    // Both read the session while the only spot is open.
    let seen_by_a = a.session_details(&id).await.unwrap().session;
    let seen_by_b = b.session_details(&id).await.unwrap().session;

    a.join_session(&seen_by_a).await.unwrap();
    let err = b.join_session(&seen_by_b).await.unwrap_err();
    assert!(matches!(err, AppError::RemoteOperationFailed(_)));

    let stored = host.session_details(&id).await.unwrap().session;
    assert_eq!(stored.attendees.len(), 1);

    // A client that goes around the app is still stopped by the store.
    let b_token = b.backend().sign_in("b@uni.edu", "secret1").await.unwrap().token;
    let sneaky = b
        .backend()
        .update(
            &b_token,
            &id,
            SessionUpdate::attendees(AttendeeChange::Replace(Vec::new())),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        sneaky.downcast_ref::<StoreError>(),
        Some(StoreError::PermissionDenied(_))
    ));

    server.stop().await;
}

#[tokio::test]
async fn test_socket_removed_on_shutdown() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("nested").join("gone.sock");
    let server = TestServer::start(&socket_path, MemoryBackend::new()).await;

    assert!(socket_path.exists());
    server.stop().await;
    assert!(!socket_path.exists());
}

#[tokio::test]
async fn test_second_server_on_same_socket_refuses() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("busy.sock");
    let server = TestServer::start(&socket_path, MemoryBackend::new()).await;

    let second = ServerListener::new("busy".to_string(), socket_path.clone(), MemoryBackend::new());
    let (_tx, rx) = mpsc::channel::<()>(1);
    assert!(second.run(rx).await.is_err());

    server.stop().await;
}
