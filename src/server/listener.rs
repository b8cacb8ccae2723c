//! Unix socket listener and server main loop

use super::connection::{
    client_writer_task, create_error_message, create_welcome_message, error_reply,
    parse_client_message, read_message, ClientConnection,
};
use crate::backend::{IdentityProvider, MemoryBackend, SessionStore};
use crate::protocol::{ClientMessage, ErrorKind, ServerMessage, PROTOCOL_VERSION};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Server state shared across connections
struct ServerState {
    server_id: Uuid,

    /// Connected clients and when they connected
    clients: HashMap<Uuid, DateTime<Utc>>,
}

/// Unix socket server hosting the identity service and session store
pub struct ServerListener {
    socket_path: PathBuf,
    name: String,
    backend: MemoryBackend,
}

impl ServerListener {
    pub fn new(name: String, socket_path: PathBuf, backend: MemoryBackend) -> Self {
        Self {
            socket_path,
            name,
            backend,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Serve clients until `shutdown_rx` fires
    pub async fn run(&self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if self.socket_path.exists() {
            match UnixStream::connect(&self.socket_path).await {
                Ok(_) => {
                    return Err(anyhow!("Server '{}' is already running", self.name));
                }
                Err(_) => {
                    tracing::info!("Removing stale socket: {:?}", self.socket_path);
                    std::fs::remove_file(&self.socket_path)?;
                }
            }
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!(
            "Server '{}' listening on {:?} (rules: {:?})",
            self.name,
            self.socket_path,
            self.backend.rules()
        );

        let state = Arc::new(RwLock::new(ServerState {
            server_id: Uuid::new_v4(),
            clients: HashMap::new(),
        }));

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, _addr)) => {
                            let state = Arc::clone(&state);
                            let backend = self.backend.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_client(stream, state, backend).await {
                                    tracing::error!("Client error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }

        self.cleanup(&state).await;

        Ok(())
    }

    async fn cleanup(&self, state: &Arc<RwLock<ServerState>>) {
        let connected = state.read().await.clients.len();
        tracing::info!(
            "Cleaning up server resources ({} clients still connected)",
            connected
        );

        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                tracing::error!("Failed to remove socket file: {}", e);
            }
        }
    }
}

/// Serve one client: welcome, then strictly one reply per request
async fn handle_client(
    stream: UnixStream,
    state: Arc<RwLock<ServerState>>,
    backend: MemoryBackend,
) -> Result<()> {
    let (mut reader, writer) = stream.into_split();

    let (tx, rx) = mpsc::channel::<ServerMessage>(64);
    let mut client = ClientConnection::new(tx);
    let client_id = client.id();

    let server_id = {
        let mut state = state.write().await;
        state.clients.insert(client_id, Utc::now());
        tracing::info!(
            "Client connected: {} ({} connected)",
            client_id,
            state.clients.len()
        );
        state.server_id
    };

    let writer_handle = tokio::spawn(client_writer_task(writer, rx));

    client.send(create_welcome_message(server_id)).await?;

    loop {
        match read_message(&mut reader).await {
            Ok(Some(bytes)) => {
                let reply = match parse_client_message(&bytes) {
                    Ok(msg) => process_message(msg, &backend).await,
                    Err(e) => {
                        tracing::error!("Failed to parse message: {}", e);
                        create_error_message(
                            ErrorKind::InvalidArgument,
                            format!("Invalid message: {}", e),
                        )
                    }
                };
                if let Err(e) = client.send(reply).await {
                    tracing::error!("Failed to send response: {}", e);
                    break;
                }
            }
            Ok(None) => {
                tracing::info!(
                    "Client disconnected: {} after {} replies",
                    client_id,
                    client.handled()
                );
                break;
            }
            Err(e) => {
                tracing::error!("Error reading from client: {}", e);
                break;
            }
        }
    }

    state.write().await.clients.remove(&client_id);

    // Closing the queue lets the writer flush what is left and exit.
    drop(client);
    let _ = writer_handle.await;

    tracing::info!("Client handler finished: {}", client_id);

    Ok(())
}

/// Run one request against the backend and build its reply
async fn process_message(msg: ClientMessage, backend: &MemoryBackend) -> ServerMessage {
    let command = msg.name();
    tracing::debug!("Handling {}", command);

    let result = match msg {
        ClientMessage::Hello { protocol_version } => {
            if protocol_version != PROTOCOL_VERSION {
                return create_error_message(
                    ErrorKind::InvalidArgument,
                    format!(
                        "Protocol version mismatch: expected {}, got {}",
                        PROTOCOL_VERSION, protocol_version
                    ),
                );
            }
            Ok(ack(command))
        }

        ClientMessage::SignUp { email, password } => backend
            .sign_up(&email, &password)
            .await
            .map(ServerMessage::Granted),

        ClientMessage::SignIn { email, password } => backend
            .sign_in(&email, &password)
            .await
            .map(ServerMessage::Granted),

        ClientMessage::SignOut { token } => backend.sign_out(&token).await.map(|_| ack(command)),

        ClientMessage::CurrentUser { token } => backend
            .current_user(&token)
            .await
            .map(|user| ServerMessage::User { user }),

        ClientMessage::UpdateDisplayName {
            token,
            display_name,
        } => backend
            .update_display_name(&token, &display_name)
            .await
            .map(|user| ServerMessage::User { user: Some(user) }),

        ClientMessage::AddSession { token, session } => backend
            .add(&token, session)
            .await
            .map(|id| ServerMessage::SessionCreated { id }),

        ClientMessage::GetSession { token, id } => backend
            .get(&token, &id)
            .await
            .map(|session| ServerMessage::Session { session }),

        ClientMessage::QuerySessions { token, query } => backend
            .query(&token, &query)
            .await
            .map(|sessions| ServerMessage::Sessions { sessions }),

        ClientMessage::UpdateSession { token, id, update } => backend
            .update(&token, &id, update)
            .await
            .map(|_| ack(command)),

        ClientMessage::DeleteSession { token, id } => {
            backend.delete(&token, &id).await.map(|_| ack(command))
        }
    };

    result.unwrap_or_else(|e| {
        tracing::warn!("{} failed: {}", command, e);
        error_reply(&e)
    })
}

fn ack(command: &str) -> ServerMessage {
    ServerMessage::Ack {
        for_command: command.to_string(),
    }
}
