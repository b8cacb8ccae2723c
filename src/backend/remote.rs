//! Backend reached over the server's Unix socket

use super::{
    AuthGrant, AuthToken, AuthUser, IdentityProvider, SessionQuery, SessionStore, SessionUpdate,
    StoreError,
};
use crate::protocol::{
    check_version_compatibility, deserialize, serialize, ClientMessage, ProtocolError,
    ServerMessage, PROTOCOL_VERSION,
};
use crate::server::connection::{read_message, write_message};
use crate::session::{NewSession, Session, SessionId};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::net::UnixStream;
use tokio::sync::Mutex;

/// One connection to a running `studygroup-server`
///
/// Requests are single-flight: the connection is held for the whole
/// request/response exchange.
pub struct RemoteBackend {
    stream: Mutex<UnixStream>,
}

impl RemoteBackend {
    /// Connect and complete the handshake
    pub async fn connect(socket_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket_path)
            .await
            .with_context(|| format!("Failed to connect to {:?}", socket_path))?;
        Self::handshake(stream).await
    }

    /// Read the server's welcome and check the protocol version
    pub async fn handshake(mut stream: UnixStream) -> Result<Self> {
        let bytes = read_message(&mut stream)
            .await?
            .ok_or_else(|| anyhow!("Server closed the connection before saying hello"))?;

        match deserialize::<ServerMessage>(&bytes)? {
            ServerMessage::Welcome {
                server_id,
                protocol_version,
            } => {
                check_version_compatibility(PROTOCOL_VERSION, protocol_version)?;
                tracing::debug!("Connected to server {}", server_id);
                Ok(Self {
                    stream: Mutex::new(stream),
                })
            }
            other => Err(unexpected("handshake", &other)),
        }
    }

    /// Send one request and wait for its reply
    ///
    /// Error replies come back as `Err` wrapping a [`StoreError`].
    async fn request(&self, msg: ClientMessage) -> Result<ServerMessage> {
        let payload = serialize(&msg)?;
        let mut stream = self.stream.lock().await;

        write_message(&mut *stream, &payload).await?;
        let bytes = read_message(&mut *stream)
            .await?
            .ok_or_else(|| anyhow!("Server closed the connection during {}", msg.name()))?;

        match deserialize::<ServerMessage>(&bytes)? {
            ServerMessage::Error { kind, message } => {
                Err(StoreError::from_wire(kind, message).into())
            }
            reply => Ok(reply),
        }
    }

    /// Request that only needs an acknowledgement
    async fn request_ack(&self, msg: ClientMessage) -> Result<()> {
        let name = msg.name();
        match self.request(msg).await? {
            ServerMessage::Ack { .. } => Ok(()),
            other => Err(unexpected(name, &other)),
        }
    }

    async fn request_grant(&self, msg: ClientMessage) -> Result<AuthGrant> {
        let name = msg.name();
        match self.request(msg).await? {
            ServerMessage::Granted(grant) => Ok(grant),
            other => Err(unexpected(name, &other)),
        }
    }

    /// Confirm the server speaks our protocol version
    pub async fn ping(&self) -> Result<()> {
        self.request_ack(ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
        })
        .await
    }
}

fn unexpected(request: &str, response: &ServerMessage) -> anyhow::Error {
    anyhow!(ProtocolError::UnexpectedResponse {
        request: request.to_string(),
        response: format!("{:?}", response),
    })
}

#[async_trait]
impl IdentityProvider for RemoteBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthGrant> {
        self.request_grant(ClientMessage::SignUp {
            email: email.to_string(),
            password: password.to_string(),
        })
        .await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthGrant> {
        self.request_grant(ClientMessage::SignIn {
            email: email.to_string(),
            password: password.to_string(),
        })
        .await
    }

    async fn sign_out(&self, token: &AuthToken) -> Result<()> {
        self.request_ack(ClientMessage::SignOut {
            token: token.clone(),
        })
        .await
    }

    async fn current_user(&self, token: &AuthToken) -> Result<Option<AuthUser>> {
        match self
            .request(ClientMessage::CurrentUser {
                token: token.clone(),
            })
            .await?
        {
            ServerMessage::User { user } => Ok(user),
            other => Err(unexpected("CurrentUser", &other)),
        }
    }

    async fn update_display_name(
        &self,
        token: &AuthToken,
        display_name: &str,
    ) -> Result<AuthUser> {
        match self
            .request(ClientMessage::UpdateDisplayName {
                token: token.clone(),
                display_name: display_name.to_string(),
            })
            .await?
        {
            ServerMessage::User { user: Some(user) } => Ok(user),
            other => Err(unexpected("UpdateDisplayName", &other)),
        }
    }
}

#[async_trait]
impl SessionStore for RemoteBackend {
    async fn add(&self, token: &AuthToken, session: NewSession) -> Result<SessionId> {
        match self
            .request(ClientMessage::AddSession {
                token: token.clone(),
                session,
            })
            .await?
        {
            ServerMessage::SessionCreated { id } => Ok(id),
            other => Err(unexpected("AddSession", &other)),
        }
    }

    async fn get(&self, token: &AuthToken, id: &SessionId) -> Result<Option<Session>> {
        match self
            .request(ClientMessage::GetSession {
                token: token.clone(),
                id: id.clone(),
            })
            .await?
        {
            ServerMessage::Session { session } => Ok(session),
            other => Err(unexpected("GetSession", &other)),
        }
    }

    async fn query(&self, token: &AuthToken, query: &SessionQuery) -> Result<Vec<Session>> {
        match self
            .request(ClientMessage::QuerySessions {
                token: token.clone(),
                query: query.clone(),
            })
            .await?
        {
            ServerMessage::Sessions { sessions } => Ok(sessions),
            other => Err(unexpected("QuerySessions", &other)),
        }
    }

    async fn update(
        &self,
        token: &AuthToken,
        id: &SessionId,
        update: SessionUpdate,
    ) -> Result<()> {
        self.request_ack(ClientMessage::UpdateSession {
            token: token.clone(),
            id: id.clone(),
            update,
        })
        .await
    }

    async fn delete(&self, token: &AuthToken, id: &SessionId) -> Result<()> {
        self.request_ack(ClientMessage::DeleteSession {
            token: token.clone(),
            id: id.clone(),
        })
        .await
    }
}
