//! Message types for the studygroup protocol

use crate::backend::{AuthGrant, AuthToken, AuthUser, SessionQuery, SessionUpdate};
use crate::session::{NewSession, Session, SessionId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Requests sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Handshake with protocol version
    Hello { protocol_version: u32 },

    /// Create an account
    SignUp { email: String, password: String },

    /// Sign in with email and password
    SignIn { email: String, password: String },

    /// Invalidate a token
    SignOut { token: AuthToken },

    /// Look up the user behind a token
    CurrentUser { token: AuthToken },

    /// Change the signed-in user's display name
    UpdateDisplayName {
        token: AuthToken,
        display_name: String,
    },

    /// Add a session record
    AddSession {
        token: AuthToken,
        session: NewSession,
    },

    /// Read one session record
    GetSession { token: AuthToken, id: SessionId },

    /// List session records
    QuerySessions {
        token: AuthToken,
        query: SessionQuery,
    },

    /// Change fields of a session record
    UpdateSession {
        token: AuthToken,
        id: SessionId,
        update: SessionUpdate,
    },

    /// Remove a session record
    DeleteSession { token: AuthToken, id: SessionId },
}

impl ClientMessage {
    /// Name used in acknowledgements and logs
    pub fn name(&self) -> &'static str {
        match self {
            ClientMessage::Hello { .. } => "Hello",
            ClientMessage::SignUp { .. } => "SignUp",
            ClientMessage::SignIn { .. } => "SignIn",
            ClientMessage::SignOut { .. } => "SignOut",
            ClientMessage::CurrentUser { .. } => "CurrentUser",
            ClientMessage::UpdateDisplayName { .. } => "UpdateDisplayName",
            ClientMessage::AddSession { .. } => "AddSession",
            ClientMessage::GetSession { .. } => "GetSession",
            ClientMessage::QuerySessions { .. } => "QuerySessions",
            ClientMessage::UpdateSession { .. } => "UpdateSession",
            ClientMessage::DeleteSession { .. } => "DeleteSession",
        }
    }
}

/// Responses sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Handshake, sent once as soon as a client connects
    Welcome {
        server_id: Uuid,
        protocol_version: u32,
    },

    /// Successful sign-up or sign-in
    Granted(AuthGrant),

    /// Current user lookup, or the user after a profile change
    User { user: Option<AuthUser> },

    /// Id of a newly added session
    SessionCreated { id: SessionId },

    /// Single session read
    Session { session: Option<Session> },

    /// Query result
    Sessions { sessions: Vec<Session> },

    /// Error response
    Error { kind: ErrorKind, message: String },

    /// Acknowledgment (for commands with no payload)
    Ack { for_command: String },
}

/// Classification of a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Unauthenticated,
    PermissionDenied,
    NotFound,
    InvalidArgument,
    AlreadyExists,
    Internal,
}
