//! The identity service and document store the app talks to
//!
//! Both are black boxes behind async traits. [`MemoryBackend`] is the store
//! itself (the server hosts one), [`RemoteBackend`] reaches a server over its
//! Unix socket. The app only sees the traits.

mod memory;
mod remote;
mod tokens;

pub use memory::{MemoryBackend, RuleSet, StoreSnapshot};
pub use remote::RemoteBackend;

use crate::protocol::ErrorKind;
use crate::session::{NewSession, Session, SessionFields, SessionId, UserId};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Bearer token handed out on sign-in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Prefix only.
        let shown: String = self.0.chars().take(8).collect();
        write!(f, "{}…", shown)
    }
}

/// A signed-in user as the identity service reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: UserId,
    pub email: String,
    pub display_name: Option<String>,
}

impl AuthUser {
    /// Name recorded as host when this user creates a session
    pub fn host_name(&self) -> String {
        match &self.display_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ if !self.email.is_empty() => self.email.clone(),
            _ => "Anonymous".to_string(),
        }
    }

    /// Name shown on the profile screen
    pub fn profile_name(&self) -> String {
        match &self.display_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => match self.email.split('@').next() {
                Some(local) if !local.is_empty() => local.to_string(),
                _ => "Anonymous User".to_string(),
            },
        }
    }
}

/// Result of a successful sign-up or sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthGrant {
    pub token: AuthToken,
    pub user: AuthUser,
}

/// Which sessions to return and how
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionQuery {
    /// Only sessions created by this user
    pub created_by: Option<UserId>,

    /// Only sessions this user has joined
    pub attendee: Option<UserId>,

    /// Order by creation time, newest first; otherwise store order
    pub newest_first: bool,

    pub limit: Option<usize>,
}

impl SessionQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn created_by(mut self, uid: UserId) -> Self {
        self.created_by = Some(uid);
        self
    }

    pub fn attended_by(mut self, uid: UserId) -> Self {
        self.attendee = Some(uid);
        self
    }

    pub fn newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check a single record against the filters (ordering and limit aside)
    pub fn matches(&self, session: &Session) -> bool {
        self.created_by
            .as_ref()
            .map_or(true, |uid| &session.created_by == uid)
            && self
                .attendee
                .as_ref()
                .map_or(true, |uid| session.attendees.contains(uid))
    }
}

/// Change to a session's attendee list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendeeChange {
    /// Add one id unless it is already there
    Add(UserId),
    /// Remove one id if present
    Remove(UserId),
    /// Overwrite the whole list
    Replace(Vec<UserId>),
}

/// Fields to change on an existing session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub fields: Option<SessionFields>,
    pub attendees: Option<AttendeeChange>,
}

impl SessionUpdate {
    pub fn fields(fields: SessionFields) -> Self {
        Self {
            fields: Some(fields),
            attendees: None,
        }
    }

    pub fn attendees(change: AttendeeChange) -> Self {
        Self {
            fields: None,
            attendees: Some(change),
        }
    }
}

/// Failures reported by the identity service or the document store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Not signed in or sign-in expired")]
    Unauthenticated,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Wire classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Unauthenticated => ErrorKind::Unauthenticated,
            StoreError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            StoreError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            StoreError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Detail text without the kind prefix
    pub fn detail(&self) -> String {
        match self {
            StoreError::Unauthenticated => String::new(),
            StoreError::PermissionDenied(m)
            | StoreError::NotFound(m)
            | StoreError::InvalidArgument(m)
            | StoreError::AlreadyExists(m)
            | StoreError::Internal(m) => m.clone(),
        }
    }

    /// Rebuild an error received over the wire
    pub fn from_wire(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::Unauthenticated => StoreError::Unauthenticated,
            ErrorKind::PermissionDenied => StoreError::PermissionDenied(message),
            ErrorKind::NotFound => StoreError::NotFound(message),
            ErrorKind::InvalidArgument => StoreError::InvalidArgument(message),
            ErrorKind::AlreadyExists => StoreError::AlreadyExists(message),
            ErrorKind::Internal => StoreError::Internal(message),
        }
    }
}

/// Account management
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account and sign it in
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthGrant>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthGrant>;

    /// Invalidate `token`; unknown tokens are ignored
    async fn sign_out(&self, token: &AuthToken) -> Result<()>;

    /// The user `token` belongs to, if it is still valid
    async fn current_user(&self, token: &AuthToken) -> Result<Option<AuthUser>>;

    async fn update_display_name(&self, token: &AuthToken, display_name: &str)
        -> Result<AuthUser>;
}

/// CRUD on the `sessions` collection; every call needs a valid token
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a new session and return its id
    async fn add(&self, token: &AuthToken, session: NewSession) -> Result<SessionId>;

    async fn get(&self, token: &AuthToken, id: &SessionId) -> Result<Option<Session>>;

    async fn query(&self, token: &AuthToken, query: &SessionQuery) -> Result<Vec<Session>>;

    async fn update(&self, token: &AuthToken, id: &SessionId, update: SessionUpdate)
        -> Result<()>;

    async fn delete(&self, token: &AuthToken, id: &SessionId) -> Result<()>;
}

/// Everything the app needs from the outside world
pub trait Backend: IdentityProvider + SessionStore {}

impl<T: IdentityProvider + SessionStore> Backend for T {}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str, name: Option<&str>) -> AuthUser {
        AuthUser {
            uid: UserId::new("u1"),
            email: email.to_string(),
            display_name: name.map(String::from),
        }
    }

    #[test]
    fn test_host_name_fallbacks() {
        assert_eq!(user("a@b.edu", Some("Ada")).host_name(), "Ada");
        assert_eq!(user("a@b.edu", None).host_name(), "a@b.edu");
        assert_eq!(user("", Some("")).host_name(), "Anonymous");
    }

    #[test]
    fn test_profile_name_fallbacks() {
        assert_eq!(user("ada@uni.edu", Some("Ada L")).profile_name(), "Ada L");
        assert_eq!(user("ada@uni.edu", None).profile_name(), "ada");
        assert_eq!(user("", None).profile_name(), "Anonymous User");
    }

    #[test]
    fn test_token_display_is_truncated() {
        let token = AuthToken::new("0123456789abcdef");
        assert_eq!(token.to_string(), "01234567…");
    }

    #[test]
    fn test_store_error_wire_roundtrip() {
        let err = StoreError::NotFound("session 'x'".to_string());
        let back = StoreError::from_wire(err.kind(), err.detail());
        assert_eq!(err, back);
    }
}
