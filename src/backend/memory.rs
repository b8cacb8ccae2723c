//! In-memory identity service and document store
//!
//! Holds users and sessions behind one lock. Optionally mirrors its contents
//! into a JSON snapshot file after every successful change. A change whose
//! snapshot cannot be written is rolled back.

use super::tokens::TokenTable;
use super::{
    AttendeeChange, AuthGrant, AuthToken, AuthUser, IdentityProvider, SessionQuery, SessionStore,
    SessionUpdate, StoreError,
};
use crate::session::{NewSession, Session, SessionId, UserId};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Shortest password the identity service accepts
pub const MIN_PASSWORD_LEN: usize = 6;

/// Access rules applied on top of "any signed-in user may read and write"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// Only the creator may edit descriptive fields or delete, and attendee
    /// changes may only touch the caller's own id
    pub host_only_writes: bool,

    /// Refuse attendee additions past `attendee_limit`
    pub enforce_capacity: bool,
}

/// Stored account
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    uid: UserId,
    email: String,
    display_name: Option<String>,
    salt: String,
    password_digest: String,
    created_at: DateTime<Utc>,
}

impl UserRecord {
    fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// Everything that survives a restart
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    users: Vec<UserRecord>,
    sessions: Vec<Session>,
}

impl StoreSnapshot {
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    users: Vec<UserRecord>,
    /// Insertion order
    sessions: Vec<Session>,
    tokens: TokenTable,
}

impl StoreState {
    fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            users: snapshot.users,
            sessions: snapshot.sessions,
            tokens: TokenTable::default(),
        }
    }

    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            users: self.users.clone(),
            sessions: self.sessions.clone(),
        }
    }

    fn caller(&self, token: &AuthToken) -> Result<UserId, StoreError> {
        self.tokens
            .resolve(token)
            .cloned()
            .ok_or(StoreError::Unauthenticated)
    }

    fn user_by_email(&self, email: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.email == email)
    }

    fn user_mut(&mut self, uid: &UserId) -> Option<&mut UserRecord> {
        self.users.iter_mut().find(|u| &u.uid == uid)
    }

    fn session_index(&self, id: &SessionId) -> Result<usize, StoreError> {
        self.sessions
            .iter()
            .position(|s| &s.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("session '{}'", id)))
    }

    fn sign_up(&mut self, email: &str, password: &str) -> Result<AuthGrant, StoreError> {
        let email = normalize_email(email);
        if !EMAIL_RE.is_match(&email) {
            return Err(StoreError::InvalidArgument(
                "The email address is badly formatted".to_string(),
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(StoreError::InvalidArgument(format!(
                "Password should be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.user_by_email(&email).is_some() {
            return Err(StoreError::AlreadyExists(
                "The email address is already in use".to_string(),
            ));
        }

        let salt = Uuid::new_v4().simple().to_string();
        let record = UserRecord {
            uid: UserId::new(Uuid::new_v4().simple().to_string()),
            password_digest: digest_password(&salt, password),
            salt,
            email,
            display_name: None,
            created_at: Utc::now(),
        };
        let user = record.to_auth_user();
        self.users.push(record);

        let token = self.tokens.issue(user.uid.clone());
        Ok(AuthGrant { token, user })
    }

    fn sign_in(&mut self, email: &str, password: &str) -> Result<AuthGrant, StoreError> {
        let email = normalize_email(email);
        let user = self
            .user_by_email(&email)
            .filter(|u| digest_password(&u.salt, password) == u.password_digest)
            .map(UserRecord::to_auth_user)
            .ok_or_else(|| StoreError::InvalidArgument("Invalid email or password".to_string()))?;

        let token = self.tokens.issue(user.uid.clone());
        Ok(AuthGrant { token, user })
    }

    fn current_user(&self, token: &AuthToken) -> Option<AuthUser> {
        let uid = self.tokens.resolve(token)?;
        self.users
            .iter()
            .find(|u| &u.uid == uid)
            .map(UserRecord::to_auth_user)
    }

    fn update_display_name(
        &mut self,
        token: &AuthToken,
        display_name: &str,
    ) -> Result<AuthUser, StoreError> {
        let uid = self.caller(token)?;
        let record = self
            .user_mut(&uid)
            .ok_or_else(|| StoreError::NotFound(format!("user '{}'", uid)))?;
        record.display_name = Some(display_name.to_string());
        Ok(record.to_auth_user())
    }

    fn add(
        &mut self,
        token: &AuthToken,
        rules: RuleSet,
        new: NewSession,
    ) -> Result<SessionId, StoreError> {
        let caller = self.caller(token)?;
        if rules.host_only_writes && new.created_by != caller {
            return Err(StoreError::PermissionDenied(
                "sessions must be created by the signed-in user".to_string(),
            ));
        }

        let id = SessionId::new(Uuid::new_v4().simple().to_string());
        self.sessions
            .push(Session::from_new(id.clone(), new, Utc::now()));
        Ok(id)
    }

    fn query(&self, token: &AuthToken, query: &SessionQuery) -> Result<Vec<Session>, StoreError> {
        self.caller(token)?;

        let mut found: Vec<(usize, &Session)> = self
            .sessions
            .iter()
            .enumerate()
            .filter(|(_, s)| query.matches(s))
            .collect();

        if query.newest_first {
            // Later inserts win ties on identical timestamps.
            found.sort_by(|(ia, a), (ib, b)| b.created_at.cmp(&a.created_at).then(ib.cmp(ia)));
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(found
            .into_iter()
            .take(limit)
            .map(|(_, s)| s.clone())
            .collect())
    }

    fn update(
        &mut self,
        token: &AuthToken,
        rules: RuleSet,
        id: &SessionId,
        update: SessionUpdate,
    ) -> Result<(), StoreError> {
        let caller = self.caller(token)?;
        let index = self.session_index(id)?;
        let session = &mut self.sessions[index];
        let is_host = session.is_host(&caller);

        if update.fields.is_some() && rules.host_only_writes && !is_host {
            return Err(StoreError::PermissionDenied(
                "only the host can edit this session".to_string(),
            ));
        }

        let attendees = update
            .attendees
            .as_ref()
            .map(|change| apply_attendee_change(&session.attendees, change));

        if let Some(next) = &attendees {
            let own_change_only = only_touches(&session.attendees, next, &caller);
            if rules.host_only_writes && !is_host && !own_change_only {
                return Err(StoreError::PermissionDenied(
                    "attendees may only add or remove themselves".to_string(),
                ));
            }

            let limit = match &update.fields {
                Some(fields) => fields.attendee_limit,
                None => session.attendee_limit,
            };
            let grew = next.len() > session.attendees.len();
            let over = limit.is_some_and(|l| next.len() > l.get() as usize);
            if rules.enforce_capacity && grew && over {
                return Err(StoreError::PermissionDenied(
                    "session has reached its attendee limit".to_string(),
                ));
            }
        }

        if let Some(fields) = update.fields {
            session.apply_fields(fields);
        }
        if let Some(next) = attendees {
            session.attendees = next;
        }
        Ok(())
    }

    fn delete(
        &mut self,
        token: &AuthToken,
        rules: RuleSet,
        id: &SessionId,
    ) -> Result<(), StoreError> {
        let caller = self.caller(token)?;
        let index = self.session_index(id)?;
        if rules.host_only_writes && !self.sessions[index].is_host(&caller) {
            return Err(StoreError::PermissionDenied(
                "only the host can delete this session".to_string(),
            ));
        }
        self.sessions.remove(index);
        Ok(())
    }
}

/// Attendee list after `change`, duplicates dropped, order kept
fn apply_attendee_change(current: &[UserId], change: &AttendeeChange) -> Vec<UserId> {
    match change {
        AttendeeChange::Add(uid) => {
            let mut next = current.to_vec();
            if !next.contains(uid) {
                next.push(uid.clone());
            }
            next
        }
        AttendeeChange::Remove(uid) => current.iter().filter(|u| *u != uid).cloned().collect(),
        AttendeeChange::Replace(list) => {
            let mut seen = BTreeSet::new();
            list.iter()
                .filter(|uid| seen.insert((*uid).clone()))
                .cloned()
                .collect()
        }
    }
}

/// Lists differ in at most `uid`
fn only_touches(before: &[UserId], after: &[UserId], uid: &UserId) -> bool {
    let before: BTreeSet<&UserId> = before.iter().collect();
    let after: BTreeSet<&UserId> = after.iter().collect();
    before.symmetric_difference(&after).all(|changed| *changed == uid)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap());

fn digest_password(salt: &str, password: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// In-memory backend, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<RwLock<StoreState>>,
    rules: RuleSet,
    snapshot_path: Option<PathBuf>,
}

impl MemoryBackend {
    /// Empty store, no rules, nothing persisted
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Open a store mirrored to `path`, loading it if the file exists
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = if tokio::fs::try_exists(&path).await? {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read store snapshot {:?}", path))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Corrupt store snapshot {:?}", path))?
        } else {
            StoreSnapshot::default()
        };

        tracing::info!(
            "Loaded store from {:?}: {} users, {} sessions",
            path,
            snapshot.user_count(),
            snapshot.session_count()
        );

        Ok(Self {
            state: Arc::new(RwLock::new(StoreState::from_snapshot(snapshot))),
            rules: RuleSet::default(),
            snapshot_path: Some(path),
        })
    }

    pub fn rules(&self) -> RuleSet {
        self.rules
    }

    /// Copy of the persistent contents
    pub async fn snapshot(&self) -> StoreSnapshot {
        self.state.read().await.snapshot()
    }

    /// Number of signed-in tokens
    pub async fn active_tokens(&self) -> usize {
        self.state.read().await.tokens.len()
    }

    /// Write the snapshot file, if this store has one
    async fn persist(&self, state: &StoreState) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&state.snapshot())?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {:?}", tmp))?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Apply `change` to a copy of the state and keep it only once persisted
    async fn commit<T>(
        &self,
        change: impl FnOnce(&mut StoreState) -> Result<T, StoreError>,
    ) -> Result<T> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let out = change(&mut next)?;
        self.persist(&next).await?;
        *state = next;
        Ok(out)
    }
}

#[async_trait]
impl IdentityProvider for MemoryBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthGrant> {
        let grant = self.commit(|state| state.sign_up(email, password)).await?;
        tracing::info!("New account {} ({})", grant.user.uid, grant.user.email);
        Ok(grant)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthGrant> {
        let mut state = self.state.write().await;
        let grant = state.sign_in(email, password)?;
        tracing::debug!("Signed in {} ({} live tokens)", grant.user.uid, state.tokens.len());
        Ok(grant)
    }

    async fn sign_out(&self, token: &AuthToken) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.tokens.revoke(token) {
            tracing::debug!("Sign-out for unknown token {}", token);
        }
        Ok(())
    }

    async fn current_user(&self, token: &AuthToken) -> Result<Option<AuthUser>> {
        Ok(self.state.read().await.current_user(token))
    }

    async fn update_display_name(
        &self,
        token: &AuthToken,
        display_name: &str,
    ) -> Result<AuthUser> {
        self.commit(|state| state.update_display_name(token, display_name))
            .await
    }
}

#[async_trait]
impl SessionStore for MemoryBackend {
    async fn add(&self, token: &AuthToken, session: NewSession) -> Result<SessionId> {
        let id = self
            .commit(|state| state.add(token, self.rules, session))
            .await?;
        tracing::info!("Session {} created", id);
        Ok(id)
    }

    async fn get(&self, token: &AuthToken, id: &SessionId) -> Result<Option<Session>> {
        let state = self.state.read().await;
        state.caller(token)?;
        Ok(state.sessions.iter().find(|s| &s.id == id).cloned())
    }

    async fn query(&self, token: &AuthToken, query: &SessionQuery) -> Result<Vec<Session>> {
        Ok(self.state.read().await.query(token, query)?)
    }

    async fn update(
        &self,
        token: &AuthToken,
        id: &SessionId,
        update: SessionUpdate,
    ) -> Result<()> {
        self.commit(|state| state.update(token, self.rules, id, update))
            .await?;
        tracing::debug!("Session {} updated", id);
        Ok(())
    }

    async fn delete(&self, token: &AuthToken, id: &SessionId) -> Result<()> {
        self.commit(|state| state.delete(token, self.rules, id))
            .await?;
        tracing::info!("Session {} deleted", id);
        Ok(())
    }
}
