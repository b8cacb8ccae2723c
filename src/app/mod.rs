//! The app context: who is signed in, local prefs, and one operation per screen
//!
//! Nothing here caches sessions. Every screen operation asks the store again,
//! so what a student sees is as fresh as their last refresh and no fresher.

mod views;

pub use views::{CreatedSession, HomeView, LocationGroup, MySessions, Profile, SessionDetails};

use crate::backend::{AttendeeChange, AuthGrant, AuthUser, Backend, SessionQuery, SessionUpdate};
use crate::error::{AppError, AppResult};
use crate::prefs::{self, LocalPrefs};
use crate::session::{
    self, partition_for_user, Location, NewSession, Session, SessionFilter, SessionForm, SessionId,
};
use chrono::{Local, NaiveDate};

/// Default number of sessions on the home screen
pub const DEFAULT_RECENT_LIMIT: usize = 3;

/// Explicit application state, passed to every operation
pub struct App<B> {
    backend: B,
    auth: Option<AuthGrant>,
    prefs: LocalPrefs,
    recent_limit: usize,
}

/// Map a backend failure into the single user-facing remote error
fn remote<T>(result: anyhow::Result<T>) -> AppResult<T> {
    result.map_err(|e| {
        tracing::warn!("Remote operation failed: {:#}", e);
        AppError::remote(e)
    })
}

impl<B: Backend> App<B> {
    pub fn new(backend: B, prefs: LocalPrefs) -> Self {
        Self {
            backend,
            auth: None,
            prefs,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn prefs(&self) -> &LocalPrefs {
        &self.prefs
    }

    /// The signed-in user, if any
    pub fn current_user(&self) -> Option<&AuthUser> {
        self.auth.as_ref().map(|grant| &grant.user)
    }

    fn grant(&self) -> AppResult<&AuthGrant> {
        self.auth.as_ref().ok_or(AppError::NotAuthenticated)
    }

    fn save_prefs(&self) {
        if let Err(e) = self.prefs.save() {
            tracing::warn!("Failed to save local prefs: {:#}", e);
        }
    }

    fn set_auth(&mut self, grant: Option<AuthGrant>) {
        self.prefs
            .set_auth_token(grant.as_ref().map(|g| g.token.clone()));
        self.save_prefs();
        self.auth = grant;
    }

    /// Switch to a fresh grant, revoking the one it replaces
    async fn replace_auth(&mut self, grant: AuthGrant) {
        if let Some(old) = self.auth.take() {
            if let Err(e) = self.backend.sign_out(&old.token).await {
                tracing::warn!("Failed to revoke previous sign-in: {:#}", e);
            }
        }
        self.set_auth(Some(grant));
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Pick up a sign-in saved in local prefs, if it is still valid
    pub async fn restore(&mut self) -> AppResult<Option<&AuthUser>> {
        let Some(token) = self.prefs.auth_token().cloned() else {
            return Ok(None);
        };

        match remote(self.backend.current_user(&token).await)? {
            Some(user) => {
                tracing::debug!("Restored sign-in for {}", user.uid);
                self.auth = Some(AuthGrant { token, user });
            }
            None => {
                tracing::info!("Saved sign-in has expired");
                self.set_auth(None);
            }
        }
        Ok(self.current_user())
    }

    /// Create an account, sign in, and optionally set a display name
    pub async fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> AppResult<AuthUser> {
        let mut grant = remote(self.backend.sign_up(email, password).await)?;

        if let Some(name) = display_name.map(str::trim).filter(|n| !n.is_empty()) {
            grant.user = remote(self.backend.update_display_name(&grant.token, name).await)?;
        }

        tracing::info!("Signed up as {}", grant.user.email);
        let user = grant.user.clone();
        self.replace_auth(grant).await;
        Ok(user)
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> AppResult<AuthUser> {
        let grant = remote(self.backend.sign_in(email, password).await)?;
        tracing::info!("Signed in as {}", grant.user.email);
        let user = grant.user.clone();
        self.replace_auth(grant).await;
        Ok(user)
    }

    /// Forget the local sign-in and invalidate the token remotely
    pub async fn sign_out(&mut self) -> AppResult<()> {
        let Some(grant) = self.auth.take() else {
            return Ok(());
        };
        self.set_auth(None);
        remote(self.backend.sign_out(&grant.token).await)
    }

    /// The one-time welcome message, the first time it is asked for
    pub fn take_welcome(&mut self) -> Option<&'static str> {
        if self.prefs.flag(prefs::WELCOME_SHOWN) {
            return None;
        }
        self.prefs.set_flag(prefs::WELCOME_SHOWN, true);
        self.save_prefs();
        Some(prefs::WELCOME_MESSAGE)
    }

    pub async fn update_display_name(&mut self, name: &str) -> AppResult<AuthUser> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::MissingFields);
        }
        let token = self.grant()?.token.clone();
        let user = remote(self.backend.update_display_name(&token, name).await)?;
        if let Some(grant) = self.auth.as_mut() {
            grant.user = user.clone();
        }
        Ok(user)
    }

    pub async fn profile(&self) -> AppResult<Profile> {
        let user = self.grant()?.user.clone();
        let mine = self.my_sessions().await?;
        Ok(Profile::new(&user, mine.hosting.len(), mine.attending.len()))
    }

    // ------------------------------------------------------------------
    // Browsing
    // ------------------------------------------------------------------

    pub async fn home(&self) -> AppResult<HomeView> {
        let grant = self.grant()?;
        let recent = remote(
            self.backend
                .query(
                    &grant.token,
                    &SessionQuery::all().newest_first().limit(self.recent_limit),
                )
                .await,
        )?;
        let hosting = remote(
            self.backend
                .query(
                    &grant.token,
                    &SessionQuery::all().created_by(grant.user.uid.clone()),
                )
                .await,
        )?;
        Ok(HomeView {
            user: grant.user.clone(),
            recent,
            hosting,
        })
    }

    /// Find Sessions screen, filtered against today's local date
    pub async fn find_sessions(&self, filter: &SessionFilter) -> AppResult<Vec<Session>> {
        self.find_sessions_on(filter, Local::now().date_naive()).await
    }

    /// Find Sessions screen, with "today" given explicitly
    pub async fn find_sessions_on(
        &self,
        filter: &SessionFilter,
        today: NaiveDate,
    ) -> AppResult<Vec<Session>> {
        let grant = self.grant()?;
        let all = remote(
            self.backend
                .query(&grant.token, &SessionQuery::all().newest_first())
                .await,
        )?;
        Ok(filter.apply(all, today))
    }

    pub async fn my_sessions(&self) -> AppResult<MySessions> {
        let grant = self.grant()?;
        let all = remote(self.backend.query(&grant.token, &SessionQuery::all()).await)?;
        let (hosting, attending) = partition_for_user(all, &grant.user.uid);
        Ok(MySessions { hosting, attending })
    }

    /// Fresh copy of one session, with the viewer's flags
    pub async fn session_details(&self, id: &SessionId) -> AppResult<SessionDetails> {
        let grant = self.grant()?;
        let session = self.fetch(id).await?;
        Ok(SessionDetails::new(session, Some(&grant.user.uid)))
    }

    /// Sessions grouped by campus location
    pub async fn campus_map(&self) -> AppResult<Vec<LocationGroup>> {
        let grant = self.grant()?;
        let all = remote(
            self.backend
                .query(&grant.token, &SessionQuery::all().newest_first())
                .await,
        )?;
        Ok(Location::ALL
            .into_iter()
            .map(|location| LocationGroup {
                location,
                sessions: all
                    .iter()
                    .filter(|s| s.location == location)
                    .cloned()
                    .collect(),
            })
            .collect())
    }

    async fn fetch(&self, id: &SessionId) -> AppResult<Session> {
        let grant = self.grant()?;
        remote(self.backend.get(&grant.token, id).await)?
            .ok_or_else(|| AppError::RemoteOperationFailed(format!("Session '{}' not found", id)))
    }

    // ------------------------------------------------------------------
    // Changes
    // ------------------------------------------------------------------

    /// Validate the form, then store it as a session hosted by the current user
    pub async fn create_session(&mut self, form: SessionForm) -> AppResult<CreatedSession> {
        let fields = form.validate()?.into_fields();
        let grant = self.grant()?;

        let new = NewSession {
            fields,
            host_name: grant.user.host_name(),
            created_by: grant.user.uid.clone(),
        };
        let id = remote(self.backend.add(&grant.token, new).await)?;
        tracing::info!("Created session {}", id);

        let count = self.prefs.increment(prefs::SESSIONS_CREATED);
        self.save_prefs();

        Ok(CreatedSession {
            id,
            milestone: prefs::milestone_message(count),
        })
    }

    /// Join the session as seen in `snapshot`
    ///
    /// Capacity is judged on the snapshot, not on the store.
    pub async fn join_session(&mut self, snapshot: &Session) -> AppResult<SessionDetails> {
        let uid = self.current_user().map(|u| u.uid.clone());
        let attendees = session::join(snapshot, uid.as_ref())?;
        let grant = self.grant()?;

        if attendees.len() != snapshot.attendees.len() {
            remote(
                self.backend
                    .update(
                        &grant.token,
                        &snapshot.id,
                        SessionUpdate::attendees(AttendeeChange::Add(grant.user.uid.clone())),
                    )
                    .await,
            )?;
            tracing::info!("Joined session {}", snapshot.id);
        }

        let mut updated = snapshot.clone();
        updated.attendees = attendees;
        Ok(SessionDetails::new(updated, uid.as_ref()))
    }

    /// Leave the session as seen in `snapshot`
    pub async fn leave_session(&mut self, snapshot: &Session) -> AppResult<SessionDetails> {
        let uid = self.current_user().map(|u| u.uid.clone());
        let attendees = session::leave(snapshot, uid.as_ref())?;
        let grant = self.grant()?;

        if attendees.len() != snapshot.attendees.len() {
            remote(
                self.backend
                    .update(
                        &grant.token,
                        &snapshot.id,
                        SessionUpdate::attendees(AttendeeChange::Remove(grant.user.uid.clone())),
                    )
                    .await,
            )?;
            tracing::info!("Left session {}", snapshot.id);
        }

        let mut updated = snapshot.clone();
        updated.attendees = attendees;
        Ok(SessionDetails::new(updated, uid.as_ref()))
    }

    /// Replace a hosted session's descriptive fields
    pub async fn edit_session(&mut self, id: &SessionId, form: SessionForm) -> AppResult<Session> {
        let fields = form.validate()?.into_fields();
        let grant = self.grant()?;

        let mut session = self.fetch(id).await?;
        if !session.is_host(&grant.user.uid) {
            return Err(AppError::NotHost);
        }

        remote(
            self.backend
                .update(&grant.token, id, SessionUpdate::fields(fields.clone()))
                .await,
        )?;
        tracing::info!("Edited session {}", id);

        session.apply_fields(fields);
        Ok(session)
    }

    /// Delete a hosted session
    pub async fn delete_session(&mut self, id: &SessionId) -> AppResult<()> {
        let grant = self.grant()?;

        let session = self.fetch(id).await?;
        if !session.is_host(&grant.user.uid) {
            return Err(AppError::NotHost);
        }

        remote(self.backend.delete(&grant.token, id).await)?;
        tracing::info!("Deleted session {}", id);
        Ok(())
    }
}
