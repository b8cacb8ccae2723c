//! What each screen shows after a refresh

use crate::backend::AuthUser;
use crate::session::{self, Location, Session, SessionId, UserId};

/// Home screen: newest sessions and the ones I host
#[derive(Debug, Clone)]
pub struct HomeView {
    pub user: AuthUser,
    pub recent: Vec<Session>,
    pub hosting: Vec<Session>,
}

/// Profile screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub initials: String,
    pub hosting: usize,
    pub attending: usize,
}

impl Profile {
    pub fn new(user: &AuthUser, hosting: usize, attending: usize) -> Self {
        let name = user.profile_name();
        Self {
            initials: session::initials(Some(&name)),
            name,
            email: user.email.clone(),
            hosting,
            attending,
        }
    }
}

/// My Sessions screen, split into its two tabs
#[derive(Debug, Clone, Default)]
pub struct MySessions {
    pub hosting: Vec<Session>,
    pub attending: Vec<Session>,
}

/// Session details screen with the flags that drive its buttons
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDetails {
    pub session: Session,
    pub has_joined: bool,
    pub is_full: bool,
    pub is_host: bool,
}

impl SessionDetails {
    pub fn new(session: Session, viewer: Option<&UserId>) -> Self {
        let has_joined = viewer.is_some_and(|uid| session::has_joined(&session, uid));
        let is_host = viewer.is_some_and(|uid| session.is_host(uid));
        Self {
            is_full: session::is_full(&session),
            has_joined,
            is_host,
            session,
        }
    }

    /// Whether the join/leave button is usable
    ///
    /// A full session still lets its members leave.
    pub fn can_toggle_membership(&self) -> bool {
        self.has_joined || !self.is_full
    }
}

/// Result of creating a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSession {
    pub id: SessionId,
    /// Set when this device just reached a hosting milestone
    pub milestone: Option<&'static str>,
}

/// Sessions held at one campus location
#[derive(Debug, Clone)]
pub struct LocationGroup {
    pub location: Location,
    pub sessions: Vec<Session>,
}
