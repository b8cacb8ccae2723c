//! Study sessions - records, campus locations, membership and form handling

mod filter;
mod form;
mod location;
mod membership;

pub use filter::{display_date, partition_for_user, DateFilter, SessionFilter};
pub use form::{format_date_input, format_time_input, SessionForm, ValidForm};
pub use location::{Location, ParseLocationError};
pub use membership::{has_joined, is_full, join, leave, MembershipError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

/// Opaque identifier of a user, assigned by the identity service
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque identifier of a session record, assigned by the document store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Descriptive fields a host fills in when creating or editing a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFields {
    /// Course code, e.g. `CSE3MAD`
    pub subject: String,

    /// Human-readable course name
    pub subject_name: String,

    pub location: Location,

    /// Display string, conventionally `DD/MM/YYYY`
    pub date: String,

    /// Display string, conventionally `HH:MM AM`
    pub time: String,

    pub description: String,

    /// Capacity; `None` means unlimited
    pub attendee_limit: Option<NonZeroU32>,
}

/// A new session as submitted to the document store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSession {
    pub fields: SessionFields,

    /// Host display name captured at creation time
    pub host_name: String,

    /// Host user id captured at creation time
    pub created_by: UserId,
}

/// A stored study session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub subject: String,
    pub subject_name: String,
    pub location: Location,
    pub date: String,
    pub time: String,
    pub description: String,
    pub host_name: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,

    /// Joined users, unique, in join order
    pub attendees: Vec<UserId>,

    pub attendee_limit: Option<NonZeroU32>,
}

impl Session {
    /// Build the stored record for a new session
    pub fn from_new(id: SessionId, new: NewSession, created_at: DateTime<Utc>) -> Self {
        let NewSession {
            fields,
            host_name,
            created_by,
        } = new;
        Self {
            id,
            subject: fields.subject,
            subject_name: fields.subject_name,
            location: fields.location,
            date: fields.date,
            time: fields.time,
            description: fields.description,
            host_name,
            created_by,
            created_at,
            attendees: Vec::new(),
            attendee_limit: fields.attendee_limit,
        }
    }

    /// Overwrite the descriptive fields, leaving host and attendees alone
    pub fn apply_fields(&mut self, fields: SessionFields) {
        self.subject = fields.subject;
        self.subject_name = fields.subject_name;
        self.location = fields.location;
        self.date = fields.date;
        self.time = fields.time;
        self.description = fields.description;
        self.attendee_limit = fields.attendee_limit;
    }

    /// Check whether `user` created this session
    pub fn is_host(&self, user: &UserId) -> bool {
        &self.created_by == user
    }

    /// Attendees in join order with the host left out
    pub fn attending(&self) -> impl Iterator<Item = &UserId> {
        self.attendees.iter().filter(move |uid| **uid != self.created_by)
    }

    /// Course code followed by the course name, when there is one
    pub fn title(&self) -> String {
        if self.subject_name.is_empty() {
            self.subject.clone()
        } else {
            format!("{} {}", self.subject, self.subject_name)
        }
    }

    /// `"<date> at <time>"`
    pub fn when(&self) -> String {
        format!("{} at {}", self.date, self.time)
    }

    /// Host display name, `Anonymous` when none was captured
    pub fn host_display(&self) -> &str {
        if self.host_name.is_empty() {
            "Anonymous"
        } else {
            &self.host_name
        }
    }

    /// Remaining places, `None` for unlimited sessions
    pub fn spots_left(&self) -> Option<u32> {
        self.attendee_limit.map(|limit| {
            let taken = u32::try_from(self.attendees.len()).unwrap_or(u32::MAX);
            limit.get().saturating_sub(taken)
        })
    }
}

/// Initials for an avatar: first letter of each word, `U` when there is no name
pub fn initials(name: Option<&str>) -> String {
    match name {
        Some(name) if !name.trim().is_empty() => name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .collect(),
        _ => "U".to_string(),
    }
}
