//! Client-side search and grouping of fetched sessions

use super::{Session, UserId};
use chrono::{Days, NaiveDate};
use std::str::FromStr;

/// Which dates the find screen shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DateFilter {
    #[default]
    All,
    Today,
    Tomorrow,
    /// Exact match on the stored date string
    On(String),
}

impl FromStr for DateFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => DateFilter::All,
            "today" => DateFilter::Today,
            "tomorrow" => DateFilter::Tomorrow,
            _ => DateFilter::On(s.trim().to_string()),
        })
    }
}

impl DateFilter {
    /// Date string this filter matches, given the local calendar date
    fn wanted(&self, today: NaiveDate) -> Option<String> {
        match self {
            DateFilter::All => None,
            DateFilter::Today => Some(display_date(today)),
            DateFilter::Tomorrow => Some(display_date(
                today.checked_add_days(Days::new(1)).unwrap_or(today),
            )),
            DateFilter::On(date) => Some(date.clone()),
        }
    }
}

/// Render a calendar date the way session dates are typed in
pub fn display_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Search box text plus date chip
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub search: String,
    pub date: DateFilter,
}

impl SessionFilter {
    pub fn new(search: impl Into<String>, date: DateFilter) -> Self {
        Self {
            search: search.into(),
            date,
        }
    }

    /// Case-insensitive substring match on subject, subject name or location
    pub fn matches_search(&self, session: &Session) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        session.subject.to_lowercase().contains(&needle)
            || session.subject_name.to_lowercase().contains(&needle)
            || session.location.label().to_lowercase().contains(&needle)
    }

    /// Keep the sessions that match, preserving their order
    pub fn apply(&self, sessions: Vec<Session>, today: NaiveDate) -> Vec<Session> {
        let wanted = self.date.wanted(today);
        sessions
            .into_iter()
            .filter(|s| self.matches_search(s))
            .filter(|s| wanted.as_deref().map_or(true, |date| s.date == date))
            .collect()
    }
}

/// Split sessions into the ones `user` hosts and the ones they attend
///
/// A host who also sits on their own attendee list only shows up as host.
pub fn partition_for_user(sessions: Vec<Session>, user: &UserId) -> (Vec<Session>, Vec<Session>) {
    let mut hosting = Vec::new();
    let mut attending = Vec::new();
    for session in sessions {
        if session.is_host(user) {
            hosting.push(session);
        } else if session.attendees.contains(user) {
            attending.push(session);
        }
    }
    (hosting, attending)
}
