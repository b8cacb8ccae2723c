//! Join/leave rules for a session's attendee list
//!
//! These functions only decide. They look at a local snapshot of the session
//! and return the attendee list the caller should persist. The snapshot may be
//! stale, so two students racing for the last place can both get through;
//! capacity here is best-effort unless the store enforces it as well.

use super::{Session, UserId};
use thiserror::Error;

/// Why a membership change was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MembershipError {
    #[error("Session is full")]
    AlreadyFull,

    #[error("No signed-in user")]
    NotAuthenticated,
}

/// The session has a limit and it has been reached
pub fn is_full(session: &Session) -> bool {
    match session.attendee_limit {
        Some(limit) => session.attendees.len() >= limit.get() as usize,
        None => false,
    }
}

/// `user` is on the attendee list
pub fn has_joined(session: &Session, user: &UserId) -> bool {
    session.attendees.contains(user)
}

/// Attendee list after `user` joins
///
/// Joining again is a no-op, even when the session has since filled up.
pub fn join(session: &Session, user: Option<&UserId>) -> Result<Vec<UserId>, MembershipError> {
    if let Some(user) = user {
        if has_joined(session, user) {
            return Ok(session.attendees.clone());
        }
    }

    if is_full(session) {
        return Err(MembershipError::AlreadyFull);
    }

    let user = user.ok_or(MembershipError::NotAuthenticated)?;

    let mut attendees = session.attendees.clone();
    attendees.push(user.clone());
    Ok(attendees)
}

/// Attendee list after `user` leaves; leaving without being a member is a no-op
pub fn leave(session: &Session, user: Option<&UserId>) -> Result<Vec<UserId>, MembershipError> {
    let user = user.ok_or(MembershipError::NotAuthenticated)?;
    Ok(session
        .attendees
        .iter()
        .filter(|uid| *uid != user)
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::sample;

    fn ids(list: &[UserId]) -> Vec<&str> {
        list.iter().map(UserId::as_str).collect()
    }

    #[test]
    fn test_unlimited_is_never_full() {
        let session = sample(None, &["a", "b", "c", "d"]);
        assert!(!is_full(&session));
    }

    #[test]
    fn test_full_at_limit() {
        assert!(!is_full(&sample(Some(2), &["a"])));
        assert!(is_full(&sample(Some(2), &["a", "b"])));
    }

    #[test]
    fn test_join_appends_in_order() {
        let session = sample(Some(2), &["a"]);
        let attendees = join(&session, Some(&UserId::new("b"))).unwrap();
        assert_eq!(ids(&attendees), vec!["a", "b"]);
    }

    #[test]
    fn test_join_full_session() {
        let session = sample(Some(1), &["a"]);
        assert_eq!(
            join(&session, Some(&UserId::new("b"))),
            Err(MembershipError::AlreadyFull)
        );
    }

    #[test]
    fn test_rejoin_full_session_is_noop() {
        let session = sample(Some(1), &["a"]);
        let attendees = join(&session, Some(&UserId::new("a"))).unwrap();
        assert_eq!(ids(&attendees), vec!["a"]);
    }

    #[test]
    fn test_join_without_user() {
        let session = sample(None, &[]);
        assert_eq!(join(&session, None), Err(MembershipError::NotAuthenticated));
    }

    #[test]
    fn test_full_reported_before_missing_user() {
        let session = sample(Some(1), &["a"]);
        assert_eq!(join(&session, None), Err(MembershipError::AlreadyFull));
    }

    #[test]
    fn test_leave_removes_only_user() {
        let session = sample(None, &["a", "b", "c"]);
        let attendees = leave(&session, Some(&UserId::new("b"))).unwrap();
        assert_eq!(ids(&attendees), vec!["a", "c"]);
    }

    #[test]
    fn test_leave_without_user() {
        let session = sample(None, &["a"]);
        assert_eq!(leave(&session, None), Err(MembershipError::NotAuthenticated));
    }
}
