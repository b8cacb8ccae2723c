//! Application error taxonomy
//!
//! Every failure a student can see collapses into one of these variants and is
//! shown as a single message. Nothing here is retried automatically.

use crate::session::MembershipError;
use thiserror::Error;

/// Errors surfaced by [`crate::app::App`] operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// A required form field is empty
    #[error("Please fill in all required fields.")]
    MissingFields,

    /// No signed-in user is available
    #[error("You must be signed in to do that.")]
    NotAuthenticated,

    /// The session has reached its attendee limit
    #[error("This session has reached its attendee limit.")]
    AlreadyFull,

    /// Only the session's creator may edit or delete it
    #[error("Only the host can change this session.")]
    NotHost,

    /// Any failure reported by the identity service or the document store
    #[error("Remote operation failed: {0}")]
    RemoteOperationFailed(String),
}

impl AppError {
    /// Wrap a backend failure
    pub fn remote(err: impl std::fmt::Display) -> Self {
        AppError::RemoteOperationFailed(err.to_string())
    }

    /// Short title for the message shown alongside the error
    pub fn title(&self) -> &'static str {
        match self {
            AppError::MissingFields => "Missing Fields",
            AppError::NotAuthenticated => "Not signed in",
            AppError::AlreadyFull => "Session Full",
            AppError::NotHost => "Not allowed",
            AppError::RemoteOperationFailed(_) => "Error",
        }
    }
}

impl From<MembershipError> for AppError {
    fn from(err: MembershipError) -> Self {
        match err {
            MembershipError::AlreadyFull => AppError::AlreadyFull,
            MembershipError::NotAuthenticated => AppError::NotAuthenticated,
        }
    }
}

/// Convenience alias for app-level results
pub type AppResult<T> = std::result::Result<T, AppError>;
