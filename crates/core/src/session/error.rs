//! Session error types.

use thiserror::Error;

/// Errors raised when a privileged operation checks its session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// No active session exists for the identity, or the supplied session
    /// id does not match the active one.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The session exceeded the idle timeout and has been invalidated.
    #[error("Session expired, please log in again")]
    Expired,
}

impl SessionError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::Expired => "SESSION_EXPIRED",
        }
    }
}
