//! Session tracking and idle-timeout enforcement.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tapguard_shared::types::{MobileNumber, SessionId};

use super::error::SessionError;

/// An active login session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    /// Session identifier handed to the caller at login.
    pub id: SessionId,
    /// When the session was created.
    pub login_time: DateTime<Utc>,
    /// Last time a privileged operation ran under this session.
    pub last_activity: DateTime<Utc>,
}

/// Tracks the single active session per identity.
pub struct SessionManager {
    sessions: DashMap<MobileNumber, Session>,
    idle_timeout: Duration,
}

impl SessionManager {
    /// Creates a manager with the given idle timeout.
    #[must_use]
    pub fn new(idle_minutes: i64) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout: Duration::minutes(idle_minutes),
        }
    }

    /// Starts a session for an identity, superseding any previous one.
    pub fn start_session(&self, key: &MobileNumber) -> Session {
        let now = Utc::now();
        let session = Session {
            id: SessionId::new(),
            login_time: now,
            last_activity: now,
        };
        self.sessions.insert(key.clone(), session);
        session
    }

    /// Checks that the identity holds the given active session.
    ///
    /// On idle expiry the session is removed, so the caller must log in
    /// again.
    ///
    /// # Errors
    ///
    /// `SessionError::NotAuthenticated` if no matching session exists;
    /// `SessionError::Expired` if the idle timeout elapsed.
    pub fn require_active(
        &self,
        key: &MobileNumber,
        session_id: SessionId,
    ) -> Result<(), SessionError> {
        self.require_active_at(key, session_id, Utc::now())
    }

    fn require_active_at(
        &self,
        key: &MobileNumber,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let Some(session) = self.sessions.get(key) else {
            return Err(SessionError::NotAuthenticated);
        };
        if session.id != session_id {
            return Err(SessionError::NotAuthenticated);
        }
        if now - session.last_activity > self.idle_timeout {
            drop(session);
            self.sessions.remove(key);
            return Err(SessionError::Expired);
        }
        Ok(())
    }

    /// Refreshes the session's last-activity time.
    pub fn touch(&self, key: &MobileNumber) {
        if let Some(mut session) = self.sessions.get_mut(key) {
            session.last_activity = Utc::now();
        }
    }

    /// Ends the identity's session, if any.
    pub fn end_session(&self, key: &MobileNumber) {
        self.sessions.remove(key);
    }

    /// Returns the active session for an identity, if one exists.
    #[must_use]
    pub fn active_session(&self, key: &MobileNumber) -> Option<Session> {
        self.sessions.get(key).map(|s| *s)
    }
}
