//! Login sessions with idle timeout.
//!
//! One session per identity; a new login supersedes the previous session,
//! and idle expiry clears the binding so the caller must re-authenticate.

pub mod error;
pub mod manager;

pub use error::SessionError;
pub use manager::{Session, SessionManager};
