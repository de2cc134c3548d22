//! One-time passcode issuance and validation.
//!
//! One outstanding code per identity, a hard attempt cap, and
//! purge-on-success to prevent replay.

pub mod error;
pub mod service;

pub use error::OtpError;
pub use service::OtpService;
