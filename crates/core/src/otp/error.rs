//! OTP error types.

use thiserror::Error;

/// Errors raised during passcode validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OtpError {
    /// The attempt counter reached its cap; the code has been purged.
    #[error("Too many passcode attempts; request a new code")]
    TooManyAttempts,

    /// No passcode has been issued for this identity.
    #[error("No passcode outstanding for this identity")]
    CodeNotIssued,
}

impl OtpError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::TooManyAttempts => "OTP_TOO_MANY_ATTEMPTS",
            Self::CodeNotIssued => "OTP_NOT_ISSUED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            OtpError::TooManyAttempts.error_code(),
            "OTP_TOO_MANY_ATTEMPTS"
        );
        assert_eq!(OtpError::CodeNotIssued.error_code(), "OTP_NOT_ISSUED");
    }
}
