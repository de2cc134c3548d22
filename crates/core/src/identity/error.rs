//! Identity error types.

use tapguard_shared::types::MobileNumber;
use thiserror::Error;

use crate::card::CardError;
use crate::crypto::PasswordError;

/// Errors that can occur during identity operations.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// An identity with this mobile number already exists.
    #[error("Identity already registered: {0}")]
    AlreadyRegistered(MobileNumber),

    /// No identity exists for this mobile number.
    #[error("Identity not found: {0}")]
    NotFound(MobileNumber),

    /// The supplied password does not match the stored hash.
    #[error("Password does not match")]
    PasswordMismatch,

    /// A card operation failed.
    #[error(transparent)]
    Card(#[from] CardError),

    /// Credential hashing failed.
    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl IdentityError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyRegistered(_) => "IDENTITY_ALREADY_REGISTERED",
            Self::NotFound(_) => "IDENTITY_NOT_FOUND",
            Self::PasswordMismatch => "PASSWORD_MISMATCH",
            Self::Card(e) => e.error_code(),
            Self::Password(_) => "PASSWORD_HASH_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let key = MobileNumber::parse("09121234567").unwrap();
        assert_eq!(
            IdentityError::AlreadyRegistered(key.clone()).error_code(),
            "IDENTITY_ALREADY_REGISTERED"
        );
        assert_eq!(
            IdentityError::NotFound(key).error_code(),
            "IDENTITY_NOT_FOUND"
        );
        assert_eq!(
            IdentityError::PasswordMismatch.error_code(),
            "PASSWORD_MISMATCH"
        );
        assert_eq!(
            IdentityError::Card(CardError::InvalidCvv).error_code(),
            "INVALID_CVV"
        );
    }
}
