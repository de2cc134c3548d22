//! Card error types for validation and registry operations.

use tapguard_shared::types::CardId;
use thiserror::Error;

use crate::crypto::CipherError;

/// Errors that can occur during card operations.
#[derive(Debug, Error)]
pub enum CardError {
    // ========== Validation Errors ==========
    /// Card number must be exactly 16 digits.
    #[error("Card number must be exactly 16 digits")]
    InvalidNumber,

    /// CVV must be exactly 3 digits.
    #[error("CVV must be exactly 3 digits")]
    InvalidCvv,

    /// Expiry must be in MM/YY format.
    #[error("Invalid expiry '{0}': expected MM/YY")]
    InvalidExpiry(String),

    /// Daily limit must be positive.
    #[error("Daily limit must be positive")]
    NonPositiveLimit,

    /// The card's owner national id does not match the identity.
    #[error("Card owner national id does not match the registering identity")]
    OwnerMismatch,

    // ========== Registry Errors ==========
    /// Card not found on the identity.
    #[error("Card not found: {0}")]
    NotFound(CardId),

    /// The default card cannot be removed until a new default is set.
    #[error("Cannot remove the default card; set a new default first")]
    CannotRemoveDefault,

    // ========== Data Integrity ==========
    /// Stored cipher text could not be processed.
    ///
    /// Decryption failure of a stored payload is a data-integrity fault
    /// and is never silently defaulted.
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

impl CardError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidNumber => "INVALID_CARD_NUMBER",
            Self::InvalidCvv => "INVALID_CVV",
            Self::InvalidExpiry(_) => "INVALID_EXPIRY",
            Self::NonPositiveLimit => "NON_POSITIVE_LIMIT",
            Self::OwnerMismatch => "OWNER_MISMATCH",
            Self::NotFound(_) => "CARD_NOT_FOUND",
            Self::CannotRemoveDefault => "CANNOT_REMOVE_DEFAULT",
            Self::Cipher(_) => "CARD_DATA_INTEGRITY",
        }
    }
}
