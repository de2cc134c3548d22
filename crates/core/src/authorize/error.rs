//! Authorization error types.
//!
//! These are the fatal errors of the state machine. Expected business
//! declines (`insufficient_funds`, `requires_pin`, `policy_violation`,
//! `card_expired`) are not errors; they come back as normal
//! [`AuthorizationOutcome`](super::types::AuthorizationOutcome) values.

use tapguard_shared::AppError;
use thiserror::Error;

use crate::card::CardError;
use crate::device::{DeviceError, GatewayError, ProviderError};
use crate::identity::IdentityError;
use crate::otp::OtpError;
use crate::session::SessionError;
use crate::token::TokenError;

/// Fatal errors raised by the authorization engine.
#[derive(Debug, Error)]
pub enum AuthorizeError {
    /// The session precondition failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The OTP service refused the validation attempt.
    #[error(transparent)]
    Otp(#[from] OtpError),

    /// The submitted passcode was wrong or expired.
    #[error("Passcode rejected")]
    OtpRejected,

    /// An identity operation failed.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// A card operation failed.
    #[error(transparent)]
    Card(#[from] CardError),

    /// Token minting failed (data-integrity fault).
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Device communication failed; already logged as `nfc_error`.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Gateway communication failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The gateway did not confirm the online payment.
    #[error("Online payment was not confirmed by the gateway")]
    GatewayDeclined,

    /// Purchase provider communication failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The provider could not verify the purchase token.
    #[error("Purchase could not be verified")]
    PurchaseNotVerified,

    /// The double-submit guard rejected the attempt.
    #[error("Too soon after the previous transaction; retry in {retry_in_secs}s")]
    CooldownActive {
        /// Seconds until the cooldown clears.
        retry_in_secs: i64,
    },

    /// The identity has no default card to authorize against.
    #[error("No default card is set for this identity")]
    NoDefaultCard,

    /// The requested amount is zero or negative.
    #[error("Amount must be positive")]
    InvalidAmount,
}

impl AuthorizeError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Session(e) => e.error_code(),
            Self::Otp(e) => e.error_code(),
            Self::OtpRejected => "OTP_REJECTED",
            Self::Identity(e) => e.error_code(),
            Self::Card(e) => e.error_code(),
            Self::Token(e) => e.error_code(),
            Self::Device(_) => "DEVICE_COMM_FAILURE",
            Self::Gateway(_) => "GATEWAY_COMM_FAILURE",
            Self::GatewayDeclined => "GATEWAY_DECLINED",
            Self::Provider(_) => "PROVIDER_COMM_FAILURE",
            Self::PurchaseNotVerified => "PURCHASE_NOT_VERIFIED",
            Self::CooldownActive { .. } => "COOLDOWN_ACTIVE",
            Self::NoDefaultCard => "NO_DEFAULT_CARD",
            Self::InvalidAmount => "INVALID_AMOUNT",
        }
    }
}

impl From<AuthorizeError> for AppError {
    fn from(err: AuthorizeError) -> Self {
        match &err {
            AuthorizeError::Session(_)
            | AuthorizeError::OtpRejected => Self::Unauthorized(err.to_string()),
            AuthorizeError::Otp(OtpError::TooManyAttempts) => Self::Forbidden(err.to_string()),
            AuthorizeError::Otp(OtpError::CodeNotIssued)
            | AuthorizeError::GatewayDeclined
            | AuthorizeError::PurchaseNotVerified
            | AuthorizeError::CooldownActive { .. }
            | AuthorizeError::NoDefaultCard => Self::BusinessRule(err.to_string()),
            AuthorizeError::Identity(IdentityError::NotFound(_)) => Self::NotFound(err.to_string()),
            AuthorizeError::Identity(IdentityError::AlreadyRegistered(_)) => {
                Self::Conflict(err.to_string())
            }
            AuthorizeError::Identity(IdentityError::PasswordMismatch) => {
                Self::Unauthorized(err.to_string())
            }
            AuthorizeError::Identity(_) | AuthorizeError::InvalidAmount => {
                Self::Validation(err.to_string())
            }
            AuthorizeError::Card(CardError::NotFound(_)) => Self::NotFound(err.to_string()),
            AuthorizeError::Card(_) => Self::Validation(err.to_string()),
            AuthorizeError::Token(_) => Self::Internal(err.to_string()),
            AuthorizeError::Device(_)
            | AuthorizeError::Gateway(_)
            | AuthorizeError::Provider(_) => Self::ExternalService(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AuthorizeError::Session(SessionError::Expired).error_code(),
            "SESSION_EXPIRED"
        );
        assert_eq!(
            AuthorizeError::CooldownActive { retry_in_secs: 3 }.error_code(),
            "COOLDOWN_ACTIVE"
        );
        assert_eq!(AuthorizeError::NoDefaultCard.error_code(), "NO_DEFAULT_CARD");
        assert_eq!(
            AuthorizeError::Device(DeviceError::Timeout).error_code(),
            "DEVICE_COMM_FAILURE"
        );
    }

    #[test]
    fn test_app_error_mapping() {
        let mapped: AppError = AuthorizeError::Session(SessionError::NotAuthenticated).into();
        assert!(matches!(mapped, AppError::Unauthorized(_)));

        let mapped: AppError = AuthorizeError::Otp(OtpError::TooManyAttempts).into();
        assert!(matches!(mapped, AppError::Forbidden(_)));

        let mapped: AppError = AuthorizeError::Device(DeviceError::Timeout).into();
        assert!(matches!(mapped, AppError::ExternalService(_)));

        let mapped: AppError = AuthorizeError::Card(CardError::InvalidNumber).into();
        assert!(matches!(mapped, AppError::Validation(_)));
    }

    #[test]
    fn test_cooldown_display() {
        assert_eq!(
            AuthorizeError::CooldownActive { retry_in_secs: 4 }.to_string(),
            "Too soon after the previous transaction; retry in 4s"
        );
    }
}
