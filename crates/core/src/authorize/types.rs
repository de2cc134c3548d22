//! Authorization request and outcome types.

use rust_decimal::Decimal;
use tapguard_shared::types::{MobileNumber, SessionId};

use crate::ledger::{SecurityFlag, TxStatus};

/// A payment authorization request.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// The paying identity.
    pub mobile: MobileNumber,
    /// The caller's session.
    pub session_id: SessionId,
    /// Requested (gross) amount.
    pub amount: Decimal,
    /// Geo hash of the attempt, for the velocity heuristic.
    pub geo_hash: String,
    /// PIN, when the caller supplied one.
    pub pin: Option<String>,
    /// Whether biometric proof accompanied the request.
    pub biometric_verified: bool,
}

impl PaymentRequest {
    /// Creates a request with no PIN and no biometric proof.
    #[must_use]
    pub fn new(
        mobile: MobileNumber,
        session_id: SessionId,
        amount: Decimal,
        geo_hash: &str,
    ) -> Self {
        Self {
            mobile,
            session_id,
            amount,
            geo_hash: geo_hash.to_string(),
            pin: None,
            biometric_verified: false,
        }
    }

    /// Attaches a PIN.
    #[must_use]
    pub fn with_pin(mut self, pin: &str) -> Self {
        self.pin = Some(pin.to_string());
        self
    }

    /// Marks the request as biometric-verified.
    #[must_use]
    pub fn with_biometric(mut self) -> Self {
        self.biometric_verified = true;
        self
    }
}

/// A top-up request.
#[derive(Debug, Clone)]
pub struct TopUpRequest {
    /// The identity topping up.
    pub mobile: MobileNumber,
    /// The caller's session.
    pub session_id: SessionId,
    /// Amount to credit.
    pub amount: Decimal,
    /// PIN, when the caller supplied one.
    pub pin: Option<String>,
}

impl TopUpRequest {
    /// Creates a top-up request without a PIN.
    #[must_use]
    pub fn new(mobile: MobileNumber, session_id: SessionId, amount: Decimal) -> Self {
        Self {
            mobile,
            session_id,
            amount,
            pin: None,
        }
    }
}

/// Terminal result of an authorization attempt.
///
/// Declined outcomes are values of this type, not errors; the matching
/// ledger record has already been appended when one is returned.
#[derive(Debug, Clone)]
pub struct AuthorizationOutcome {
    /// Terminal status.
    pub status: TxStatus,
    /// Effective amount (net of fee for successful payments).
    pub amount: Decimal,
    /// Fee charged (zero unless the payment succeeded).
    pub fee: Decimal,
    /// Human-readable outcome message.
    pub message: String,
    /// Security annotations attached to the attempt.
    pub security_flags: Vec<SecurityFlag>,
    /// Risk score computed for the attempt.
    pub risk_score: u32,
}

impl AuthorizationOutcome {
    /// Returns true for the successful status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if the outcome carries the given flag.
    #[must_use]
    pub fn has_flag(&self, flag: SecurityFlag) -> bool {
        self.security_flags.contains(&flag)
    }
}
