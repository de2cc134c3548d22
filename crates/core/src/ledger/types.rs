//! Ledger domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tapguard_shared::types::CardId;

/// Terminal status of an authorization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Funds moved.
    Success,
    /// The device reported insufficient funds.
    InsufficientFunds,
    /// The auth policy demands a PIN that was not supplied.
    RequiresPin,
    /// A policy gate declined the attempt (limit, biometric, suspension).
    PolicyViolation,
    /// The default card is expired.
    CardExpired,
    /// Device communication failed; raised to the caller after logging.
    NfcError,
}

impl TxStatus {
    /// Returns true for the one successful status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::InsufficientFunds => "insufficient_funds",
            Self::RequiresPin => "requires_pin",
            Self::PolicyViolation => "policy_violation",
            Self::CardExpired => "card_expired",
            Self::NfcError => "nfc_error",
        };
        write!(f, "{s}")
    }
}

/// Security annotations attached to a record.
///
/// Flags stack: a single record can carry both a forced-MFA flag and a
/// high-value flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityFlag {
    /// Risk score crossed the high-risk threshold; MFA was forced.
    DrsHighRiskForcedMfa,
    /// Geo-velocity tripped below the full high-risk threshold.
    VelocityFraudRiskHigh,
    /// Pre-fee amount exceeded the high-value threshold.
    HighValueTransaction,
    /// The device reported insufficient funds.
    InsufficientFunds,
    /// Diagnostic flag for device communication failures.
    DeviceCommFailure,
}

impl SecurityFlag {
    /// Stable wire name for logs and exports.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DrsHighRiskForcedMfa => "DRS_HIGH_RISK_FORCED_MFA",
            Self::VelocityFraudRiskHigh => "VELOCITY_FRAUD_RISK_HIGH",
            Self::HighValueTransaction => "HIGH_VALUE_TRANSACTION",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::DeviceCommFailure => "DEVICE_COMM_FAILURE",
        }
    }
}

impl std::fmt::Display for SecurityFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable ledger record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// When the terminal outcome was reached.
    pub timestamp: DateTime<Utc>,
    /// Recorded amount (net of fee for successful payments).
    pub amount: Decimal,
    /// Terminal status.
    pub status: TxStatus,
    /// The card the attempt ran against.
    pub card_id: CardId,
    /// Human-readable outcome message.
    pub message: String,
    /// Fee charged (zero for declines and top-ups).
    pub fee_amount: Decimal,
    /// Security annotations, possibly empty.
    pub security_flags: Vec<SecurityFlag>,
    /// Geo hash of the attempt, when one was supplied.
    pub geo_hash: Option<String>,
    /// Risk score computed for the attempt (zero when scoring was not
    /// reached).
    pub risk_score: u32,
}

impl TransactionRecord {
    /// Returns true if the record carries the given flag.
    #[must_use]
    pub fn has_flag(&self, flag: SecurityFlag) -> bool {
        self.security_flags.contains(&flag)
    }
}
