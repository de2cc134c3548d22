//! Card domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tapguard_shared::types::CardId;

use super::error::CardError;

/// Extra proof a payment against this card requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPolicy {
    /// PIN required only above the configured amount threshold.
    Standard,
    /// PIN required for every payment.
    MandatoryPin,
    /// Biometric proof required for every payment.
    BiometricRequired,
    /// Both PIN and biometric proof required.
    DynamicMfa,
}

impl AuthPolicy {
    /// Returns true if this policy demands a PIN for the given amount.
    ///
    /// `Standard` requires a PIN only for amounts strictly greater than
    /// the threshold; an amount exactly equal to it passes without one.
    #[must_use]
    pub fn requires_pin(&self, amount: Decimal, pin_threshold: Decimal) -> bool {
        match self {
            Self::Standard => amount > pin_threshold,
            Self::MandatoryPin | Self::DynamicMfa => true,
            Self::BiometricRequired => false,
        }
    }

    /// Returns true if this policy demands biometric proof.
    #[must_use]
    pub const fn requires_biometric(&self) -> bool {
        matches!(self, Self::BiometricRequired | Self::DynamicMfa)
    }
}

/// Card expiry month and year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardExpiry {
    month: u32,
    year: i32,
}

impl CardExpiry {
    /// Parses an `MM/YY` expiry string.
    ///
    /// # Errors
    ///
    /// Returns `CardError::InvalidExpiry` for anything that is not two
    /// digits, a slash, and two digits with a month in 1..=12.
    pub fn parse(input: &str) -> Result<Self, CardError> {
        let invalid = || CardError::InvalidExpiry(input.to_string());

        let (mm, yy) = input.split_once('/').ok_or_else(invalid)?;
        if mm.len() != 2 || yy.len() != 2 {
            return Err(invalid());
        }

        let month: u32 = mm.parse().map_err(|_| invalid())?;
        let year: i32 = yy.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }

        Ok(Self {
            month,
            year: 2000 + year,
        })
    }

    /// Returns true when `today` is on or after the first day of the
    /// month following the expiry month/year.
    #[must_use]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        let (next_month, next_year) = if self.month == 12 {
            (1, self.year + 1)
        } else {
            (self.month + 1, self.year)
        };
        // Month in 1..=12 and day 1 always form a valid date.
        let cutoff = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .unwrap_or(NaiveDate::MAX);
        today >= cutoff
    }

    /// Expiry month (1..=12).
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// Full expiry year (e.g. 2027).
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }
}

impl std::fmt::Display for CardExpiry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}/{:02}", self.month, self.year.rem_euclid(100))
    }
}

impl TryFrom<String> for CardExpiry {
    type Error = CardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CardExpiry> for String {
    fn from(value: CardExpiry) -> Self {
        value.to_string()
    }
}

/// A registered card. Number and CVV exist only as sealed cipher text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    /// The card ID, unique within the owning identity.
    pub id: CardId,
    /// Human-readable alias.
    pub alias: String,
    /// Sealed card number (never plaintext).
    pub sealed_number: Vec<u8>,
    /// Sealed CVV (never plaintext).
    pub sealed_cvv: Vec<u8>,
    /// Expiry month/year.
    pub expiry: CardExpiry,
    /// National id of the owning identity, fixed at creation.
    pub owner_national_id: String,
    /// Maximum cumulative spend per local calendar day.
    pub daily_limit: Decimal,
    /// Extra-proof policy for payments.
    pub auth_policy: AuthPolicy,
    /// Suspended cards decline before the device is invoked.
    pub suspended: bool,
    /// Set when the risk engine force-escalated the policy, so a later
    /// calm attempt can revert it.
    pub auto_escalated: bool,
}

/// Plaintext input for registering a new card. Transient only; the
/// registry seals the sensitive fields and drops the plaintext.
#[derive(Debug, Clone)]
pub struct NewCard {
    /// Human-readable alias.
    pub alias: String,
    /// Plaintext card number (16 digits).
    pub number: String,
    /// Plaintext CVV (3 digits).
    pub cvv: String,
    /// Expiry in `MM/YY` form.
    pub expiry: String,
    /// Daily spend limit (must be positive).
    pub daily_limit: Decimal,
    /// Initial auth policy.
    pub auth_policy: AuthPolicy,
}

impl NewCard {
    /// Convenience constructor with the standard policy.
    #[must_use]
    pub fn new(alias: &str, number: &str, cvv: &str, expiry: &str, daily_limit: Decimal) -> Self {
        Self {
            alias: alias.to_string(),
            number: number.to_string(),
            cvv: cvv.to_string(),
            expiry: expiry.to_string(),
            daily_limit,
            auth_policy: AuthPolicy::Standard,
        }
    }
}
