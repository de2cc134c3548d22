//! The mobile-number identity key.
//!
//! Identities are keyed by mobile number. The wrapper validates shape at
//! construction so malformed keys never enter a repository.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Minimum digits in a mobile number.
const MIN_DIGITS: usize = 10;
/// Maximum digits in a mobile number.
const MAX_DIGITS: usize = 15;

/// A validated mobile number, the unique key for an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MobileNumber(String);

impl MobileNumber {
    /// Parses and validates a mobile number.
    ///
    /// Accepts 10 to 15 ASCII digits, with an optional leading `+`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the input is malformed.
    pub fn parse(input: &str) -> Result<Self, AppError> {
        let digits = input.strip_prefix('+').unwrap_or(input);

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::Validation(format!(
                "mobile number must contain only digits: {input}"
            )));
        }
        if digits.len() < MIN_DIGITS || digits.len() > MAX_DIGITS {
            return Err(AppError::Validation(format!(
                "mobile number must be {MIN_DIGITS}-{MAX_DIGITS} digits, got {}",
                digits.len()
            )));
        }

        Ok(Self(digits.to_string()))
    }

    /// Returns the digits as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MobileNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MobileNumber {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MobileNumber {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MobileNumber> for String {
    fn from(value: MobileNumber) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("09121234567")]
    #[case("+14155550123")]
    #[case("989121234567")]
    fn test_valid_numbers(#[case] input: &str) {
        assert!(MobileNumber::parse(input).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("12345")]
    #[case("0912-123-4567")]
    #[case("09121234567890123")]
    #[case("o9121234567")]
    fn test_invalid_numbers(#[case] input: &str) {
        assert!(matches!(
            MobileNumber::parse(input),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_plus_prefix_is_stripped() {
        let n = MobileNumber::parse("+14155550123").unwrap();
        assert_eq!(n.as_str(), "14155550123");
    }
}
