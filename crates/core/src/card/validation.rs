//! Card field validation and masking.
//!
//! Validation happens at construction time; malformed input never reaches
//! the registry or the ledger.

use super::error::CardError;

/// Required card number length.
const PAN_LENGTH: usize = 16;

/// Required CVV length.
const CVV_LENGTH: usize = 3;

/// Validates that a card number is exactly 16 ASCII digits.
///
/// # Errors
///
/// Returns `CardError::InvalidNumber` otherwise.
pub fn validate_card_number(number: &str) -> Result<(), CardError> {
    if number.len() == PAN_LENGTH && number.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(CardError::InvalidNumber)
    }
}

/// Validates that a CVV is exactly 3 ASCII digits.
///
/// # Errors
///
/// Returns `CardError::InvalidCvv` otherwise.
pub fn validate_cvv(cvv: &str) -> Result<(), CardError> {
    if cvv.len() == CVV_LENGTH && cvv.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(CardError::InvalidCvv)
    }
}

/// Masks a card number, keeping only the last four digits.
#[must_use]
pub fn mask_pan(number: &str) -> String {
    let last4 = &number[number.len().saturating_sub(4)..];
    format!("**** **** **** {last4}")
}
