//! Card registry: construction and on-demand decryption.
//!
//! The registry is stateless; registered cards are owned by their identity
//! aggregate. All sensitive fields are sealed before a [`Card`] exists.

use tapguard_shared::types::CardId;

use super::error::CardError;
use super::types::{Card, CardExpiry, NewCard};
use super::validation::{mask_pan, validate_card_number, validate_cvv};
use crate::crypto::PayloadCipher;

/// Stateless card registry service.
pub struct CardRegistry;

impl CardRegistry {
    /// Validates a new card and seals its sensitive fields.
    ///
    /// The returned [`Card`] carries cipher text only; the plaintext input
    /// is dropped here.
    ///
    /// # Errors
    ///
    /// Returns `CardError` if the number is not 16 digits, the CVV is not
    /// 3 digits, the expiry is not `MM/YY`, the daily limit is not
    /// positive, or sealing fails.
    pub fn register(
        input: &NewCard,
        owner_national_id: &str,
        cipher: &dyn PayloadCipher,
    ) -> Result<Card, CardError> {
        validate_card_number(&input.number)?;
        validate_cvv(&input.cvv)?;
        let expiry = CardExpiry::parse(&input.expiry)?;
        if input.daily_limit <= rust_decimal::Decimal::ZERO {
            return Err(CardError::NonPositiveLimit);
        }

        let sealed_number = cipher.seal(input.number.as_bytes())?;
        let sealed_cvv = cipher.seal(input.cvv.as_bytes())?;

        Ok(Card {
            id: CardId::new(),
            alias: input.alias.clone(),
            sealed_number,
            sealed_cvv,
            expiry,
            owner_national_id: owner_national_id.to_string(),
            daily_limit: input.daily_limit,
            auth_policy: input.auth_policy,
            suspended: false,
            auto_escalated: false,
        })
    }

    /// Decrypts the stored card number on demand.
    ///
    /// # Errors
    ///
    /// A failure to open the stored cipher text is a data-integrity fault.
    pub fn reveal_number(card: &Card, cipher: &dyn PayloadCipher) -> Result<String, CardError> {
        let bytes = cipher.open(&card.sealed_number)?;
        String::from_utf8(bytes).map_err(|_| CardError::Cipher(crate::crypto::CipherError::OpenFailed))
    }

    /// Decrypts the stored CVV on demand.
    ///
    /// # Errors
    ///
    /// A failure to open the stored cipher text is a data-integrity fault.
    pub fn reveal_cvv(card: &Card, cipher: &dyn PayloadCipher) -> Result<String, CardError> {
        let bytes = cipher.open(&card.sealed_cvv)?;
        String::from_utf8(bytes).map_err(|_| CardError::Cipher(crate::crypto::CipherError::OpenFailed))
    }

    /// Returns the masked card number (`**** **** **** ` + last 4).
    ///
    /// # Errors
    ///
    /// Propagates data-integrity faults from decryption.
    pub fn masked(card: &Card, cipher: &dyn PayloadCipher) -> Result<String, CardError> {
        Ok(mask_pan(&Self::reveal_number(card, cipher)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::AesGcmCipher;
    use rust_decimal_macros::dec;

    fn cipher() -> AesGcmCipher {
        AesGcmCipher::new([7u8; 32])
    }

    fn valid_input() -> NewCard {
        NewCard::new("everyday", "4111222233334444", "123", "09/28", dec!(5000))
    }

    #[test]
    fn test_register_seals_sensitive_fields() {
        let cipher = cipher();
        let card = CardRegistry::register(&valid_input(), "NID-1", &cipher).unwrap();

        assert_eq!(card.owner_national_id, "NID-1");
        assert_ne!(card.sealed_number, b"4111222233334444");
        assert_eq!(
            CardRegistry::reveal_number(&card, &cipher).unwrap(),
            "4111222233334444"
        );
        assert_eq!(CardRegistry::reveal_cvv(&card, &cipher).unwrap(), "123");
    }

    #[test]
    fn test_register_rejects_bad_number() {
        let mut input = valid_input();
        input.number = "1234".into();
        assert!(matches!(
            CardRegistry::register(&input, "NID-1", &cipher()),
            Err(CardError::InvalidNumber)
        ));
    }

    #[test]
    fn test_register_rejects_bad_cvv() {
        let mut input = valid_input();
        input.cvv = "12345".into();
        assert!(matches!(
            CardRegistry::register(&input, "NID-1", &cipher()),
            Err(CardError::InvalidCvv)
        ));
    }

    #[test]
    fn test_register_rejects_bad_expiry() {
        let mut input = valid_input();
        input.expiry = "2028-09".into();
        assert!(matches!(
            CardRegistry::register(&input, "NID-1", &cipher()),
            Err(CardError::InvalidExpiry(_))
        ));
    }

    #[test]
    fn test_register_rejects_non_positive_limit() {
        let mut input = valid_input();
        input.daily_limit = dec!(0);
        assert!(matches!(
            CardRegistry::register(&input, "NID-1", &cipher()),
            Err(CardError::NonPositiveLimit)
        ));
    }

    #[test]
    fn test_masked_ends_with_last_four() {
        let cipher = cipher();
        let card = CardRegistry::register(&valid_input(), "NID-1", &cipher).unwrap();
        let masked = CardRegistry::masked(&card, &cipher).unwrap();
        assert_eq!(masked, "**** **** **** 4444");
        // Idempotent regardless of call count.
        assert_eq!(masked, CardRegistry::masked(&card, &cipher).unwrap());
    }

    #[test]
    fn test_wrong_key_is_a_data_integrity_fault() {
        let card = CardRegistry::register(&valid_input(), "NID-1", &cipher()).unwrap();
        let other = AesGcmCipher::new([9u8; 32]);
        assert!(matches!(
            CardRegistry::reveal_number(&card, &other),
            Err(CardError::Cipher(_))
        ));
    }
}
