//! Short-lived payment tokens.
//!
//! A token is a one-shot capability minted per transaction attempt and
//! handed to the device contract. It bundles the sealed card payload with
//! an expiry and a keyed digest; it is never persisted. The device side
//! verifies the digest and expiry before moving funds.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use tapguard_shared::types::{CardId, TokenId};
use thiserror::Error;

use crate::card::Card;
use crate::crypto::{CipherError, PayloadCipher};

/// Errors that can occur during token operations.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token's lifetime has elapsed.
    #[error("Payment token expired")]
    Expired,

    /// The token's signature does not verify.
    #[error("Payment token signature invalid")]
    InvalidSignature,

    /// Sealing or opening the card payload failed.
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

impl TokenError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Expired => "TOKEN_EXPIRED",
            Self::InvalidSignature => "TOKEN_INVALID_SIGNATURE",
            Self::Cipher(_) => "TOKEN_PAYLOAD_ERROR",
        }
    }
}

/// An ephemeral payment capability.
#[derive(Debug, Clone)]
pub struct PaymentToken {
    /// Token id, fresh per attempt.
    pub id: TokenId,
    /// The card this token authorizes.
    pub card_id: CardId,
    /// Sealed `number:cvv` payload for the device side.
    pub sealed_payload: Vec<u8>,
    /// Hard expiry of the capability.
    pub expires_at: DateTime<Utc>,
    /// Hex-encoded keyed digest over card id, expiry, and payload.
    pub signature: String,
}

/// Mints and verifies payment tokens.
pub struct TokenService {
    cipher: Arc<dyn PayloadCipher>,
    signing_key: [u8; 32],
    ttl: Duration,
}

impl TokenService {
    /// Creates a service with the given cipher, signing key, and TTL.
    #[must_use]
    pub fn new(cipher: Arc<dyn PayloadCipher>, signing_key: [u8; 32], ttl_minutes: i64) -> Self {
        Self {
            cipher,
            signing_key,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Mints a fresh token for a card.
    ///
    /// The stored card number and CVV are opened on demand and re-sealed
    /// into a single transaction payload.
    ///
    /// # Errors
    ///
    /// A failure to open the stored cipher text is a data-integrity fault
    /// and propagates as `TokenError::Cipher`.
    pub fn mint(&self, card: &Card, now: DateTime<Utc>) -> Result<PaymentToken, TokenError> {
        let number = self.cipher.open(&card.sealed_number)?;
        let cvv = self.cipher.open(&card.sealed_cvv)?;

        let mut payload = Vec::with_capacity(number.len() + cvv.len() + 1);
        payload.extend_from_slice(&number);
        payload.push(b':');
        payload.extend_from_slice(&cvv);

        let sealed_payload = self.cipher.seal(&payload)?;
        let expires_at = now + self.ttl;
        let signature = self.sign(card.id, expires_at, &sealed_payload);

        Ok(PaymentToken {
            id: TokenId::new(),
            card_id: card.id,
            sealed_payload,
            expires_at,
            signature,
        })
    }

    /// Verifies a token's signature and expiry (the device-side check).
    ///
    /// # Errors
    ///
    /// `TokenError::InvalidSignature` on any mismatch,
    /// `TokenError::Expired` past the token's lifetime.
    pub fn verify(&self, token: &PaymentToken, now: DateTime<Utc>) -> Result<(), TokenError> {
        let expected = self.sign(token.card_id, token.expires_at, &token.sealed_payload);
        if expected != token.signature {
            return Err(TokenError::InvalidSignature);
        }
        if now > token.expires_at {
            return Err(TokenError::Expired);
        }
        Ok(())
    }

    /// Opens a verified token's payload (device side).
    ///
    /// # Errors
    ///
    /// Propagates cipher faults.
    pub fn open_payload(&self, token: &PaymentToken) -> Result<Vec<u8>, TokenError> {
        Ok(self.cipher.open(&token.sealed_payload)?)
    }

    fn sign(&self, card_id: CardId, expires_at: DateTime<Utc>, sealed: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.signing_key);
        hasher.update(card_id.into_inner().as_bytes());
        hasher.update(expires_at.timestamp_millis().to_be_bytes());
        hasher.update(sealed);
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CardRegistry, NewCard};
    use crate::crypto::AesGcmCipher;
    use rust_decimal_macros::dec;

    fn service() -> TokenService {
        TokenService::new(Arc::new(AesGcmCipher::new([1u8; 32])), [2u8; 32], 5)
    }

    fn card() -> Card {
        let cipher = AesGcmCipher::new([1u8; 32]);
        CardRegistry::register(
            &NewCard::new("test", "4111222233334444", "123", "09/28", dec!(5000)),
            "NID-1",
            &cipher,
        )
        .unwrap()
    }

    #[test]
    fn test_mint_and_verify() {
        let svc = service();
        let now = Utc::now();
        let token = svc.mint(&card(), now).unwrap();

        assert!(svc.verify(&token, now).is_ok());
        assert_eq!(token.expires_at, now + Duration::minutes(5));
    }

    #[test]
    fn test_payload_carries_number_and_cvv() {
        let svc = service();
        let token = svc.mint(&card(), Utc::now()).unwrap();
        let payload = svc.open_payload(&token).unwrap();
        assert_eq!(payload, b"4111222233334444:123");
    }

    #[test]
    fn test_expired_token_rejected() {
        let svc = service();
        let now = Utc::now();
        let token = svc.mint(&card(), now).unwrap();

        assert!(matches!(
            svc.verify(&token, now + Duration::minutes(6)),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_tampered_expiry_rejected() {
        let svc = service();
        let now = Utc::now();
        let mut token = svc.mint(&card(), now).unwrap();
        token.expires_at = token.expires_at + Duration::hours(1);

        assert!(matches!(
            svc.verify(&token, now),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let svc = service();
        let now = Utc::now();
        let mut token = svc.mint(&card(), now).unwrap();
        token.sealed_payload[0] ^= 0xFF;

        assert!(matches!(
            svc.verify(&token, now),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_foreign_key_signature_rejected() {
        let svc = service();
        let other = TokenService::new(Arc::new(AesGcmCipher::new([1u8; 32])), [9u8; 32], 5);
        let now = Utc::now();
        let token = svc.mint(&card(), now).unwrap();

        assert!(matches!(
            other.verify(&token, now),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_tokens_are_single_purpose() {
        // Two mints for the same card produce distinct ids and payload
        // cipher text (fresh nonce per seal).
        let svc = service();
        let now = Utc::now();
        let card = card();
        let a = svc.mint(&card, now).unwrap();
        let b = svc.mint(&card, now).unwrap();

        assert_ne!(a.id, b.id);
        assert_ne!(a.sealed_payload, b.sealed_payload);
    }
}
