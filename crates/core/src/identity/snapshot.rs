//! Identity snapshot import/export.
//!
//! Snapshots are the only persistence surface: cipher text only, never
//! plaintext card data. Sessions, OTP entries, and daily-spend counters
//! are transient and deliberately excluded.

use serde::{Deserialize, Serialize};
use tapguard_shared::types::{CardId, MobileNumber};
use thiserror::Error;

use super::error::IdentityError;
use super::store::IdentityStore;
use super::types::Identity;
use crate::card::{AuthPolicy, Card, CardError, CardExpiry};

/// Errors that can occur during snapshot import/export.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A snapshot with cards must name a default card.
    #[error("Snapshot has cards but no default card id")]
    MissingDefaultCard,

    /// The named default card is not among the snapshot's cards.
    #[error("Default card {0} is not among the snapshot's cards")]
    UnknownDefaultCard(CardId),

    /// A sealed field is not valid hex.
    #[error("Sealed field is not valid hex")]
    BadSealedEncoding,

    /// JSON encoding or decoding failed.
    #[error("Snapshot serialization failed: {0}")]
    Json(String),

    /// A card field failed validation.
    #[error(transparent)]
    Card(#[from] CardError),

    /// The underlying identity operation failed.
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// One exported card; sensitive fields stay sealed, hex-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSnapshot {
    /// Card id.
    pub card_id: CardId,
    /// Human-readable alias.
    pub alias: String,
    /// Hex-encoded sealed card number.
    pub sealed_number_hex: String,
    /// Hex-encoded sealed CVV.
    pub sealed_cvv_hex: String,
    /// Expiry in `MM/YY` form.
    pub expiry: String,
    /// Owning identity's national id.
    pub owner_national_id: String,
    /// Daily spend limit.
    pub daily_limit: rust_decimal::Decimal,
    /// Auth policy.
    pub auth_policy: AuthPolicy,
    /// Suspension flag.
    pub suspended: bool,
}

/// One exported identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    /// Identity key.
    pub mobile_number: MobileNumber,
    /// National id.
    pub national_id: String,
    /// Stored credential hash (already one-way).
    pub password_hash: String,
    /// The default card id, when cards exist.
    pub default_card_id: Option<CardId>,
    /// Owned cards, cipher text only.
    pub cards: Vec<CardSnapshot>,
}

impl IdentitySnapshot {
    /// Serializes the snapshot to JSON.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Json` when encoding fails.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(|e| SnapshotError::Json(e.to_string()))
    }

    /// Deserializes a snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Json` when decoding fails.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(json).map_err(|e| SnapshotError::Json(e.to_string()))
    }
}

/// Exports an identity's durable state.
///
/// # Errors
///
/// `IdentityError::NotFound` for an unknown key.
pub async fn export_identity(
    store: &IdentityStore,
    key: &MobileNumber,
) -> Result<IdentitySnapshot, SnapshotError> {
    let handle = store.get(key)?;
    let identity = handle.lock().await;

    Ok(IdentitySnapshot {
        mobile_number: identity.mobile_number.clone(),
        national_id: identity.national_id.clone(),
        password_hash: identity.password_hash.clone(),
        default_card_id: identity.default_card_id,
        cards: identity
            .cards
            .iter()
            .map(|card| CardSnapshot {
                card_id: card.id,
                alias: card.alias.clone(),
                sealed_number_hex: hex::encode(&card.sealed_number),
                sealed_cvv_hex: hex::encode(&card.sealed_cvv),
                expiry: card.expiry.to_string(),
                owner_national_id: card.owner_national_id.clone(),
                daily_limit: card.daily_limit,
                auth_policy: card.auth_policy,
                suspended: card.suspended,
            })
            .collect(),
    })
}

/// Imports an identity snapshot into the store.
///
/// # Errors
///
/// Rejects snapshots whose default card id is missing or not among the
/// included cards, malformed sealed fields, and duplicate identities.
pub fn import_identity(
    store: &IdentityStore,
    snapshot: IdentitySnapshot,
) -> Result<(), SnapshotError> {
    match snapshot.default_card_id {
        None if !snapshot.cards.is_empty() => return Err(SnapshotError::MissingDefaultCard),
        Some(id) if !snapshot.cards.iter().any(|c| c.card_id == id) => {
            return Err(SnapshotError::UnknownDefaultCard(id));
        }
        _ => {}
    }

    let mut identity = Identity::new(
        snapshot.mobile_number,
        snapshot.national_id,
        snapshot.password_hash,
    );

    for card in snapshot.cards {
        let restored = Card {
            id: card.card_id,
            alias: card.alias,
            sealed_number: hex::decode(&card.sealed_number_hex)
                .map_err(|_| SnapshotError::BadSealedEncoding)?,
            sealed_cvv: hex::decode(&card.sealed_cvv_hex)
                .map_err(|_| SnapshotError::BadSealedEncoding)?,
            expiry: CardExpiry::parse(&card.expiry)?,
            owner_national_id: card.owner_national_id,
            daily_limit: card.daily_limit,
            auth_policy: card.auth_policy,
            suspended: card.suspended,
            auto_escalated: false,
        };
        identity.cards.push(restored);
    }
    identity.default_card_id = snapshot.default_card_id;

    store.insert(identity)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CardRegistry, NewCard};
    use crate::crypto::{AesGcmCipher, Argon2Hasher};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn key() -> MobileNumber {
        MobileNumber::parse("09121234567").unwrap()
    }

    fn store_with_card() -> IdentityStore {
        let store = IdentityStore::new(Arc::new(Argon2Hasher));
        store.register(key(), "NID-1", "hunter2!").unwrap();

        let cipher = AesGcmCipher::new([5u8; 32]);
        let card = CardRegistry::register(
            &NewCard::new("everyday", "4111222233334444", "123", "09/28", dec!(5000)),
            "NID-1",
            &cipher,
        )
        .unwrap();

        let handle = store.get(&key()).unwrap();
        handle.try_lock().unwrap().add_card(card).unwrap();
        store
    }

    #[tokio::test]
    async fn test_export_import_roundtrip() {
        let store = store_with_card();
        let snapshot = export_identity(&store, &key()).await.unwrap();

        assert_eq!(snapshot.cards.len(), 1);
        assert!(snapshot.default_card_id.is_some());

        let restored_store = IdentityStore::new(Arc::new(Argon2Hasher));
        import_identity(&restored_store, snapshot.clone()).unwrap();

        let restored = export_identity(&restored_store, &key()).await.unwrap();
        assert_eq!(restored.national_id, snapshot.national_id);
        assert_eq!(restored.default_card_id, snapshot.default_card_id);
        assert_eq!(
            restored.cards[0].sealed_number_hex,
            snapshot.cards[0].sealed_number_hex
        );
    }

    #[tokio::test]
    async fn test_json_roundtrip() {
        let store = store_with_card();
        let snapshot = export_identity(&store, &key()).await.unwrap();

        let json = snapshot.to_json().unwrap();
        let parsed = IdentitySnapshot::from_json(&json).unwrap();
        assert_eq!(parsed.mobile_number, snapshot.mobile_number);
        assert_eq!(parsed.cards.len(), 1);
    }

    #[tokio::test]
    async fn test_import_rejects_unknown_default() {
        let store = store_with_card();
        let mut snapshot = export_identity(&store, &key()).await.unwrap();
        snapshot.default_card_id = Some(CardId::new());

        let fresh = IdentityStore::new(Arc::new(Argon2Hasher));
        assert!(matches!(
            import_identity(&fresh, snapshot),
            Err(SnapshotError::UnknownDefaultCard(_))
        ));
    }

    #[tokio::test]
    async fn test_import_rejects_missing_default() {
        let store = store_with_card();
        let mut snapshot = export_identity(&store, &key()).await.unwrap();
        snapshot.default_card_id = None;

        let fresh = IdentityStore::new(Arc::new(Argon2Hasher));
        assert!(matches!(
            import_identity(&fresh, snapshot),
            Err(SnapshotError::MissingDefaultCard)
        ));
    }

    #[tokio::test]
    async fn test_import_rejects_duplicate_identity() {
        let store = store_with_card();
        let snapshot = export_identity(&store, &key()).await.unwrap();

        assert!(matches!(
            import_identity(&store, snapshot),
            Err(SnapshotError::Identity(IdentityError::AlreadyRegistered(_)))
        ));
    }

    #[test]
    fn test_import_empty_identity_without_default() {
        let fresh = IdentityStore::new(Arc::new(Argon2Hasher));
        let snapshot = IdentitySnapshot {
            mobile_number: key(),
            national_id: "NID-1".to_string(),
            password_hash: "$argon2id$fake".to_string(),
            default_card_id: None,
            cards: vec![],
        };
        assert!(import_identity(&fresh, snapshot).is_ok());
    }
}
