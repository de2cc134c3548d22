//! The identity aggregate.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tapguard_shared::types::{CardId, MobileNumber};

use super::error::IdentityError;
use crate::card::{Card, CardError};
use crate::risk::RiskState;

/// Per-card daily spend, reset at local-date rollover.
#[derive(Debug, Clone, Copy, Default)]
struct DailySpend {
    date: Option<NaiveDate>,
    total: Decimal,
}

impl DailySpend {
    fn spent_on(&self, date: NaiveDate) -> Decimal {
        if self.date == Some(date) {
            self.total
        } else {
            Decimal::ZERO
        }
    }

    fn add(&mut self, date: NaiveDate, amount: Decimal) {
        if self.date == Some(date) {
            self.total += amount;
        } else {
            self.date = Some(date);
            self.total = amount;
        }
    }
}

/// One wallet identity and everything it owns.
///
/// Mutating operations on an identity are serialized by the store's
/// per-identity lock; this type itself is plain data.
#[derive(Debug)]
pub struct Identity {
    /// Unique identity key.
    pub mobile_number: MobileNumber,
    /// National id, fixed at registration.
    pub national_id: String,
    /// Hashed login credential.
    pub password_hash: String,
    /// Owned cards, in registration order.
    pub cards: Vec<Card>,
    /// The card payments run against. `None` only while no cards exist.
    pub default_card_id: Option<CardId>,
    /// Accumulated risk signals.
    pub risk: RiskState,
    daily_spend: HashMap<CardId, DailySpend>,
}

impl Identity {
    /// Creates a fresh identity with no cards.
    #[must_use]
    pub fn new(mobile_number: MobileNumber, national_id: String, password_hash: String) -> Self {
        Self {
            mobile_number,
            national_id,
            password_hash,
            cards: Vec::new(),
            default_card_id: None,
            risk: RiskState::default(),
            daily_spend: HashMap::new(),
        }
    }

    /// Looks up a card by id.
    #[must_use]
    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    /// Looks up a card by id, mutably.
    pub fn card_mut(&mut self, id: CardId) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| c.id == id)
    }

    /// The current default card, if any.
    #[must_use]
    pub fn default_card(&self) -> Option<&Card> {
        self.default_card_id.and_then(|id| self.card(id))
    }

    /// Adds a card. The owner invariant is checked here; the first card
    /// automatically becomes the default.
    ///
    /// # Errors
    ///
    /// `CardError::OwnerMismatch` if the card was registered against a
    /// different national id.
    pub fn add_card(&mut self, card: Card) -> Result<CardId, IdentityError> {
        if card.owner_national_id != self.national_id {
            return Err(CardError::OwnerMismatch.into());
        }
        let id = card.id;
        self.cards.push(card);
        if self.default_card_id.is_none() {
            self.default_card_id = Some(id);
        }
        Ok(id)
    }

    /// Removes a card.
    ///
    /// # Errors
    ///
    /// `CardError::CannotRemoveDefault` for the current default card;
    /// `CardError::NotFound` for an unknown id.
    pub fn remove_card(&mut self, id: CardId) -> Result<(), IdentityError> {
        if self.default_card_id == Some(id) {
            return Err(CardError::CannotRemoveDefault.into());
        }
        let before = self.cards.len();
        self.cards.retain(|c| c.id != id);
        if self.cards.len() == before {
            return Err(CardError::NotFound(id).into());
        }
        self.daily_spend.remove(&id);
        Ok(())
    }

    /// Marks a card as the default.
    ///
    /// # Errors
    ///
    /// `CardError::NotFound` for an unknown id.
    pub fn set_default(&mut self, id: CardId) -> Result<(), IdentityError> {
        if self.card(id).is_none() {
            return Err(CardError::NotFound(id).into());
        }
        self.default_card_id = Some(id);
        Ok(())
    }

    /// Today's accumulated spend on a card.
    #[must_use]
    pub fn spent_on(&self, card_id: CardId, date: NaiveDate) -> Decimal {
        self.daily_spend
            .get(&card_id)
            .map_or(Decimal::ZERO, |s| s.spent_on(date))
    }

    /// Adds to a card's daily spend, rolling the accumulator over when
    /// the date changed.
    pub fn record_spend(&mut self, card_id: CardId, date: NaiveDate, amount: Decimal) {
        self.daily_spend.entry(card_id).or_default().add(date, amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CardRegistry, NewCard};
    use crate::crypto::AesGcmCipher;
    use rust_decimal_macros::dec;

    fn identity() -> Identity {
        Identity::new(
            MobileNumber::parse("09121234567").unwrap(),
            "NID-1".to_string(),
            "$argon2id$fake".to_string(),
        )
    }

    fn card(owner: &str) -> Card {
        let cipher = AesGcmCipher::new([3u8; 32]);
        CardRegistry::register(
            &NewCard::new("test", "4111222233334444", "123", "09/28", dec!(5000)),
            owner,
            &cipher,
        )
        .unwrap()
    }

    #[test]
    fn test_first_card_becomes_default() {
        let mut identity = identity();
        let id = identity.add_card(card("NID-1")).unwrap();
        assert_eq!(identity.default_card_id, Some(id));
    }

    #[test]
    fn test_owner_mismatch_rejected() {
        let mut identity = identity();
        assert!(matches!(
            identity.add_card(card("NID-OTHER")),
            Err(IdentityError::Card(CardError::OwnerMismatch))
        ));
    }

    #[test]
    fn test_remove_default_rejected_until_new_default() {
        let mut identity = identity();
        let first = identity.add_card(card("NID-1")).unwrap();
        let second = identity.add_card(card("NID-1")).unwrap();

        assert!(matches!(
            identity.remove_card(first),
            Err(IdentityError::Card(CardError::CannotRemoveDefault))
        ));

        identity.set_default(second).unwrap();
        assert!(identity.remove_card(first).is_ok());
        assert_eq!(identity.cards.len(), 1);
    }

    #[test]
    fn test_remove_unknown_card() {
        let mut identity = identity();
        assert!(matches!(
            identity.remove_card(CardId::new()),
            Err(IdentityError::Card(CardError::NotFound(_)))
        ));
    }

    #[test]
    fn test_set_default_requires_known_card() {
        let mut identity = identity();
        assert!(matches!(
            identity.set_default(CardId::new()),
            Err(IdentityError::Card(CardError::NotFound(_)))
        ));
    }

    #[test]
    fn test_daily_spend_accumulates_within_day() {
        let mut identity = identity();
        let id = identity.add_card(card("NID-1")).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();

        identity.record_spend(id, day, dec!(100));
        identity.record_spend(id, day, dec!(50));
        assert_eq!(identity.spent_on(id, day), dec!(150));
    }

    #[test]
    fn test_daily_spend_resets_at_rollover() {
        let mut identity = identity();
        let id = identity.add_card(card("NID-1")).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        let next = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();

        identity.record_spend(id, day, dec!(4999));
        assert_eq!(identity.spent_on(id, next), Decimal::ZERO);

        identity.record_spend(id, next, dec!(10));
        assert_eq!(identity.spent_on(id, next), dec!(10));
    }
}
