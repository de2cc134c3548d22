//! The append-only record store.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tapguard_shared::types::CardId;
use tapguard_shared::types::pagination::{PageRequest, PageResponse};

use super::types::TransactionRecord;

/// Append-only transaction ledger.
///
/// The one cross-identity shared structure in the engine. Appends take the
/// write lock briefly; queries clone matching records so callers never
/// hold the lock. Only per-identity chronological order is guaranteed.
#[derive(Default)]
pub struct TransactionLedger {
    records: RwLock<Vec<TransactionRecord>>,
}

impl TransactionLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record. O(1); existing entries are never mutated.
    pub fn append(&self, record: TransactionRecord) {
        self.records
            .write()
            .expect("ledger lock poisoned")
            .push(record);
    }

    /// Number of records in the ledger.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().expect("ledger lock poisoned").len()
    }

    /// Returns true when no records have been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records for the given cards, newest first.
    #[must_use]
    pub fn query_by_identity(&self, card_ids: &[CardId]) -> Vec<TransactionRecord> {
        let records = self.records.read().expect("ledger lock poisoned");
        let mut matched: Vec<TransactionRecord> = records
            .iter()
            .filter(|r| card_ids.contains(&r.card_id))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matched
    }

    /// Records for the given cards inside `[start, end]` (inclusive both
    /// ends), newest first.
    #[must_use]
    pub fn query_by_date_range(
        &self,
        card_ids: &[CardId],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<TransactionRecord> {
        let records = self.records.read().expect("ledger lock poisoned");
        let mut matched: Vec<TransactionRecord> = records
            .iter()
            .filter(|r| {
                card_ids.contains(&r.card_id) && r.timestamp >= start && r.timestamp <= end
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matched
    }

    /// Paginated identity query for list surfaces.
    #[must_use]
    pub fn query_page(
        &self,
        card_ids: &[CardId],
        page: &PageRequest,
    ) -> PageResponse<TransactionRecord> {
        let all = self.query_by_identity(card_ids);
        let total = all.len() as u64;
        let data: Vec<TransactionRecord> = all
            .into_iter()
            .skip(page.offset())
            .take(page.limit())
            .collect();
        PageResponse::new(data, page.page, page.per_page, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::TxStatus;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn record(card_id: CardId, at: DateTime<Utc>) -> TransactionRecord {
        TransactionRecord {
            timestamp: at,
            amount: dec!(10),
            status: TxStatus::Success,
            card_id,
            message: "ok".to_string(),
            fee_amount: dec!(0.1),
            security_flags: vec![],
            geo_hash: None,
            risk_score: 0,
        }
    }

    #[test]
    fn test_append_and_query() {
        let ledger = TransactionLedger::new();
        let card = CardId::new();
        let now = Utc::now();

        ledger.append(record(card, now - Duration::minutes(2)));
        ledger.append(record(card, now));
        ledger.append(record(CardId::new(), now));

        let mine = ledger.query_by_identity(&[card]);
        assert_eq!(mine.len(), 2);
        // Newest first.
        assert!(mine[0].timestamp > mine[1].timestamp);
    }

    #[test]
    fn test_query_excludes_other_cards() {
        let ledger = TransactionLedger::new();
        let mine = CardId::new();
        let theirs = CardId::new();
        ledger.append(record(theirs, Utc::now()));

        assert!(ledger.query_by_identity(&[mine]).is_empty());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_date_range_is_inclusive_both_ends() {
        let ledger = TransactionLedger::new();
        let card = CardId::new();
        let start = Utc::now();
        let end = start + Duration::hours(1);

        ledger.append(record(card, start));
        ledger.append(record(card, end));
        ledger.append(record(card, start - Duration::seconds(1)));
        ledger.append(record(card, end + Duration::seconds(1)));

        let matched = ledger.query_by_date_range(&[card], start, end);
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].timestamp, end);
        assert_eq!(matched[1].timestamp, start);
    }

    #[test]
    fn test_pagination() {
        let ledger = TransactionLedger::new();
        let card = CardId::new();
        let now = Utc::now();
        for i in 0..5 {
            ledger.append(record(card, now + Duration::seconds(i)));
        }

        let page = ledger.query_page(
            &[card],
            &PageRequest {
                page: 2,
                per_page: 2,
            },
        );
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.meta.total, 5);
        assert_eq!(page.meta.total_pages, 3);
    }

    #[test]
    fn test_concurrent_appends_are_not_lost() {
        use std::sync::Arc;

        let ledger = Arc::new(TransactionLedger::new());
        let card = CardId::new();
        let mut handles = Vec::new();

        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    ledger.append(record(card, Utc::now()));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.len(), 800);
    }
}
