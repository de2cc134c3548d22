//! Property-based tests for the risk engine.
//!
//! - The score is monotone in the incident count.
//! - Adding the velocity factor never lowers a score.
//! - Scores are deterministic for identical inputs.

use chrono::{Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::engine::RiskEngine;
use super::types::RiskState;

fn engine() -> RiskEngine {
    RiskEngine::new(10, 70, 5)
}

/// Strategy for amounts between 0.01 and 5,000.00.
fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..500_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    #[test]
    fn score_is_monotone_in_incidents(
        amount in amount(),
        incidents in 0u32..100,
    ) {
        let now = Utc::now();
        let mut low = RiskState::default();
        low.incident_count = incidents;
        let mut high = RiskState::default();
        high.incident_count = incidents + 1;

        let engine = engine();
        prop_assert!(
            engine.score(amount, "geo-a", &low, now)
                < engine.score(amount, "geo-a", &high, now)
        );
    }

    #[test]
    fn velocity_never_lowers_score(
        amount in amount(),
        incidents in 0u32..100,
        minutes_ago in 0i64..10,
    ) {
        let now = Utc::now();
        let mut calm = RiskState::default();
        calm.incident_count = incidents;

        let mut moving = calm.clone();
        moving.record_success("geo-a", now - Duration::minutes(minutes_ago));

        let engine = engine();
        prop_assert!(
            engine.score(amount, "geo-b", &moving, now)
                >= engine.score(amount, "geo-b", &calm, now)
        );
    }

    #[test]
    fn score_is_deterministic(amount in amount(), incidents in 0u32..50) {
        let now = Utc::now();
        let mut state = RiskState::default();
        state.incident_count = incidents;

        let engine = engine();
        prop_assert_eq!(
            engine.score(amount, "geo-a", &state, now),
            engine.score(amount, "geo-a", &state, now)
        );
    }
}
