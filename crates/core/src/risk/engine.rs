//! Additive risk scoring.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use super::types::RiskState;

/// Score contribution for amounts above the medium tier.
const MEDIUM_AMOUNT_SCORE: u32 = 30;

/// Additional contribution for amounts above the large tier (cumulative
/// with the medium contribution).
const LARGE_AMOUNT_SCORE: u32 = 40;

/// Contribution when the geo-velocity heuristic trips.
const VELOCITY_SCORE: u32 = 50;

/// Contribution per accumulated security incident.
const INCIDENT_SCORE: u32 = 10;

/// Medium amount tier boundary.
fn medium_amount_tier() -> Decimal {
    Decimal::from(500)
}

/// Large amount tier boundary.
fn large_amount_tier() -> Decimal {
    Decimal::from(1500)
}

/// Deterministic risk scorer.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    velocity_window: Duration,
    high_risk_threshold: u32,
    incident_lock_threshold: u32,
}

impl RiskEngine {
    /// Creates an engine with the given velocity window and thresholds.
    #[must_use]
    pub fn new(
        velocity_window_minutes: i64,
        high_risk_threshold: u32,
        incident_lock_threshold: u32,
    ) -> Self {
        Self {
            velocity_window: Duration::minutes(velocity_window_minutes),
            high_risk_threshold,
            incident_lock_threshold,
        }
    }

    /// Computes the risk score for an attempt.
    ///
    /// Additive model, no upper clamp:
    /// - +30 for amounts over 500, +40 more over 1500
    /// - +50 when the velocity heuristic trips
    /// - +10 per accumulated incident
    #[must_use]
    pub fn score(
        &self,
        amount: Decimal,
        geo_hash: &str,
        state: &RiskState,
        now: DateTime<Utc>,
    ) -> u32 {
        let mut score = 0;

        if amount > medium_amount_tier() {
            score += MEDIUM_AMOUNT_SCORE;
        }
        if amount > large_amount_tier() {
            score += LARGE_AMOUNT_SCORE;
        }
        if self.velocity_tripped(geo_hash, state, now) {
            score += VELOCITY_SCORE;
        }
        score += INCIDENT_SCORE * state.incident_count;

        score
    }

    /// Impossible-travel heuristic: a prior transaction exists, from a
    /// different geo hash, inside the velocity window.
    #[must_use]
    pub fn velocity_tripped(
        &self,
        geo_hash: &str,
        state: &RiskState,
        now: DateTime<Utc>,
    ) -> bool {
        match (&state.last_geo_hash, state.last_transaction_at) {
            (Some(last_geo), Some(last_at)) => {
                last_geo != geo_hash && now - last_at < self.velocity_window
            }
            _ => false,
        }
    }

    /// Returns true when a score calls for forced MFA.
    #[must_use]
    pub const fn is_high_risk(&self, score: u32) -> bool {
        score >= self.high_risk_threshold
    }

    /// Returns true once the identity's incident count reaches the
    /// lockout threshold.
    #[must_use]
    pub const fn is_locked(&self, state: &RiskState) -> bool {
        state.incident_count >= self.incident_lock_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn engine() -> RiskEngine {
        RiskEngine::new(10, 70, 5)
    }

    fn clean() -> RiskState {
        RiskState::default()
    }

    #[test]
    fn test_small_amount_scores_zero() {
        let now = Utc::now();
        assert_eq!(engine().score(dec!(500), "geo-a", &clean(), now), 0);
    }

    #[test]
    fn test_medium_amount_scores_thirty() {
        let now = Utc::now();
        assert_eq!(engine().score(dec!(500.01), "geo-a", &clean(), now), 30);
        assert_eq!(engine().score(dec!(1500), "geo-a", &clean(), now), 30);
    }

    #[test]
    fn test_large_amount_scores_seventy() {
        // Cumulative: both tiers contribute.
        let now = Utc::now();
        assert_eq!(engine().score(dec!(1500.01), "geo-a", &clean(), now), 70);
    }

    #[test]
    fn test_velocity_adds_fifty() {
        let now = Utc::now();
        let mut state = clean();
        state.record_success("geo-a", now - Duration::minutes(5));

        assert_eq!(engine().score(dec!(100), "geo-b", &state, now), 50);
    }

    #[test]
    fn test_same_geo_does_not_trip_velocity() {
        let now = Utc::now();
        let mut state = clean();
        state.record_success("geo-a", now - Duration::minutes(5));

        assert_eq!(engine().score(dec!(100), "geo-a", &state, now), 0);
    }

    #[test]
    fn test_velocity_window_boundary() {
        let now = Utc::now();
        let mut state = clean();
        state.record_success("geo-a", now - Duration::minutes(10));

        // Exactly at the window: elapsed is not strictly under it.
        assert!(!engine().velocity_tripped("geo-b", &state, now));
    }

    #[test]
    fn test_incidents_add_ten_each() {
        let now = Utc::now();
        let mut state = clean();
        state.incident_count = 3;

        assert_eq!(engine().score(dec!(100), "geo-a", &state, now), 30);
    }

    #[test]
    fn test_factors_accumulate_without_clamp() {
        let now = Utc::now();
        let mut state = clean();
        state.record_success("geo-a", now - Duration::minutes(1));
        state.incident_count = 10;

        // 70 (amount) + 50 (velocity) + 100 (incidents)
        assert_eq!(engine().score(dec!(2000), "geo-b", &state, now), 220);
    }

    #[test]
    fn test_high_risk_threshold() {
        let engine = engine();
        assert!(!engine.is_high_risk(69));
        assert!(engine.is_high_risk(70));
    }

    #[test]
    fn test_lockout_threshold() {
        let engine = engine();
        let mut state = clean();
        state.incident_count = 4;
        assert!(!engine.is_locked(&state));
        state.incident_count = 5;
        assert!(engine.is_locked(&state));
    }
}
