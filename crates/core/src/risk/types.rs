//! Per-identity risk counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Risk signals accumulated per identity.
///
/// Mutated only by the authorization engine after each attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskState {
    /// Geo hash of the last successful transaction.
    pub last_geo_hash: Option<String>,
    /// Time of the last successful transaction.
    pub last_transaction_at: Option<DateTime<Utc>>,
    /// Count of risky, non-successful transaction attempts.
    pub incident_count: u32,
}

impl RiskState {
    /// Records a successful transaction's location and time.
    pub fn record_success(&mut self, geo_hash: &str, at: DateTime<Utc>) {
        self.last_geo_hash = Some(geo_hash.to_string());
        self.last_transaction_at = Some(at);
    }

    /// Records a risky non-success.
    pub fn record_incident(&mut self) {
        self.incident_count += 1;
    }
}
