//! Passcode issuance, expiry, and attempt limiting.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rand::Rng;
use tapguard_shared::types::MobileNumber;

use super::error::OtpError;

/// Smallest issuable 6-digit code.
const CODE_MIN: u32 = 100_000;

/// Largest issuable 6-digit code.
const CODE_MAX: u32 = 999_999;

#[derive(Debug, Clone, Copy)]
struct OtpEntry {
    code: u32,
    expires_at: DateTime<Utc>,
    attempts: u32,
}

/// Issues and validates one-time passcodes, one outstanding per identity.
pub struct OtpService {
    entries: DashMap<MobileNumber, OtpEntry>,
    ttl: Duration,
    max_attempts: u32,
}

impl OtpService {
    /// Creates a service with the given code TTL and attempt cap.
    #[must_use]
    pub fn new(ttl_minutes: i64, max_attempts: u32) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::minutes(ttl_minutes),
            max_attempts,
        }
    }

    /// Issues a fresh 6-digit code for an identity.
    ///
    /// Any previously outstanding code is invalidated and the attempt
    /// counter starts over.
    pub fn issue(&self, key: &MobileNumber) -> u32 {
        self.issue_at(key, Utc::now())
    }

    fn issue_at(&self, key: &MobileNumber, now: DateTime<Utc>) -> u32 {
        let code = rand::thread_rng().gen_range(CODE_MIN..=CODE_MAX);
        self.entries.insert(
            key.clone(),
            OtpEntry {
                code,
                expires_at: now + self.ttl,
                attempts: 0,
            },
        );
        code
    }

    /// Validates a submitted code.
    ///
    /// The attempt counter is checked before expiry, so exhaustion binds
    /// even when the outstanding code has already expired. A wrong or
    /// expired code burns an attempt and returns `false`; a correct,
    /// unexpired code purges the entry and returns `true`.
    ///
    /// # Errors
    ///
    /// `OtpError::TooManyAttempts` once the counter has reached the cap
    /// (the entry is purged); `OtpError::CodeNotIssued` when no code is
    /// outstanding.
    pub fn validate(&self, key: &MobileNumber, code: u32) -> Result<bool, OtpError> {
        self.validate_at(key, code, Utc::now())
    }

    fn validate_at(
        &self,
        key: &MobileNumber,
        code: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, OtpError> {
        // The entry API holds the shard lock for the whole
        // read-modify-write, keeping validation atomic per identity.
        match self.entries.entry(key.clone()) {
            Entry::Vacant(_) => Err(OtpError::CodeNotIssued),
            Entry::Occupied(mut occupied) => {
                let entry = *occupied.get();

                if entry.attempts >= self.max_attempts {
                    occupied.remove();
                    return Err(OtpError::TooManyAttempts);
                }

                if now > entry.expires_at || entry.code != code {
                    occupied.get_mut().attempts += 1;
                    return Ok(false);
                }

                occupied.remove();
                Ok(true)
            }
        }
    }

    /// Returns true if a code is outstanding for the identity.
    #[must_use]
    pub fn has_outstanding(&self, key: &MobileNumber) -> bool {
        self.entries.contains_key(key)
    }
}
