//! The identity repository.
//!
//! Maps mobile numbers to identity aggregates. Each aggregate sits behind
//! its own async mutex so that one in-flight authorization per identity is
//! enforced while different identities proceed in parallel.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tapguard_shared::types::MobileNumber;
use tokio::sync::Mutex;

use super::error::IdentityError;
use super::types::Identity;
use crate::crypto::CredentialHasher;

/// In-memory identity repository.
pub struct IdentityStore {
    identities: DashMap<MobileNumber, Arc<Mutex<Identity>>>,
    hasher: Arc<dyn CredentialHasher>,
}

impl IdentityStore {
    /// Creates an empty store using the given credential hasher.
    #[must_use]
    pub fn new(hasher: Arc<dyn CredentialHasher>) -> Self {
        Self {
            identities: DashMap::new(),
            hasher,
        }
    }

    /// Registers a new identity.
    ///
    /// # Errors
    ///
    /// `IdentityError::AlreadyRegistered` for a duplicate mobile number;
    /// hashing failures propagate.
    pub fn register(
        &self,
        mobile_number: MobileNumber,
        national_id: &str,
        password: &str,
    ) -> Result<(), IdentityError> {
        let password_hash = self.hasher.hash(password)?;

        match self.identities.entry(mobile_number.clone()) {
            Entry::Occupied(_) => Err(IdentityError::AlreadyRegistered(mobile_number)),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Mutex::new(Identity::new(
                    mobile_number,
                    national_id.to_string(),
                    password_hash,
                ))));
                Ok(())
            }
        }
    }

    /// Inserts a pre-built identity (snapshot import path).
    ///
    /// # Errors
    ///
    /// `IdentityError::AlreadyRegistered` for a duplicate mobile number.
    pub fn insert(&self, identity: Identity) -> Result<(), IdentityError> {
        match self.identities.entry(identity.mobile_number.clone()) {
            Entry::Occupied(_) => Err(IdentityError::AlreadyRegistered(identity.mobile_number)),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Mutex::new(identity)));
                Ok(())
            }
        }
    }

    /// Resolves the aggregate for a mobile number.
    ///
    /// The returned handle is the identity's serialization point: callers
    /// lock it for the whole mutating sequence.
    ///
    /// # Errors
    ///
    /// `IdentityError::NotFound` for an unknown key.
    pub fn get(&self, key: &MobileNumber) -> Result<Arc<Mutex<Identity>>, IdentityError> {
        self.identities
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| IdentityError::NotFound(key.clone()))
    }

    /// Verifies a password against an identity's stored hash.
    ///
    /// # Errors
    ///
    /// `IdentityError::PasswordMismatch` when the password is wrong;
    /// malformed stored hashes propagate as `Password` errors.
    pub fn verify_password(
        &self,
        identity: &Identity,
        password: &str,
    ) -> Result<(), IdentityError> {
        if self.hasher.verify(password, &identity.password_hash)? {
            Ok(())
        } else {
            Err(IdentityError::PasswordMismatch)
        }
    }

    /// Re-hashes and stores a new password for an identity.
    ///
    /// # Errors
    ///
    /// Hashing failures propagate.
    pub fn change_password(
        &self,
        identity: &mut Identity,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        identity.password_hash = self.hasher.hash(new_password)?;
        Ok(())
    }

    /// Returns true if an identity exists for the key.
    #[must_use]
    pub fn contains(&self, key: &MobileNumber) -> bool {
        self.identities.contains_key(key)
    }
}
