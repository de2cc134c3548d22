//! Credential hashing behind a pluggable seam.
//!
//! The default implementation is Argon2id with secure defaults. The store
//! and engine depend on [`CredentialHasher`] only, so the primitive can be
//! swapped without touching authorization logic.

use argon2::{
    Argon2, PasswordHash,
    password_hash::{PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

/// Errors that can occur during credential operations.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Failed to hash the password.
    #[error("failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify the password.
    #[error("failed to verify password: {0}")]
    VerifyError(String),

    /// The stored hash is not in a recognized format.
    #[error("invalid password hash format")]
    InvalidHash,
}

/// One-way hash used for login credentials.
pub trait CredentialHasher: Send + Sync {
    /// Hashes a plaintext password for storage.
    fn hash(&self, password: &str) -> Result<String, PasswordError>;

    /// Verifies a plaintext password against a stored hash.
    ///
    /// Returns `Ok(false)` for a well-formed hash that does not match.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError>;
}

/// Argon2id implementation of [`CredentialHasher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::HashError(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;

        let argon2 = Argon2::default();

        match argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerifyError(e.to_string())),
        }
    }
}
