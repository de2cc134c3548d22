//! Card-payload encryption.
//!
//! Stored card numbers and CVVs are kept as AEAD ciphertext only and
//! decrypted on demand. The cipher is a seam: the registry and token
//! minter depend on [`PayloadCipher`], and the default implementation is
//! AES-256-GCM with random 96-bit nonces.
//!
//! ## Wire format
//!
//! `seal()` returns `nonce || ciphertext` as a single `Vec<u8>`. The first
//! 12 bytes are the nonce, the rest is the ciphertext plus the 16-byte GCM
//! authentication tag. `open()` expects the same format.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use rand::RngCore;
use thiserror::Error;

/// AES-256 key length in bytes.
pub const KEY_LENGTH: usize = 32;

/// GCM nonce length in bytes.
pub const NONCE_LENGTH: usize = 12;

/// Errors that can occur during payload encryption.
///
/// Messages are intentionally vague: the difference between a wrong key
/// and a corrupted ciphertext is not distinguishable to callers.
#[derive(Debug, Error)]
pub enum CipherError {
    /// Sealing the payload failed.
    #[error("failed to seal payload")]
    SealFailed,

    /// Opening the payload failed (wrong key or corrupted ciphertext).
    #[error("failed to open payload: wrong key or corrupted ciphertext")]
    OpenFailed,

    /// The configured key has the wrong length.
    #[error("invalid key length: expected {KEY_LENGTH} bytes")]
    InvalidKeyLength,

    /// The configured key is not valid hex.
    #[error("invalid key encoding: expected hex")]
    InvalidKeyEncoding,

    /// The sealed payload is too short to contain a nonce.
    #[error("sealed payload too short: must be at least {NONCE_LENGTH} bytes")]
    SealedTooShort,
}

/// Symmetric cipher protecting card payloads at rest and in transit.
///
/// Implementations must be authenticated ciphers: `open` has to fail on
/// any tampering, never return garbage.
pub trait PayloadCipher: Send + Sync {
    /// Encrypts a payload, returning the self-contained sealed bytes.
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError>;

    /// Decrypts a payload previously produced by [`PayloadCipher::seal`].
    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, CipherError>;
}

/// AES-256-GCM implementation of [`PayloadCipher`].
#[derive(Clone)]
pub struct AesGcmCipher {
    key: [u8; KEY_LENGTH],
}

impl std::fmt::Debug for AesGcmCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmCipher")
            .field("key", &"[hidden]")
            .finish()
    }
}

impl AesGcmCipher {
    /// Creates a cipher from raw key bytes.
    #[must_use]
    pub const fn new(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Creates a cipher from a hex-encoded 256-bit key.
    ///
    /// # Errors
    ///
    /// Fails if the string is not hex or does not decode to 32 bytes.
    pub fn from_hex(key_hex: &str) -> Result<Self, CipherError> {
        let bytes = hex::decode(key_hex).map_err(|_| CipherError::InvalidKeyEncoding)?;
        let key: [u8; KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| CipherError::InvalidKeyLength)?;
        Ok(Self::new(key))
    }
}

impl PayloadCipher for AesGcmCipher {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| CipherError::SealFailed)?;

        // Random 96-bit nonce per sealing. GCM is unforgiving about nonce
        // reuse, so every call draws fresh bytes from the OS CSPRNG.
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CipherError::SealFailed)?;

        let mut out = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, CipherError> {
        if sealed.len() < NONCE_LENGTH {
            return Err(CipherError::SealedTooShort);
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LENGTH);
        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| CipherError::OpenFailed)?;
        let nonce = Nonce::from_slice(nonce_bytes);

        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CipherError::OpenFailed)
    }
}
