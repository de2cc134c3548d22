//! Cryptographic seams.
//!
//! Two pluggable primitives live here:
//! - the one-way credential hasher used for login passwords
//! - the symmetric cipher protecting stored card numbers and CVVs
//!
//! Neither the registry nor the engine ever sees primitive internals;
//! both depend on the traits only.

mod cipher;
mod password;

pub use cipher::{AesGcmCipher, CipherError, PayloadCipher};
pub use password::{Argon2Hasher, CredentialHasher, PasswordError};
