//! Card records, validation, masking, and auth policies.
//!
//! This module implements the card registry:
//! - Field validation at construction (PAN, CVV, expiry)
//! - Sealed-at-rest card numbers and CVVs
//! - Masking and expiry rules
//! - Per-card daily limits and auth policies

pub mod error;
pub mod registry;
pub mod types;
pub mod validation;

pub use error::CardError;
pub use registry::CardRegistry;
pub use types::{AuthPolicy, Card, CardExpiry, NewCard};
pub use validation::mask_pan;
