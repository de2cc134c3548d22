//! The payment/top-up authorization engine.
//!
//! This is the orchestrator: it drives the payment state machine across
//! the session manager, card registry, risk engine, OTP service, and the
//! external device/gateway/provider contracts, writing every terminal
//! outcome to the ledger.

pub mod engine;
pub mod error;
pub mod types;

#[cfg(test)]
mod engine_props;

pub use engine::AuthorizationEngine;
pub use error::AuthorizeError;
pub use types::{AuthorizationOutcome, PaymentRequest, TopUpRequest};
