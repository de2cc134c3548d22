//! External capability contracts.
//!
//! The engine never talks to hardware or remote services directly; it
//! consumes the small capability interfaces defined here, injected at
//! construction. Deterministic in-memory implementations live in
//! [`memory`] and double as test fixtures.

pub mod contract;
pub mod memory;

pub use contract::{
    DeviceError, DeviceResponse, DeviceStatus, GatewayError, GatewayVerification, OnlineGateway,
    PaymentDevice, Product, ProviderError, PurchaseProvider, PurchaseReceipt,
};
pub use memory::{InMemoryDevice, InMemoryGateway, InMemoryPurchaseProvider};

#[cfg(test)]
pub use contract::MockPaymentDevice;
