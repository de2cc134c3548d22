//! Capability interfaces for the device, gateway, and purchase provider.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tapguard_shared::types::{CardId, ProductId};
use thiserror::Error;

use crate::token::{PaymentToken, TokenError};

/// Status reported by the contactless device.
///
/// Anything the engine does not recognize deserializes as `Unknown` and
/// must be treated as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    /// Funds moved.
    Approved,
    /// The card's balance cannot cover the amount.
    InsufficientFunds,
    /// Any status outside the known enumeration.
    #[serde(other)]
    Unknown,
}

/// Result of a device invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceResponse {
    /// Reported status.
    pub status: DeviceStatus,
    /// Device-side message.
    pub message: String,
    /// Amount the device acted on.
    pub amount: Decimal,
}

/// Communication-level device failures.
///
/// These are faults, not business declines: the engine logs them as
/// `nfc_error` and re-raises.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Transport failure talking to the device.
    #[error("device communication failed: {0}")]
    Communication(String),

    /// The device rejected the payment token.
    #[error("device rejected payment token: {0}")]
    TokenRejected(#[from] TokenError),

    /// The device call exceeded its time bound.
    #[error("device call timed out")]
    Timeout,
}

/// The contactless payment device contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentDevice: Send + Sync {
    /// Moves funds out of the card for a payment.
    async fn transmit<'a>(
        &self,
        token: &PaymentToken,
        amount: Decimal,
        pin: Option<&'a str>,
    ) -> Result<DeviceResponse, DeviceError>;

    /// Moves funds onto the card for a top-up.
    async fn top_up<'a>(
        &self,
        token: &PaymentToken,
        amount: Decimal,
        pin: Option<&'a str>,
    ) -> Result<DeviceResponse, DeviceError>;

    /// Reads the card's current balance.
    async fn balance(&self, card_id: CardId) -> Result<Decimal, DeviceError>;
}

/// Result of a gateway verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayVerification {
    /// Whether the gateway confirmed the payment.
    pub success: bool,
    /// Gateway reference id for confirmed payments.
    pub ref_id: Option<String>,
}

/// Online gateway failures.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure talking to the gateway.
    #[error("gateway communication failed: {0}")]
    Communication(String),
}

/// The online payment gateway contract.
#[async_trait]
pub trait OnlineGateway: Send + Sync {
    /// Starts an online payment; returns the redirect URL.
    async fn initiate(
        &self,
        amount: Decimal,
        description: &str,
        callback_url: &str,
    ) -> Result<String, GatewayError>;

    /// Verifies a completed online payment.
    async fn verify(
        &self,
        status: &str,
        authority: &str,
        amount: Decimal,
    ) -> Result<GatewayVerification, GatewayError>;
}

/// A purchasable top-up product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Product id.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Top-up value granted on verified purchase.
    pub value: Decimal,
}

/// Receipt returned by the purchase provider.
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    /// The purchased product.
    pub product_id: ProductId,
    /// Opaque token to verify the purchase with.
    pub purchase_token: String,
}

/// In-app purchase provider failures.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport failure talking to the provider.
    #[error("purchase provider communication failed: {0}")]
    Communication(String),

    /// The product id is not known to the provider.
    #[error("unknown product: {0}")]
    UnknownProduct(ProductId),
}

/// The in-app purchase provider contract.
#[async_trait]
pub trait PurchaseProvider: Send + Sync {
    /// Lists the products for the given ids.
    async fn list_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, ProviderError>;

    /// Buys a product against a card; returns a verifiable receipt.
    async fn purchase(
        &self,
        product_id: ProductId,
        card_id: CardId,
    ) -> Result<PurchaseReceipt, ProviderError>;

    /// Verifies a previously issued purchase token.
    async fn verify_purchase(&self, purchase_token: &str) -> Result<bool, ProviderError>;
}
