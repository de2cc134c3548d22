//! Deterministic in-memory contract implementations.
//!
//! These stand in for the real contactless device, gateway, and purchase
//! provider in tests and local runs. Behavior is fully deterministic:
//! balances live in a map, gateway authorities are sequential, and
//! failure injection is explicit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tapguard_shared::types::{CardId, ProductId};
use uuid::Uuid;

use super::contract::{
    DeviceError, DeviceResponse, DeviceStatus, GatewayError, GatewayVerification, OnlineGateway,
    PaymentDevice, Product, ProviderError, PurchaseProvider, PurchaseReceipt,
};
use crate::token::{PaymentToken, TokenService};

/// In-memory contactless device with per-card balances.
///
/// Validates token signatures and expiry exactly like the real device
/// side would, using a shared [`TokenService`].
pub struct InMemoryDevice {
    tokens: Arc<TokenService>,
    balances: DashMap<CardId, Decimal>,
    failing: AtomicBool,
}

impl InMemoryDevice {
    /// Creates a device that validates tokens with the given service.
    #[must_use]
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self {
            tokens,
            balances: DashMap::new(),
            failing: AtomicBool::new(false),
        }
    }

    /// Sets a card's balance.
    pub fn set_balance(&self, card_id: CardId, amount: Decimal) {
        self.balances.insert(card_id, amount);
    }

    /// Toggles communication failure for subsequent calls.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_link(&self) -> Result<(), DeviceError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(DeviceError::Communication("link down".to_string()))
        } else {
            Ok(())
        }
    }

    fn validate_token(&self, token: &PaymentToken) -> Result<(), DeviceError> {
        self.tokens.verify(token, Utc::now())?;
        // The payload must also open cleanly; a garbled payload means the
        // token was not minted with our key material.
        self.tokens.open_payload(token)?;
        Ok(())
    }
}

#[async_trait]
impl PaymentDevice for InMemoryDevice {
    async fn transmit<'a>(
        &self,
        token: &PaymentToken,
        amount: Decimal,
        _pin: Option<&'a str>,
    ) -> Result<DeviceResponse, DeviceError> {
        self.check_link()?;
        self.validate_token(token)?;

        let mut balance = self.balances.entry(token.card_id).or_insert(Decimal::ZERO);
        if *balance < amount {
            return Ok(DeviceResponse {
                status: DeviceStatus::InsufficientFunds,
                message: "insufficient funds".to_string(),
                amount: *balance,
            });
        }

        *balance -= amount;
        Ok(DeviceResponse {
            status: DeviceStatus::Approved,
            message: "approved".to_string(),
            amount,
        })
    }

    async fn top_up<'a>(
        &self,
        token: &PaymentToken,
        amount: Decimal,
        _pin: Option<&'a str>,
    ) -> Result<DeviceResponse, DeviceError> {
        self.check_link()?;
        self.validate_token(token)?;

        let mut balance = self.balances.entry(token.card_id).or_insert(Decimal::ZERO);
        *balance += amount;
        Ok(DeviceResponse {
            status: DeviceStatus::Approved,
            message: "top-up credited".to_string(),
            amount,
        })
    }

    async fn balance(&self, card_id: CardId) -> Result<Decimal, DeviceError> {
        self.check_link()?;
        Ok(self
            .balances
            .get(&card_id)
            .map_or(Decimal::ZERO, |b| *b))
    }
}

/// In-memory online gateway with sequential authorities.
#[derive(Default)]
pub struct InMemoryGateway {
    next_authority: AtomicU64,
    pending: DashMap<String, Decimal>,
}

impl InMemoryGateway {
    /// Creates an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OnlineGateway for InMemoryGateway {
    async fn initiate(
        &self,
        amount: Decimal,
        _description: &str,
        _callback_url: &str,
    ) -> Result<String, GatewayError> {
        let authority = format!("A{:06}", self.next_authority.fetch_add(1, Ordering::SeqCst));
        self.pending.insert(authority.clone(), amount);
        Ok(format!("https://gateway.test/redirect/{authority}"))
    }

    async fn verify(
        &self,
        status: &str,
        authority: &str,
        amount: Decimal,
    ) -> Result<GatewayVerification, GatewayError> {
        let confirmed = status == "OK"
            && self
                .pending
                .get(authority)
                .is_some_and(|pending| *pending == amount);

        if confirmed {
            self.pending.remove(authority);
            Ok(GatewayVerification {
                success: true,
                ref_id: Some(format!("REF-{authority}")),
            })
        } else {
            Ok(GatewayVerification {
                success: false,
                ref_id: None,
            })
        }
    }
}

/// In-memory purchase provider with a fixed catalog.
#[derive(Default)]
pub struct InMemoryPurchaseProvider {
    products: DashMap<ProductId, Product>,
    receipts: DashMap<String, ProductId>,
}

impl InMemoryPurchaseProvider {
    /// Creates a provider with an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a product to the catalog.
    pub fn add_product(&self, product: Product) {
        self.products.insert(product.id, product);
    }
}

#[async_trait]
impl PurchaseProvider for InMemoryPurchaseProvider {
    async fn list_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, ProviderError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.products.get(id).map(|p| p.value().clone()))
            .collect())
    }

    async fn purchase(
        &self,
        product_id: ProductId,
        _card_id: CardId,
    ) -> Result<PurchaseReceipt, ProviderError> {
        if !self.products.contains_key(&product_id) {
            return Err(ProviderError::UnknownProduct(product_id));
        }
        let purchase_token = format!("pt-{}", Uuid::new_v4());
        self.receipts.insert(purchase_token.clone(), product_id);
        Ok(PurchaseReceipt {
            product_id,
            purchase_token,
        })
    }

    async fn verify_purchase(&self, purchase_token: &str) -> Result<bool, ProviderError> {
        Ok(self.receipts.contains_key(purchase_token))
    }
}
