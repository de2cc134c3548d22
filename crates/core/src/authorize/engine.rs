//! The payment/top-up state machine.
//!
//! Sequence for a payment: session check, cooldown, card validation,
//! daily limit, risk scoring, policy enforcement, device invocation,
//! ledger append. Declines short-circuit as outcomes; precondition
//! violations raise. The identity's async lock wraps the whole sequence,
//! so one in-flight authorization per identity is enforced while other
//! identities proceed in parallel; the device call is the only suspension
//! point and is timeout-bounded.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tapguard_shared::config::EngineConfig;
use tapguard_shared::types::pagination::{PageRequest, PageResponse};
use tapguard_shared::types::{CardId, MobileNumber, SessionId};
use tracing::{info, warn};

use super::error::AuthorizeError;
use super::types::{AuthorizationOutcome, PaymentRequest, TopUpRequest};
use crate::card::{AuthPolicy, CardRegistry, NewCard};
use crate::crypto::PayloadCipher;
use crate::device::{
    DeviceError, DeviceStatus, OnlineGateway, PaymentDevice, Product, PurchaseProvider,
};
use crate::identity::{Identity, IdentityStore};
use crate::ledger::{SecurityFlag, TransactionLedger, TransactionRecord, TxStatus};
use crate::otp::OtpService;
use crate::risk::RiskEngine;
use crate::session::{Session, SessionManager};
use crate::token::TokenService;

/// Declines scoring above this feed the identity's incident counter.
const RISKY_DECLINE_SCORE_FLOOR: u32 = 50;

/// Splits a gross amount into `(net, fee)` at the given fee rate.
#[must_use]
pub fn split_fee(amount: Decimal, fee_rate: Decimal) -> (Decimal, Decimal) {
    let fee = amount * fee_rate;
    (amount - fee, fee)
}

/// The authorization orchestrator.
///
/// All collaborators are injected at construction; the engine owns no
/// global state beyond what the injected repositories hold.
pub struct AuthorizationEngine {
    config: EngineConfig,
    identities: Arc<IdentityStore>,
    sessions: Arc<SessionManager>,
    otp: Arc<OtpService>,
    risk: RiskEngine,
    ledger: Arc<TransactionLedger>,
    tokens: Arc<TokenService>,
    cipher: Arc<dyn PayloadCipher>,
    device: Arc<dyn PaymentDevice>,
    gateway: Arc<dyn OnlineGateway>,
    provider: Arc<dyn PurchaseProvider>,
}

impl AuthorizationEngine {
    /// Wires an engine from its collaborators.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: EngineConfig,
        identities: Arc<IdentityStore>,
        sessions: Arc<SessionManager>,
        otp: Arc<OtpService>,
        ledger: Arc<TransactionLedger>,
        tokens: Arc<TokenService>,
        cipher: Arc<dyn PayloadCipher>,
        device: Arc<dyn PaymentDevice>,
        gateway: Arc<dyn OnlineGateway>,
        provider: Arc<dyn PurchaseProvider>,
    ) -> Self {
        let risk = RiskEngine::new(
            config.velocity_window_minutes,
            config.high_risk_threshold,
            config.incident_lock_threshold,
        );
        Self {
            config,
            identities,
            sessions,
            otp,
            risk,
            ledger,
            tokens,
            cipher,
            device,
            gateway,
            provider,
        }
    }

    /// The identity repository.
    #[must_use]
    pub fn identities(&self) -> &Arc<IdentityStore> {
        &self.identities
    }

    /// The session manager.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// The ledger.
    #[must_use]
    pub fn ledger(&self) -> &Arc<TransactionLedger> {
        &self.ledger
    }

    // ========== Authentication ==========

    /// Verifies credentials and starts a session.
    ///
    /// # Errors
    ///
    /// Unknown identities and wrong passwords raise `Identity` errors.
    pub async fn login(
        &self,
        mobile: &MobileNumber,
        password: &str,
    ) -> Result<Session, AuthorizeError> {
        let handle = self.identities.get(mobile)?;
        let identity = handle.lock().await;
        self.identities.verify_password(&identity, password)?;

        let session = self.sessions.start_session(mobile);
        info!(identity = %mobile, "login");
        Ok(session)
    }

    /// Ends the identity's session, if any.
    pub fn logout(&self, mobile: &MobileNumber) {
        self.sessions.end_session(mobile);
    }

    /// Issues an OTP for a logged-in identity.
    ///
    /// # Errors
    ///
    /// Requires a registered identity and an active session.
    pub async fn issue_otp(
        &self,
        mobile: &MobileNumber,
        session_id: SessionId,
    ) -> Result<u32, AuthorizeError> {
        self.identities.get(mobile)?;
        self.sessions.require_active(mobile, session_id)?;
        self.sessions.touch(mobile);
        Ok(self.otp.issue(mobile))
    }

    // ========== Payments ==========

    /// Authorizes a payment against the identity's default card.
    ///
    /// Declined outcomes return as values; every terminal outcome has a
    /// ledger record by the time this returns.
    ///
    /// # Errors
    ///
    /// Session failures, the cooldown guard, token faults, and device
    /// communication failures raise; the device failure is logged as an
    /// `nfc_error` record before propagating.
    pub async fn pay(
        &self,
        req: &PaymentRequest,
    ) -> Result<AuthorizationOutcome, AuthorizeError> {
        if req.amount <= Decimal::ZERO {
            return Err(AuthorizeError::InvalidAmount);
        }

        let handle = self.identities.get(&req.mobile)?;
        // Serialization boundary: held through device invocation and the
        // ledger append, so limit checks cannot race their spend update.
        let mut identity = handle.lock().await;

        // 1. Session
        self.sessions.require_active(&req.mobile, req.session_id)?;
        self.sessions.touch(&req.mobile);

        let now = Utc::now();
        let today = now.date_naive();

        // 2. Cooldown (double-submit guard): hard error, not a decline.
        if let Some(last) = identity.risk.last_transaction_at {
            let cooldown = Duration::seconds(self.config.cooldown_seconds);
            let elapsed = now - last;
            if elapsed < cooldown {
                return Err(AuthorizeError::CooldownActive {
                    retry_in_secs: (cooldown - elapsed).num_seconds().max(1),
                });
            }
        }

        // 3. Card validation
        let card = identity
            .default_card()
            .ok_or(AuthorizeError::NoDefaultCard)?
            .clone();
        if card.expiry.is_expired(today) {
            let outcome = self.finish(
                &mut identity,
                card.id,
                TxStatus::CardExpired,
                Decimal::ZERO,
                Decimal::ZERO,
                "Default card is expired".to_string(),
                Vec::new(),
                Some(req.geo_hash.clone()),
                0,
            );
            return Ok(outcome);
        }
        if card.suspended {
            let outcome = self.finish(
                &mut identity,
                card.id,
                TxStatus::PolicyViolation,
                Decimal::ZERO,
                Decimal::ZERO,
                "Card is suspended".to_string(),
                Vec::new(),
                Some(req.geo_hash.clone()),
                0,
            );
            return Ok(outcome);
        }

        // 4. Daily limit: nothing is mutated on violation.
        if identity.spent_on(card.id, today) + req.amount > card.daily_limit {
            let outcome = self.finish(
                &mut identity,
                card.id,
                TxStatus::PolicyViolation,
                Decimal::ZERO,
                Decimal::ZERO,
                "Daily limit exceeded".to_string(),
                Vec::new(),
                Some(req.geo_hash.clone()),
                0,
            );
            return Ok(outcome);
        }

        // 5. Risk scoring and policy escalation.
        let score = self
            .risk
            .score(req.amount, &req.geo_hash, &identity.risk, now);
        let velocity = self
            .risk
            .velocity_tripped(&req.geo_hash, &identity.risk, now);
        let mut flags = Vec::new();
        let mut policy = card.auth_policy;

        if self.risk.is_high_risk(score) {
            if let Some(stored) = identity.card_mut(card.id) {
                stored.auth_policy = AuthPolicy::DynamicMfa;
                stored.auto_escalated = true;
            }
            policy = AuthPolicy::DynamicMfa;
            flags.push(SecurityFlag::DrsHighRiskForcedMfa);
            warn!(identity = %req.mobile, score, "high risk: policy escalated to dynamic MFA");
        } else if velocity {
            flags.push(SecurityFlag::VelocityFraudRiskHigh);
            warn!(identity = %req.mobile, score, "geo-velocity tripped");
        } else if card.auto_escalated {
            // Self-healing escalation: a calm attempt reverts the forced
            // policy.
            if let Some(stored) = identity.card_mut(card.id) {
                stored.auth_policy = AuthPolicy::Standard;
                stored.auto_escalated = false;
            }
            policy = AuthPolicy::Standard;
            info!(identity = %req.mobile, "auto-escalated policy reverted to standard");
        }

        // 6. Policy enforcement; both checks apply independently.
        if policy.requires_pin(req.amount, self.config.pin_required_threshold)
            && req.pin.is_none()
        {
            let outcome = self.finish(
                &mut identity,
                card.id,
                TxStatus::RequiresPin,
                Decimal::ZERO,
                Decimal::ZERO,
                "PIN required for this payment".to_string(),
                flags,
                Some(req.geo_hash.clone()),
                score,
            );
            return Ok(outcome);
        }
        if policy.requires_biometric() && !req.biometric_verified {
            let outcome = self.finish(
                &mut identity,
                card.id,
                TxStatus::PolicyViolation,
                Decimal::ZERO,
                Decimal::ZERO,
                "Biometric proof required".to_string(),
                flags,
                Some(req.geo_hash.clone()),
                score,
            );
            return Ok(outcome);
        }

        // 7. Device invocation with a fresh one-shot token.
        let token = self.tokens.mint(&card, now)?;
        let response = match tokio::time::timeout(
            StdDuration::from_secs(self.config.device_timeout_seconds),
            self.device.transmit(&token, req.amount, req.pin.as_deref()),
        )
        .await
        {
            Err(_elapsed) => {
                return self.device_fault(
                    &mut identity,
                    card.id,
                    DeviceError::Timeout,
                    flags,
                    Some(req.geo_hash.clone()),
                    score,
                );
            }
            Ok(Err(err)) => {
                return self.device_fault(
                    &mut identity,
                    card.id,
                    err,
                    flags,
                    Some(req.geo_hash.clone()),
                    score,
                );
            }
            Ok(Ok(response)) => response,
        };

        match response.status {
            // 8. Success: fee, accumulators, velocity state, flags.
            DeviceStatus::Approved => {
                let (net, fee) = split_fee(req.amount, self.config.fee_rate);
                identity.record_spend(card.id, today, req.amount);
                identity.risk.record_success(&req.geo_hash, now);
                if req.amount > self.config.high_value_threshold {
                    flags.push(SecurityFlag::HighValueTransaction);
                }
                let outcome = self.finish(
                    &mut identity,
                    card.id,
                    TxStatus::Success,
                    net,
                    fee,
                    format!("Approved: {net} charged (fee {fee})"),
                    flags,
                    Some(req.geo_hash.clone()),
                    score,
                );
                Ok(outcome)
            }
            // 9. Insufficient funds: flagged, nothing mutated.
            DeviceStatus::InsufficientFunds => {
                flags.push(SecurityFlag::InsufficientFunds);
                let outcome = self.finish(
                    &mut identity,
                    card.id,
                    TxStatus::InsufficientFunds,
                    Decimal::ZERO,
                    Decimal::ZERO,
                    response.message,
                    flags,
                    Some(req.geo_hash.clone()),
                    score,
                );
                Ok(outcome)
            }
            DeviceStatus::Unknown => self.device_fault(
                &mut identity,
                card.id,
                DeviceError::Communication("unrecognized device status".to_string()),
                flags,
                Some(req.geo_hash.clone()),
                score,
            ),
        }
    }

    /// Credits the identity's default card.
    ///
    /// Top-ups skip the limit/risk/policy gates: no fee, no daily-spend
    /// or risk-state mutation. Session, cooldown, and card-expiry checks
    /// still apply.
    ///
    /// # Errors
    ///
    /// Same fatal classes as [`AuthorizationEngine::pay`].
    pub async fn top_up(
        &self,
        req: &TopUpRequest,
    ) -> Result<AuthorizationOutcome, AuthorizeError> {
        if req.amount <= Decimal::ZERO {
            return Err(AuthorizeError::InvalidAmount);
        }

        let handle = self.identities.get(&req.mobile)?;
        let mut identity = handle.lock().await;

        self.sessions.require_active(&req.mobile, req.session_id)?;
        self.sessions.touch(&req.mobile);

        let now = Utc::now();
        if let Some(last) = identity.risk.last_transaction_at {
            let cooldown = Duration::seconds(self.config.cooldown_seconds);
            let elapsed = now - last;
            if elapsed < cooldown {
                return Err(AuthorizeError::CooldownActive {
                    retry_in_secs: (cooldown - elapsed).num_seconds().max(1),
                });
            }
        }

        let card = identity
            .default_card()
            .ok_or(AuthorizeError::NoDefaultCard)?
            .clone();
        if card.expiry.is_expired(now.date_naive()) {
            let outcome = self.finish(
                &mut identity,
                card.id,
                TxStatus::CardExpired,
                Decimal::ZERO,
                Decimal::ZERO,
                "Default card is expired".to_string(),
                Vec::new(),
                None,
                0,
            );
            return Ok(outcome);
        }

        let token = self.tokens.mint(&card, now)?;
        let response = match tokio::time::timeout(
            StdDuration::from_secs(self.config.device_timeout_seconds),
            self.device.top_up(&token, req.amount, req.pin.as_deref()),
        )
        .await
        {
            Err(_elapsed) => {
                return self.device_fault(
                    &mut identity,
                    card.id,
                    DeviceError::Timeout,
                    Vec::new(),
                    None,
                    0,
                );
            }
            Ok(Err(err)) => {
                return self.device_fault(&mut identity, card.id, err, Vec::new(), None, 0);
            }
            Ok(Ok(response)) => response,
        };

        match response.status {
            DeviceStatus::Approved => {
                let outcome = self.finish(
                    &mut identity,
                    card.id,
                    TxStatus::Success,
                    req.amount,
                    Decimal::ZERO,
                    response.message,
                    Vec::new(),
                    None,
                    0,
                );
                Ok(outcome)
            }
            DeviceStatus::InsufficientFunds => {
                let outcome = self.finish(
                    &mut identity,
                    card.id,
                    TxStatus::InsufficientFunds,
                    Decimal::ZERO,
                    Decimal::ZERO,
                    response.message,
                    vec![SecurityFlag::InsufficientFunds],
                    None,
                    0,
                );
                Ok(outcome)
            }
            DeviceStatus::Unknown => self.device_fault(
                &mut identity,
                card.id,
                DeviceError::Communication("unrecognized device status".to_string()),
                Vec::new(),
                None,
                0,
            ),
        }
    }

    /// Starts an online top-up; returns the gateway redirect URL.
    ///
    /// # Errors
    ///
    /// Requires a registered identity and an active session; gateway
    /// communication failures propagate.
    pub async fn begin_online_top_up(
        &self,
        mobile: &MobileNumber,
        session_id: SessionId,
        amount: Decimal,
        description: &str,
        callback_url: &str,
    ) -> Result<String, AuthorizeError> {
        if amount <= Decimal::ZERO {
            return Err(AuthorizeError::InvalidAmount);
        }
        self.identities.get(mobile)?;
        self.sessions.require_active(mobile, session_id)?;
        self.sessions.touch(mobile);

        Ok(self
            .gateway
            .initiate(amount, description, callback_url)
            .await?)
    }

    /// Completes an online top-up: a confirmed gateway verification
    /// chains into a device top-up.
    ///
    /// # Errors
    ///
    /// `AuthorizeError::GatewayDeclined` when the gateway does not
    /// confirm; otherwise the top-up's fatal classes.
    pub async fn complete_online_top_up(
        &self,
        req: &TopUpRequest,
        gateway_status: &str,
        authority: &str,
    ) -> Result<AuthorizationOutcome, AuthorizeError> {
        let verification = self
            .gateway
            .verify(gateway_status, authority, req.amount)
            .await?;
        if !verification.success {
            warn!(identity = %req.mobile, authority, "gateway did not confirm payment");
            return Err(AuthorizeError::GatewayDeclined);
        }
        info!(
            identity = %req.mobile,
            ref_id = verification.ref_id.as_deref().unwrap_or(""),
            "gateway confirmed; crediting card"
        );
        self.top_up(req).await
    }

    /// Lists purchasable products.
    ///
    /// # Errors
    ///
    /// Provider communication failures propagate.
    pub async fn list_products(
        &self,
        ids: &[tapguard_shared::types::ProductId],
    ) -> Result<Vec<Product>, AuthorizeError> {
        Ok(self.provider.list_products(ids).await?)
    }

    /// Buys a product and credits its value as a top-up once the
    /// purchase token verifies.
    ///
    /// # Errors
    ///
    /// `AuthorizeError::PurchaseNotVerified` when the provider cannot
    /// verify the receipt; otherwise the top-up's fatal classes.
    pub async fn purchase_top_up(
        &self,
        req: &TopUpRequest,
        product_id: tapguard_shared::types::ProductId,
    ) -> Result<AuthorizationOutcome, AuthorizeError> {
        let handle = self.identities.get(&req.mobile)?;
        let card_id = {
            let identity = handle.lock().await;
            self.sessions.require_active(&req.mobile, req.session_id)?;
            self.sessions.touch(&req.mobile);
            identity.default_card_id.ok_or(AuthorizeError::NoDefaultCard)?
        };

        let receipt = self.provider.purchase(product_id, card_id).await?;
        if !self
            .provider
            .verify_purchase(&receipt.purchase_token)
            .await?
        {
            return Err(AuthorizeError::PurchaseNotVerified);
        }

        let product = self
            .provider
            .list_products(&[product_id])
            .await?
            .into_iter()
            .next()
            .ok_or(AuthorizeError::Provider(
                crate::device::ProviderError::UnknownProduct(product_id),
            ))?;

        let top_up = TopUpRequest {
            mobile: req.mobile.clone(),
            session_id: req.session_id,
            amount: product.value,
            pin: req.pin.clone(),
        };
        self.top_up(&top_up).await
    }

    // ========== Guarded card management ==========

    /// Registers and attaches a card. First card becomes the default.
    ///
    /// # Errors
    ///
    /// Requires an active session, a valid OTP, and a password match;
    /// card validation errors propagate.
    pub async fn add_card(
        &self,
        mobile: &MobileNumber,
        session_id: SessionId,
        otp_code: u32,
        password: &str,
        new_card: &NewCard,
    ) -> Result<CardId, AuthorizeError> {
        let cipher = Arc::clone(&self.cipher);
        self.with_guarded_identity(mobile, session_id, otp_code, password, move |identity| {
            let card = CardRegistry::register(new_card, &identity.national_id, cipher.as_ref())?;
            Ok(identity.add_card(card)?)
        })
        .await
    }

    /// Removes a non-default card.
    ///
    /// # Errors
    ///
    /// Guarded like [`AuthorizationEngine::add_card`]; removing the
    /// current default is rejected.
    pub async fn remove_card(
        &self,
        mobile: &MobileNumber,
        session_id: SessionId,
        otp_code: u32,
        password: &str,
        card_id: CardId,
    ) -> Result<(), AuthorizeError> {
        self.with_guarded_identity(mobile, session_id, otp_code, password, |identity| {
            Ok(identity.remove_card(card_id)?)
        })
        .await
    }

    /// Marks a card as the default.
    ///
    /// # Errors
    ///
    /// Guarded like [`AuthorizationEngine::add_card`].
    pub async fn set_default_card(
        &self,
        mobile: &MobileNumber,
        session_id: SessionId,
        otp_code: u32,
        password: &str,
        card_id: CardId,
    ) -> Result<(), AuthorizeError> {
        self.with_guarded_identity(mobile, session_id, otp_code, password, |identity| {
            Ok(identity.set_default(card_id)?)
        })
        .await
    }

    /// Updates a card's daily limit.
    ///
    /// # Errors
    ///
    /// Guarded like [`AuthorizationEngine::add_card`]; the limit must be
    /// positive.
    pub async fn set_daily_limit(
        &self,
        mobile: &MobileNumber,
        session_id: SessionId,
        otp_code: u32,
        password: &str,
        card_id: CardId,
        daily_limit: Decimal,
    ) -> Result<(), AuthorizeError> {
        self.with_guarded_identity(mobile, session_id, otp_code, password, move |identity| {
            if daily_limit <= Decimal::ZERO {
                return Err(crate::card::CardError::NonPositiveLimit.into());
            }
            let card = identity
                .card_mut(card_id)
                .ok_or(crate::card::CardError::NotFound(card_id))?;
            card.daily_limit = daily_limit;
            Ok(())
        })
        .await
    }

    /// Updates a card's auth policy. An explicit policy choice clears any
    /// forced escalation.
    ///
    /// # Errors
    ///
    /// Guarded like [`AuthorizationEngine::add_card`].
    pub async fn set_auth_policy(
        &self,
        mobile: &MobileNumber,
        session_id: SessionId,
        otp_code: u32,
        password: &str,
        card_id: CardId,
        policy: AuthPolicy,
    ) -> Result<(), AuthorizeError> {
        self.with_guarded_identity(mobile, session_id, otp_code, password, move |identity| {
            let card = identity
                .card_mut(card_id)
                .ok_or(crate::card::CardError::NotFound(card_id))?;
            card.auth_policy = policy;
            card.auto_escalated = false;
            Ok(())
        })
        .await
    }

    /// Changes the identity's password.
    ///
    /// # Errors
    ///
    /// Guarded like [`AuthorizationEngine::add_card`].
    pub async fn change_password(
        &self,
        mobile: &MobileNumber,
        session_id: SessionId,
        otp_code: u32,
        password: &str,
        new_password: &str,
    ) -> Result<(), AuthorizeError> {
        let identities = Arc::clone(&self.identities);
        self.with_guarded_identity(mobile, session_id, otp_code, password, move |identity| {
            identities.change_password(identity, new_password)?;
            Ok(())
        })
        .await
    }

    // ========== Queries ==========

    /// Masked numbers for all of the identity's cards.
    ///
    /// # Errors
    ///
    /// Requires an active session; decryption faults propagate.
    pub async fn masked_cards(
        &self,
        mobile: &MobileNumber,
        session_id: SessionId,
    ) -> Result<Vec<(CardId, String)>, AuthorizeError> {
        let handle = self.identities.get(mobile)?;
        let identity = handle.lock().await;
        self.sessions.require_active(mobile, session_id)?;
        self.sessions.touch(mobile);

        identity
            .cards
            .iter()
            .map(|card| {
                CardRegistry::masked(card, self.cipher.as_ref())
                    .map(|masked| (card.id, masked))
                    .map_err(AuthorizeError::from)
            })
            .collect()
    }

    /// The identity's ledger records, newest first.
    ///
    /// # Errors
    ///
    /// Requires an active session.
    pub async fn transactions(
        &self,
        mobile: &MobileNumber,
        session_id: SessionId,
    ) -> Result<Vec<TransactionRecord>, AuthorizeError> {
        let card_ids = self.owned_card_ids(mobile, session_id).await?;
        Ok(self.ledger.query_by_identity(&card_ids))
    }

    /// One page of the identity's ledger records.
    ///
    /// # Errors
    ///
    /// Requires an active session.
    pub async fn transactions_page(
        &self,
        mobile: &MobileNumber,
        session_id: SessionId,
        page: &PageRequest,
    ) -> Result<PageResponse<TransactionRecord>, AuthorizeError> {
        let card_ids = self.owned_card_ids(mobile, session_id).await?;
        Ok(self.ledger.query_page(&card_ids, page))
    }

    /// The identity's ledger records inside a date range (inclusive both
    /// ends), newest first.
    ///
    /// # Errors
    ///
    /// Requires an active session.
    pub async fn transactions_between(
        &self,
        mobile: &MobileNumber,
        session_id: SessionId,
        start: chrono::DateTime<Utc>,
        end: chrono::DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>, AuthorizeError> {
        let card_ids = self.owned_card_ids(mobile, session_id).await?;
        Ok(self.ledger.query_by_date_range(&card_ids, start, end))
    }

    /// The default card's balance, read from the device.
    ///
    /// # Errors
    ///
    /// Requires an active session and a default card; device faults
    /// propagate.
    pub async fn card_balance(
        &self,
        mobile: &MobileNumber,
        session_id: SessionId,
    ) -> Result<Decimal, AuthorizeError> {
        let handle = self.identities.get(mobile)?;
        let card_id = {
            let identity = handle.lock().await;
            self.sessions.require_active(mobile, session_id)?;
            self.sessions.touch(mobile);
            identity.default_card_id.ok_or(AuthorizeError::NoDefaultCard)?
        };
        Ok(self.device.balance(card_id).await?)
    }

    /// Whether the identity's incident count has reached lockout.
    ///
    /// # Errors
    ///
    /// Unknown identities raise `Identity` errors.
    pub async fn is_user_locked(&self, mobile: &MobileNumber) -> Result<bool, AuthorizeError> {
        let handle = self.identities.get(mobile)?;
        let identity = handle.lock().await;
        Ok(self.risk.is_locked(&identity.risk))
    }

    // ========== Internals ==========

    async fn owned_card_ids(
        &self,
        mobile: &MobileNumber,
        session_id: SessionId,
    ) -> Result<Vec<CardId>, AuthorizeError> {
        let handle = self.identities.get(mobile)?;
        let identity = handle.lock().await;
        self.sessions.require_active(mobile, session_id)?;
        self.sessions.touch(mobile);
        Ok(identity.cards.iter().map(|c| c.id).collect())
    }

    /// Runs a sensitive mutation under the session + OTP + password
    /// guards, holding the identity's lock throughout.
    async fn with_guarded_identity<T, F>(
        &self,
        mobile: &MobileNumber,
        session_id: SessionId,
        otp_code: u32,
        password: &str,
        mutate: F,
    ) -> Result<T, AuthorizeError>
    where
        F: FnOnce(&mut Identity) -> Result<T, AuthorizeError>,
    {
        let handle = self.identities.get(mobile)?;
        let mut identity = handle.lock().await;

        self.sessions.require_active(mobile, session_id)?;
        self.sessions.touch(mobile);

        if !self.otp.validate(mobile, otp_code)? {
            return Err(AuthorizeError::OtpRejected);
        }
        self.identities.verify_password(&identity, password)?;

        mutate(&mut identity)
    }

    /// Logs the fault as an `nfc_error` record, then re-raises it: a
    /// communication fault is not a business decline.
    fn device_fault(
        &self,
        identity: &mut Identity,
        card_id: CardId,
        err: DeviceError,
        mut flags: Vec<SecurityFlag>,
        geo_hash: Option<String>,
        risk_score: u32,
    ) -> Result<AuthorizationOutcome, AuthorizeError> {
        flags.push(SecurityFlag::DeviceCommFailure);
        warn!(card = %card_id, error = %err, "device fault");
        self.finish(
            identity,
            card_id,
            TxStatus::NfcError,
            Decimal::ZERO,
            Decimal::ZERO,
            err.to_string(),
            flags,
            geo_hash,
            risk_score,
        );
        Err(err.into())
    }

    /// Appends the terminal record and applies the incident rule.
    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        identity: &mut Identity,
        card_id: CardId,
        status: TxStatus,
        amount: Decimal,
        fee_amount: Decimal,
        message: String,
        security_flags: Vec<SecurityFlag>,
        geo_hash: Option<String>,
        risk_score: u32,
    ) -> AuthorizationOutcome {
        self.ledger.append(TransactionRecord {
            timestamp: Utc::now(),
            amount,
            status,
            card_id,
            message: message.clone(),
            fee_amount,
            security_flags: security_flags.clone(),
            geo_hash,
            risk_score,
        });

        // 10. Risky non-successes feed future risk scores.
        if !status.is_success() && risk_score > RISKY_DECLINE_SCORE_FLOOR {
            identity.risk.record_incident();
        }

        if status.is_success() {
            info!(card = %card_id, %status, %amount, "authorization finished");
        } else {
            warn!(card = %card_id, %status, risk_score, "authorization declined");
        }

        AuthorizationOutcome {
            status,
            amount,
            fee: fee_amount,
            message,
            security_flags,
            risk_score,
        }
    }
}
