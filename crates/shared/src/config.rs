//! Application configuration management.
//!
//! Defaults match the authorization policy constants; any value can be
//! overridden via config files or `TAPGUARD__`-prefixed environment
//! variables.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Authorization engine tunables.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Key material for the card-payload cipher and token signing.
    #[serde(default)]
    pub crypto: CryptoConfig,
}

/// Authorization engine tunables.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Idle minutes before a session expires.
    #[serde(default = "default_session_idle_minutes")]
    pub session_idle_minutes: i64,
    /// Minutes a one-time passcode stays valid.
    #[serde(default = "default_otp_ttl_minutes")]
    pub otp_ttl_minutes: i64,
    /// Maximum OTP validation attempts before the code is purged.
    #[serde(default = "default_otp_max_attempts")]
    pub otp_max_attempts: u32,
    /// Minutes a payment token stays valid.
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
    /// Seconds that must elapse between two transactions (double-submit guard).
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: i64,
    /// Window in minutes for the geo-velocity check.
    #[serde(default = "default_velocity_window_minutes")]
    pub velocity_window_minutes: i64,
    /// Risk score at or above which MFA is forced.
    #[serde(default = "default_high_risk_threshold")]
    pub high_risk_threshold: u32,
    /// Incident count at which an identity reports as locked.
    #[serde(default = "default_incident_lock_threshold")]
    pub incident_lock_threshold: u32,
    /// Flat fee rate applied to successful payments.
    #[serde(default = "default_fee_rate")]
    pub fee_rate: Decimal,
    /// Amount above which the standard policy demands a PIN.
    #[serde(default = "default_pin_required_threshold")]
    pub pin_required_threshold: Decimal,
    /// Amount above which a success is flagged as high value.
    #[serde(default = "default_high_value_threshold")]
    pub high_value_threshold: Decimal,
    /// Seconds before an in-flight device call is abandoned.
    #[serde(default = "default_device_timeout_seconds")]
    pub device_timeout_seconds: u64,
}

fn default_session_idle_minutes() -> i64 {
    30
}

fn default_otp_ttl_minutes() -> i64 {
    5
}

fn default_otp_max_attempts() -> u32 {
    3
}

fn default_token_ttl_minutes() -> i64 {
    5
}

fn default_cooldown_seconds() -> i64 {
    5
}

fn default_velocity_window_minutes() -> i64 {
    10
}

fn default_high_risk_threshold() -> u32 {
    70
}

fn default_incident_lock_threshold() -> u32 {
    5
}

fn default_fee_rate() -> Decimal {
    // 1%
    Decimal::new(1, 2)
}

fn default_pin_required_threshold() -> Decimal {
    Decimal::new(500, 0)
}

fn default_high_value_threshold() -> Decimal {
    Decimal::new(1000, 0)
}

fn default_device_timeout_seconds() -> u64 {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_idle_minutes: default_session_idle_minutes(),
            otp_ttl_minutes: default_otp_ttl_minutes(),
            otp_max_attempts: default_otp_max_attempts(),
            token_ttl_minutes: default_token_ttl_minutes(),
            cooldown_seconds: default_cooldown_seconds(),
            velocity_window_minutes: default_velocity_window_minutes(),
            high_risk_threshold: default_high_risk_threshold(),
            incident_lock_threshold: default_incident_lock_threshold(),
            fee_rate: default_fee_rate(),
            pin_required_threshold: default_pin_required_threshold(),
            high_value_threshold: default_high_value_threshold(),
            device_timeout_seconds: default_device_timeout_seconds(),
        }
    }
}

/// Key material configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CryptoConfig {
    /// Hex-encoded 256-bit master key.
    #[serde(default = "default_master_key_hex")]
    pub master_key_hex: String,
}

fn default_master_key_hex() -> String {
    // Development-only key. Deployments must override via TAPGUARD__CRYPTO__MASTER_KEY_HEX.
    "0".repeat(64)
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            master_key_hex: default_master_key_hex(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TAPGUARD").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
