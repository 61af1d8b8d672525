use crate::payments::providers::paystack::{PaystackConfig, DEFAULT_BASE_URL};
use crate::payments::types::{FeeType, IntegrationType, TransactionMode};
use anyhow::{anyhow, Context, Result};
use config::{Config as ConfigLoader, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub paystack: PaymentSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    /// How long a pending checkout intent survives
    pub intent_ttl_secs: u64,
}

/// Gateway settings as configured by the store administrator
///
/// Read-only while a transaction is in flight.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentSettings {
    #[serde(default)]
    pub mode: TransactionMode,
    #[serde(default)]
    pub integration_type: IntegrationType,
    #[serde(default)]
    pub test_secret_key: String,
    #[serde(default)]
    pub live_secret_key: String,
    /// Status id applied to an order once its payment settles
    #[serde(default = "default_order_status")]
    pub order_status: i32,
    #[serde(default)]
    pub fee_type: FeeType,
    #[serde(default)]
    pub fee_amount: Decimal,
    /// Smallest order total this payment method accepts
    #[serde(default)]
    pub minimum_order_total: Option<Decimal>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Public base URL of the checkout entry points (callback, cancel)
    pub public_base_url: String,
    /// Checkout page the payer is sent back to
    pub checkout_url: String,
}

fn default_order_status() -> i32 {
    1
}

fn default_currency() -> String {
    "NGN".to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            mode: TransactionMode::default(),
            integration_type: IntegrationType::default(),
            test_secret_key: String::new(),
            live_secret_key: String::new(),
            order_status: default_order_status(),
            fee_type: FeeType::default(),
            fee_amount: Decimal::ZERO,
            minimum_order_total: None,
            currency: default_currency(),
            api_base_url: default_api_base_url(),
            timeout_secs: default_timeout_secs(),
            public_base_url: String::new(),
            checkout_url: String::new(),
        }
    }
}

impl PaymentSettings {
    pub fn is_test_mode(&self) -> bool {
        self.mode != TransactionMode::Live
    }

    /// Secret key for the active mode; also the webhook signing key
    pub fn secret_key(&self) -> &str {
        if self.is_test_mode() {
            &self.test_secret_key
        } else {
            &self.live_secret_key
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.secret_key().trim().is_empty()
    }

    pub fn completes_payment_on_client(&self) -> bool {
        self.integration_type == IntegrationType::Popup
    }

    /// Fee charged for using this payment method on an order of `order_total`
    pub fn applicable_fee(&self, order_total: Decimal) -> Decimal {
        match self.fee_type {
            FeeType::Fixed => self.fee_amount,
            FeeType::Percentage => (order_total * self.fee_amount / Decimal::ONE_HUNDRED).round_dp(2),
        }
    }

    pub fn is_applicable(&self, order_total: Decimal) -> bool {
        self.minimum_order_total
            .map_or(true, |minimum| order_total >= minimum)
    }

    /// URL of a public entry point, parameterized by order hash
    pub fn entry_point_url(&self, entry_point: &str, order_hash: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_base_url.trim_end_matches('/'),
            entry_point,
            order_hash
        )
    }

    pub fn gateway_config(&self) -> PaystackConfig {
        PaystackConfig {
            secret_key: self.secret_key().to_string(),
            base_url: self.api_base_url.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

impl Config {
    /// Load configuration from defaults, `config/default.toml` and `APP__*`
    /// environment variables, in that order
    pub fn load() -> Result<Self> {
        let loader = ConfigLoader::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.environment", "development")?
            .set_default("database.max_connections", 20)?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .set_default("redis.intent_ttl_secs", 3600)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()
            .context("Failed to read configuration")?;

        let config: Config = loader
            .try_deserialize()
            .context("Configuration is incomplete or malformed")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Validate port range
        if self.server.port < 1024 {
            return Err(anyhow!(
                "Port must be at least 1024, got {}",
                self.server.port
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        if self.database.url.trim().is_empty() {
            return Err(anyhow!("DATABASE_URL cannot be empty"));
        }

        if self.database.max_connections == 0 {
            return Err(anyhow!("database.max_connections must be greater than 0"));
        }

        if self.redis.url.trim().is_empty() {
            return Err(anyhow!("REDIS_URL cannot be empty"));
        }

        self.paystack.validate()
    }
}

impl PaymentSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.is_configured() {
            return Err(anyhow!(
                "Paystack {} secret key is required",
                if self.is_test_mode() { "test" } else { "live" }
            ));
        }

        if self.public_base_url.trim().is_empty() {
            return Err(anyhow!("paystack.public_base_url cannot be empty"));
        }

        if self.checkout_url.trim().is_empty() {
            return Err(anyhow!("paystack.checkout_url cannot be empty"));
        }

        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(anyhow!(
                "paystack.currency must be a 3-letter ISO code, got {}",
                self.currency
            ));
        }

        if self.timeout_secs == 0 {
            return Err(anyhow!("paystack.timeout_secs must be greater than 0"));
        }

        if self.fee_amount.is_sign_negative() {
            return Err(anyhow!("paystack.fee_amount cannot be negative"));
        }

        Ok(())
    }
}
