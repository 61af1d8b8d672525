//! Paystack API client
//!
//! Thin authenticated wrapper over the four Paystack endpoints the checkout
//! needs. Failures are reported, never retried: the reconciliation engine
//! decides what a failure means for the order.

use crate::error::{PaymentError, PaymentResult};
use crate::payments::traits::PaymentGateway;
use crate::payments::types::{GatewayResponse, RefundData, TransactionData};
use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_BASE_URL: &str = "https://api.paystack.co";

/// Paystack client configuration
#[derive(Debug, Clone)]
pub struct PaystackConfig {
    /// Active secret key (test or live)
    pub secret_key: String,
    /// Paystack API base URL (defaults to https://api.paystack.co)
    pub base_url: String,
    /// Request timeout in seconds; an expired timeout is a remote failure
    pub timeout_secs: u64,
}

impl Default for PaystackConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Paystack payment gateway client
pub struct PaystackClient {
    config: PaystackConfig,
    client: Client,
}

impl PaystackClient {
    pub fn new(config: PaystackConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                PaymentError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    fn endpoint(&self, segments: &[&str]) -> PaymentResult<Url> {
        let mut url = Url::parse(&self.config.base_url).map_err(|e| {
            PaymentError::configuration(format!("Invalid Paystack base URL: {}", e))
        })?;

        url.path_segments_mut()
            .map_err(|_| PaymentError::configuration("Paystack base URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    /// Make an authenticated request to the Paystack API
    async fn make_request<T>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        fallback_message: &str,
    ) -> PaymentResult<GatewayResponse<T>>
    where
        T: DeserializeOwned + Default,
    {
        let mut request = self
            .client
            .request(method, url.clone())
            .bearer_auth(&self.config.secret_key)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            error!("Paystack request to {} failed: {}", url.path(), e);
            PaymentError::from(e)
        })?;

        let status = response.status();
        let response_text = response.text().await.map_err(PaymentError::from)?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&response_text)
                .ok()
                .and_then(|body| {
                    body.get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| fallback_message.to_string());
            error!(
                "Paystack API error: HTTP {} on {}: {}",
                status,
                url.path(),
                message
            );
            return Err(PaymentError::remote(message));
        }

        let parsed: GatewayResponse<T> = serde_json::from_str(&response_text).map_err(|e| {
            error!("Failed to parse Paystack response: {}", e);
            PaymentError::remote(format!("Invalid response format: {}", e))
        })?;

        if !parsed.status {
            let message = if parsed.message.is_empty() {
                fallback_message.to_string()
            } else {
                parsed.message
            };
            error!("Paystack API error on {}: {}", url.path(), message);
            return Err(PaymentError::remote(message));
        }

        Ok(parsed)
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    async fn initialize_transaction(
        &self,
        payload: &Value,
    ) -> PaymentResult<GatewayResponse<TransactionData>> {
        let amount = payload.get("amount").cloned().unwrap_or_default();
        let currency = payload.get("currency").cloned().unwrap_or_default();
        info!("Initializing Paystack transaction: amount={} currency={}", amount, currency);

        let url = self.endpoint(&["transaction", "initialize"])?;
        let response: GatewayResponse<TransactionData> = self
            .make_request(
                Method::POST,
                url,
                Some(payload),
                "Failed to initialize transaction",
            )
            .await?;

        info!(
            "Paystack transaction initialized: reference={}",
            response.data.reference.as_deref().unwrap_or("-")
        );
        Ok(response)
    }

    async fn verify_transaction(
        &self,
        reference: &str,
    ) -> PaymentResult<GatewayResponse<TransactionData>> {
        info!("Verifying Paystack transaction: reference={}", reference);

        let url = self.endpoint(&["transaction", "verify", reference])?;
        let response: GatewayResponse<TransactionData> = self
            .make_request(Method::GET, url, None, "Failed to verify transaction")
            .await?;

        info!(
            "Paystack transaction verified: reference={}, status={}",
            reference,
            response.data.status_or_unknown()
        );
        Ok(response)
    }

    async fn charge_authorization(
        &self,
        payload: &Value,
    ) -> PaymentResult<GatewayResponse<TransactionData>> {
        let amount = payload.get("amount").cloned().unwrap_or_default();
        let currency = payload.get("currency").cloned().unwrap_or_default();
        info!("Charging Paystack authorization: amount={} currency={}", amount, currency);

        let url = self.endpoint(&["transaction", "charge_authorization"])?;
        let response: GatewayResponse<TransactionData> = self
            .make_request(
                Method::POST,
                url,
                Some(payload),
                "Failed to charge authorization",
            )
            .await?;

        info!(
            "Paystack authorization charged: status={}, paused={}",
            response.data.status_or_unknown(),
            response.data.paused
        );
        Ok(response)
    }

    async fn create_refund(
        &self,
        transaction: &str,
        amount: i64,
    ) -> PaymentResult<GatewayResponse<RefundData>> {
        info!(
            "Creating Paystack refund: transaction={}, amount={}",
            transaction, amount
        );

        let payload = serde_json::json!({
            "transaction": transaction,
            "amount": amount,
        });

        let url = self.endpoint(&["refund"])?;
        let response: GatewayResponse<RefundData> = self
            .make_request(
                Method::POST,
                url,
                Some(&payload),
                "Failed to refund transaction",
            )
            .await?;

        info!(
            "Paystack refund created: transaction={}, status={}",
            transaction,
            response.data.status.as_deref().unwrap_or("unknown")
        );
        Ok(response)
    }
}
