//! Payment reconciliation engine
//!
//! Drives an order from `Unpaid` through transaction initialization to
//! settlement. Settlement can be reached through two independent paths: the
//! payer returning from Paystack (verified server-side) and the signed
//! `charge.success` webhook. Whichever path settles first wins; the other
//! observes `is_payment_processed` and does nothing.
//!
//! Every failure is written to the order's attempt log before it is returned.

use crate::config::PaymentSettings;
use crate::error::{PaymentError, PaymentResult, TRANSACTION_FAILED_MESSAGE};
use crate::payments::intent::{CheckoutIntent, IntentStore};
use crate::payments::metadata::MetadataCodec;
use crate::payments::traits::{
    OrderRepository, PaymentGateway, ProfileRepository, ProfileStore, Refunder,
    TransactionInitializer,
};
use crate::payments::types::{
    to_minor_units, ChargeOutcome, IntegrationType, NewPaymentAttempt, Order, PaymentAttempt,
    PaymentFormOutcome, PaymentProfile, RefundAmount, TransactionData, WebhookEvent, WebhookReply,
};
use crate::payments::webhook::verify_signature;
use async_trait::async_trait;
use http::Method;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const PAYMENT_SUCCESSFUL_MESSAGE: &str = "Payment successful.";

pub const CANCEL_ENTRY_POINT: &str = "cancel-url";
pub const RETURN_ENTRY_POINT: &str = "payment-successful";

const CHARGE_SUCCESS_EVENT: &str = "charge.success";

const SUPPORTED_CARD_ICONS: [&str; 7] = [
    "visa",
    "mastercard",
    "paypal",
    "amex",
    "discover",
    "diners-club",
    "jcb",
];

pub struct ReconciliationEngine {
    settings: PaymentSettings,
    gateway: Arc<dyn PaymentGateway>,
    orders: Arc<dyn OrderRepository>,
    profiles: Arc<dyn ProfileRepository>,
    intents: Arc<dyn IntentStore>,
    metadata: MetadataCodec,
}

impl ReconciliationEngine {
    pub fn new(
        settings: PaymentSettings,
        gateway: Arc<dyn PaymentGateway>,
        orders: Arc<dyn OrderRepository>,
        profiles: Arc<dyn ProfileRepository>,
        intents: Arc<dyn IntentStore>,
    ) -> Self {
        Self {
            settings,
            gateway,
            orders,
            profiles,
            intents,
            metadata: MetadataCodec::new(),
        }
    }

    pub fn with_metadata_codec(mut self, metadata: MetadataCodec) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn settings(&self) -> &PaymentSettings {
        &self.settings
    }

    pub fn is_card_icon_supported(card_type: &str) -> bool {
        SUPPORTED_CARD_ICONS.contains(&card_type)
    }

    /// Fee shown next to Paystack on the checkout page, `None` when the
    /// method is not offered for this total
    pub fn payment_fee(&self, order_total: Decimal) -> Option<Decimal> {
        self.settings
            .is_applicable(order_total)
            .then(|| self.settings.applicable_fee(order_total))
    }

    pub async fn find_order(&self, order_hash: &str) -> PaymentResult<Order> {
        self.orders
            .find_by_hash(order_hash)
            .await?
            .ok_or_else(|| PaymentError::not_found("Order"))
    }

    /// Metadata for `order`, stringified the way Paystack expects it
    fn metadata_for(&self, order: &Order) -> String {
        let mut envelope = self.metadata.encode(order, &[]);
        envelope.cancel_action = Some(
            self.settings
                .entry_point_url(CANCEL_ENTRY_POINT, &order.hash),
        );
        serde_json::to_string(&envelope).unwrap_or_default()
    }

    fn base_payload(&self, order: &Order) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("email".into(), json!(order.email));
        payload.insert("amount".into(), json!(order.total_minor_units()));
        payload.insert("currency".into(), json!(self.settings.currency));
        payload.insert("metadata".into(), json!(self.metadata_for(order)));
        payload
    }

    /// Append a failed attempt and hand the error back
    ///
    /// A logging failure is reported but never replaces the original error.
    async fn fail<T>(
        &self,
        order: &Order,
        err: PaymentError,
        request: Value,
        response: Value,
    ) -> PaymentResult<T> {
        if err.is_integrity_failure() {
            warn!("Integrity check failed for order {}: {}", order.hash, err);
        }
        let attempt = NewPaymentAttempt::failure(err.to_string(), request, response);
        if let Err(log_err) = self.orders.log_payment_attempt(order, attempt).await {
            error!(
                "Failed to record payment attempt for order {}: {}",
                order.hash, log_err
            );
        }
        Err(err)
    }

    async fn settle(&self, order: &Order, request: Value, response: Value) -> PaymentResult<bool> {
        let attempt = NewPaymentAttempt::settlement(PAYMENT_SUCCESSFUL_MESSAGE, request, response);
        let settled = self
            .orders
            .settle(order, self.settings.order_status, attempt)
            .await?;

        if settled {
            info!(
                "Order {} settled with status {}",
                order.hash, self.settings.order_status
            );
        } else {
            info!(
                "Order {} was settled by a concurrent confirmation; nothing to do",
                order.hash
            );
        }
        Ok(settled)
    }

    fn check_amount(order: &Order, data: &TransactionData) -> PaymentResult<()> {
        let expected = order.total_minor_units();
        // A missing amount is read as 0 and lands in the mismatch branch
        let actual = data.amount.unwrap_or_else(|| {
            warn!(
                "Paystack payload for order {} carries no amount; treating it as 0",
                order.hash
            );
            0
        });

        if actual != expected {
            warn!(
                "Amount mismatch for order {}: expected {} got {}",
                order.hash, expected, actual
            );
            return Err(PaymentError::AmountMismatch { expected, actual });
        }
        Ok(())
    }

    async fn verify_and_settle(
        &self,
        order: &Order,
        reference: Option<&str>,
        request: Value,
    ) -> PaymentResult<()> {
        let reference = match reference.map(str::trim).filter(|r| !r.is_empty()) {
            Some(reference) => reference,
            None => {
                return self
                    .fail(order, PaymentError::TransactionFailed, request, json!({}))
                    .await
            }
        };

        let response = match self.gateway.verify_transaction(reference).await {
            Ok(response) => response,
            Err(err) => return self.fail(order, err, request, json!({})).await,
        };
        let snapshot = snapshot(&response);
        let data = &response.data;

        let decoded = MetadataCodec::decode_metadata(&data.metadata);
        if decoded.as_deref() != Some(order.hash.as_str()) {
            warn!(
                "Reference {} belongs to order {:?}, not {}",
                reference, decoded, order.hash
            );
            return self
                .fail(order, PaymentError::OrderHashMismatch, request, snapshot)
                .await;
        }

        if let Err(err) = Self::check_amount(order, data) {
            return self.fail(order, err, request, snapshot).await;
        }

        if !data.is_success() {
            let message = format!(
                "Payment verification returned status: {}",
                data.status_or_unknown()
            );
            let attempt = NewPaymentAttempt::failure(message, request, snapshot);
            if let Err(log_err) = self.orders.log_payment_attempt(order, attempt).await {
                error!(
                    "Failed to record payment attempt for order {}: {}",
                    order.hash, log_err
                );
            }
            return Err(PaymentError::TransactionFailed);
        }

        self.settle(order, request, snapshot).await?;

        let intent = match self.intents.recall(&order.hash).await {
            Ok(intent) => intent.unwrap_or_default(),
            Err(err) => {
                warn!("Could not read checkout intent for {}: {}", order.hash, err);
                CheckoutIntent::default()
            }
        };

        if let (true, Some(authorization), Some(customer_id)) = (
            intent.create_payment_profile,
            data.authorization.as_ref().filter(|auth| auth.reusable),
            order.customer_id,
        ) {
            if let Err(err) = self
                .update_profile(customer_id, authorization.to_profile_data())
                .await
            {
                warn!(
                    "Payment settled but saving the card for customer {} failed: {}",
                    customer_id, err
                );
            }
        }

        Ok(())
    }

    async fn handle_charge_success(&self, raw: Value, event: WebhookEvent) -> WebhookReply {
        let data = event.data;

        let order_hash = match MetadataCodec::decode_metadata(&data.metadata) {
            Some(hash) => hash,
            None => return WebhookReply::bad_request("Order hash not found"),
        };

        let order = match self.orders.find_by_hash(&order_hash).await {
            Ok(Some(order)) => order,
            Ok(None) => return WebhookReply::not_found("Order not found"),
            Err(err) => {
                error!("Failed to load order {} for webhook: {}", order_hash, err);
                return WebhookReply::server_error("Internal error");
            }
        };

        if order.is_payment_processed {
            info!("Webhook for already processed order {}", order.hash);
            return WebhookReply::ok("Order already processed");
        }

        if let Err(err) = Self::check_amount(&order, &data) {
            let attempt = NewPaymentAttempt::failure(err.to_string(), raw, snapshot(&data));
            if let Err(log_err) = self.orders.log_payment_attempt(&order, attempt).await {
                error!(
                    "Failed to record webhook amount mismatch for order {}: {}",
                    order.hash, log_err
                );
            }
            return WebhookReply::bad_request("Amount mismatch");
        }

        if data.is_success() {
            match self.settle(&order, raw.clone(), raw).await {
                Ok(true) => {}
                Ok(false) => return WebhookReply::ok("Order already processed"),
                Err(err) => {
                    error!("Failed to settle order {} from webhook: {}", order.hash, err);
                    return WebhookReply::server_error("Internal error");
                }
            }
        } else {
            let message = data
                .message
                .clone()
                .or_else(|| data.gateway_response.clone())
                .unwrap_or_else(|| "Unknown error".to_string());
            let attempt = NewPaymentAttempt::failure(message, raw, snapshot(&data));
            if let Err(err) = self.orders.log_payment_attempt(&order, attempt).await {
                error!(
                    "Failed to record webhook attempt for order {}: {}",
                    order.hash, err
                );
            }
        }

        WebhookReply::ok("Webhook handled")
    }
}

#[async_trait]
impl TransactionInitializer for ReconciliationEngine {
    async fn process_payment_form(
        &self,
        order: &Order,
        wants_saved_profile: bool,
    ) -> PaymentResult<PaymentFormOutcome> {
        if !self.settings.is_applicable(order.order_total) {
            return Err(PaymentError::NotApplicable);
        }

        if self.settings.completes_payment_on_client() {
            return Ok(PaymentFormOutcome::CompletesOnClient);
        }

        let data = self
            .initialize_transaction(&order.hash, wants_saved_profile)
            .await?;

        match data.authorization_url.filter(|url| !url.is_empty()) {
            Some(url) => Ok(PaymentFormOutcome::Redirect { url }),
            None => {
                self.fail(
                    order,
                    PaymentError::TransactionFailed,
                    json!({}),
                    json!({ "reference": data.reference }),
                )
                .await
            }
        }
    }

    async fn initialize_transaction(
        &self,
        order_hash: &str,
        wants_saved_profile: bool,
    ) -> PaymentResult<TransactionData> {
        let order = self.find_order(order_hash).await?;

        self.intents.forget(&order.hash).await?;
        if wants_saved_profile {
            self.intents
                .remember(
                    &order.hash,
                    CheckoutIntent {
                        create_payment_profile: true,
                    },
                )
                .await?;
        }

        let mut payload = self.base_payload(&order);
        if self.settings.integration_type == IntegrationType::Redirect {
            payload.insert(
                "callback_url".into(),
                json!(self
                    .settings
                    .entry_point_url(RETURN_ENTRY_POINT, &order.hash)),
            );
        }

        match self
            .gateway
            .initialize_transaction(&Value::Object(payload))
            .await
        {
            Ok(response) => Ok(response.data),
            Err(err) => self.fail(&order, err, json!({}), json!({})).await,
        }
    }

    async fn confirm_by_return(
        &self,
        order_hash: &str,
        reference: Option<&str>,
    ) -> PaymentResult<()> {
        let order = self.find_order(order_hash).await?;

        if order.is_payment_processed {
            info!("Order {} already processed; skipping verification", order.hash);
            return Ok(());
        }

        let request = json!({ "reference": reference });
        let result = self.verify_and_settle(&order, reference, request).await;

        if let Err(err) = self.intents.forget(&order.hash).await {
            warn!("Could not clear checkout intent for {}: {}", order.hash, err);
        }

        result
    }

    async fn confirm_by_webhook(
        &self,
        method: &Method,
        signature: Option<&str>,
        body: &[u8],
    ) -> WebhookReply {
        if *method != Method::POST {
            return WebhookReply::bad_request("Request method must be POST");
        }

        let signature = match signature.filter(|s| !s.trim().is_empty()) {
            Some(signature) => signature,
            None => return WebhookReply::bad_request("Missing signature"),
        };

        if !verify_signature(self.settings.secret_key(), body, signature) {
            warn!("Rejected Paystack webhook with invalid signature");
            return WebhookReply::bad_request("Invalid signature");
        }

        let raw: Value = match serde_json::from_slice(body) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("Rejected Paystack webhook with malformed body: {}", err);
                return WebhookReply::bad_request("Invalid payload");
            }
        };

        let event: WebhookEvent = match serde_json::from_value(raw.clone()) {
            Ok(event) => event,
            Err(err) => {
                warn!("Rejected Paystack webhook with malformed event: {}", err);
                return WebhookReply::bad_request("Invalid payload");
            }
        };

        if event.event != CHARGE_SUCCESS_EVENT {
            info!("Ignoring Paystack webhook event '{}'", event.event);
            return WebhookReply::ok("Webhook received");
        }

        self.handle_charge_success(raw, event).await
    }
}

#[async_trait]
impl ProfileStore for ReconciliationEngine {
    async fn update_profile(
        &self,
        customer_id: i64,
        data: Map<String, Value>,
    ) -> PaymentResult<PaymentProfile> {
        let mut profile = self
            .profiles
            .find_profile(customer_id)
            .await?
            .unwrap_or_else(|| PaymentProfile::new(customer_id));

        profile.provider_data.extend(data);
        profile.card_brand = profile
            .provider_data
            .get("card_type")
            .and_then(Value::as_str)
            .map(str::to_lowercase);
        profile.last_four = profile
            .provider_data
            .get("last4")
            .and_then(Value::as_str)
            .map(str::to_string);

        self.profiles.save_profile(&profile).await?;
        info!("Saved Paystack card for customer {}", customer_id);
        Ok(profile)
    }

    async fn delete_profile(&self, profile: &PaymentProfile) -> PaymentResult<()> {
        // Paystack has no API for revoking an authorization
        info!(
            "Leaving Paystack authorization for customer {} in place",
            profile.customer_id
        );
        Ok(())
    }

    async fn profile_exists(&self, customer_id: i64) -> PaymentResult<bool> {
        Ok(self
            .profiles
            .find_profile(customer_id)
            .await?
            .map_or(false, |profile| profile.authorization_code().is_some()))
    }

    async fn charge_saved_profile(
        &self,
        order: &Order,
        extra: Map<String, Value>,
    ) -> PaymentResult<ChargeOutcome> {
        if order.is_payment_processed {
            info!("Order {} already processed; not charging saved card", order.hash);
            return Ok(ChargeOutcome::Settled);
        }

        let profile = match order.customer_id {
            Some(customer_id) => self.profiles.find_profile(customer_id).await?,
            None => None,
        };
        let authorization_code = match profile.as_ref().and_then(|p| p.authorization_code()) {
            Some(code) => code.to_string(),
            None => {
                return self
                    .fail(order, PaymentError::ProfileNotFound, json!({}), json!({}))
                    .await
            }
        };

        let mut payload = self.base_payload(order);
        payload.insert("authorization_code".into(), json!(authorization_code));
        for (key, value) in extra {
            payload.entry(key).or_insert(value);
        }
        let payload = Value::Object(payload);

        let response = match self.gateway.charge_authorization(&payload).await {
            Ok(response) => response,
            Err(err) => return self.fail(order, err, payload, json!({})).await,
        };
        let snapshot = snapshot(&response);
        let data = &response.data;

        if data.paused {
            if let Some(url) = data.authorization_url.clone().filter(|url| !url.is_empty()) {
                info!(
                    "Paystack paused the charge for order {}; payer must complete it",
                    order.hash
                );
                return Ok(ChargeOutcome::RequiresAction { redirect_url: url });
            }
        }

        if !data.is_success() {
            let message = data
                .gateway_response
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| response.message.clone());
            return self
                .fail(order, PaymentError::ChargeFailed { message }, payload, snapshot)
                .await;
        }

        self.settle(order, payload, snapshot).await?;
        Ok(ChargeOutcome::Settled)
    }
}

#[async_trait]
impl Refunder for ReconciliationEngine {
    async fn refund(
        &self,
        order: &Order,
        attempt: &PaymentAttempt,
        amount: RefundAmount,
    ) -> PaymentResult<()> {
        if attempt.is_refunded() || !attempt.response.is_object() {
            return self
                .fail(order, PaymentError::NothingToRefund, json!({}), json!({}))
                .await;
        }

        let original = &attempt.response;
        if original.pointer("/data/status").and_then(Value::as_str) != Some("success") {
            return self
                .fail(order, PaymentError::NotSettled, json!({}), json!({}))
                .await;
        }

        let reference = match original.pointer("/data/reference").and_then(Value::as_str) {
            Some(reference) => reference.to_string(),
            None => {
                return self
                    .fail(order, PaymentError::NothingToRefund, json!({}), json!({}))
                    .await
            }
        };

        let refund_amount = match amount {
            RefundAmount::Full => order.order_total,
            RefundAmount::Partial(requested) => requested,
        };

        if refund_amount > order.order_total {
            return self
                .fail(order, PaymentError::RefundExceedsTotal, json!({}), json!({}))
                .await;
        }

        if refund_amount <= Decimal::ZERO {
            let err = PaymentError::RefundFailed {
                message: "Refund amount must be greater than zero".to_string(),
            };
            return self.fail(order, err, json!({}), json!({})).await;
        }

        let minor_units = to_minor_units(refund_amount);
        let request = json!({ "transaction": reference, "amount": minor_units });

        let response = match self.gateway.create_refund(&reference, minor_units).await {
            Ok(response) => response,
            Err(err) => {
                let err = PaymentError::RefundFailed {
                    message: err.to_string(),
                };
                return self.fail(order, err, request, json!({})).await;
            }
        };
        let snapshot = snapshot(&response);

        match response.data.status.as_deref() {
            Some("success") | Some("pending") => {
                let message = format!("Payment {} refunded ({})", reference, refund_amount);
                let recorded = match self.orders.mark_attempt_refunded(attempt.id).await {
                    Ok(()) => {
                        let entry = NewPaymentAttempt::success(message, request.clone(), snapshot.clone());
                        self.orders.log_payment_attempt(order, entry).await
                    }
                    Err(err) => Err(err),
                };

                if let Err(err) = recorded {
                    // Paystack already moved the money; only local bookkeeping is missing
                    error!(
                        "Paystack accepted refund of {} minor units for transaction {} (order {}) but recording it failed: {}",
                        minor_units, reference, order.hash, err
                    );
                    return self.fail(order, err, request, snapshot).await;
                }

                info!(
                    "Refunded {} minor units of order {} (transaction {})",
                    minor_units, order.hash, reference
                );
                Ok(())
            }
            _ => {
                let message = if response.message.is_empty() {
                    TRANSACTION_FAILED_MESSAGE.to_string()
                } else {
                    response.message.clone()
                };
                self.fail(order, PaymentError::RefundFailed { message }, request, snapshot)
                    .await
            }
        }
    }
}

fn snapshot<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_icon_support() {
        assert!(ReconciliationEngine::is_card_icon_supported("visa"));
        assert!(ReconciliationEngine::is_card_icon_supported("mastercard"));
        assert!(ReconciliationEngine::is_card_icon_supported("diners-club"));
        assert!(!ReconciliationEngine::is_card_icon_supported("unknown"));
        assert!(!ReconciliationEngine::is_card_icon_supported("verve"));
    }
}
