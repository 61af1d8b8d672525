//! Payment trait definitions
//!
//! The seams between the reconciliation engine, the remote gateway and the
//! host order system. The engine consumes `PaymentGateway`,
//! `OrderRepository` and `ProfileRepository`; hosts drive it through
//! `TransactionInitializer`, `ProfileStore` and `Refunder`.

use crate::error::PaymentResult;
use crate::payments::types::{
    ChargeOutcome, GatewayResponse, NewPaymentAttempt, Order, PaymentAttempt, PaymentFormOutcome,
    PaymentProfile, RefundAmount, RefundData, TransactionData, WebhookReply,
};
use async_trait::async_trait;
use http::Method;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Remote payment API
///
/// Every non-2xx or `status: false` response becomes `PaymentError::Remote`.
/// Implementations do not retry.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start a transaction, returning the authorization URL and access code
    async fn initialize_transaction(
        &self,
        payload: &Value,
    ) -> PaymentResult<GatewayResponse<TransactionData>>;

    /// Look up a transaction by reference
    async fn verify_transaction(
        &self,
        reference: &str,
    ) -> PaymentResult<GatewayResponse<TransactionData>>;

    /// Charge a stored reusable authorization
    async fn charge_authorization(
        &self,
        payload: &Value,
    ) -> PaymentResult<GatewayResponse<TransactionData>>;

    /// Refund a transaction; `amount` is in minor units
    async fn create_refund(
        &self,
        transaction: &str,
        amount: i64,
    ) -> PaymentResult<GatewayResponse<RefundData>>;
}

/// Order persistence provided by the host
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_hash(&self, hash: &str) -> PaymentResult<Option<Order>>;

    /// Append an attempt log record to the order
    async fn log_payment_attempt(
        &self,
        order: &Order,
        attempt: NewPaymentAttempt,
    ) -> PaymentResult<PaymentAttempt>;

    /// Move the order to `status_id`, mark it processed and append the final
    /// attempt record, atomically
    ///
    /// Returns `false` without changing anything when the order was already
    /// processed by a concurrent caller.
    async fn settle(
        &self,
        order: &Order,
        status_id: i32,
        attempt: NewPaymentAttempt,
    ) -> PaymentResult<bool>;

    async fn mark_attempt_refunded(&self, attempt_id: Uuid) -> PaymentResult<()>;
}

/// Saved payment profile persistence provided by the host
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_profile(&self, customer_id: i64) -> PaymentResult<Option<PaymentProfile>>;

    async fn save_profile(&self, profile: &PaymentProfile) -> PaymentResult<()>;
}

/// Checkout and confirmation flows
#[async_trait]
pub trait TransactionInitializer: Send + Sync {
    /// Handle checkout form submission for `order`
    async fn process_payment_form(
        &self,
        order: &Order,
        wants_saved_profile: bool,
    ) -> PaymentResult<PaymentFormOutcome>;

    /// Open a Paystack transaction for the order identified by `order_hash`
    async fn initialize_transaction(
        &self,
        order_hash: &str,
        wants_saved_profile: bool,
    ) -> PaymentResult<TransactionData>;

    /// Confirm a payment after the payer returns from the popup or redirect
    async fn confirm_by_return(
        &self,
        order_hash: &str,
        reference: Option<&str>,
    ) -> PaymentResult<()>;

    /// Handle an incoming Paystack webhook
    async fn confirm_by_webhook(
        &self,
        method: &Method,
        signature: Option<&str>,
        body: &[u8],
    ) -> WebhookReply;
}

/// Saved card lifecycle
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn update_profile(
        &self,
        customer_id: i64,
        data: Map<String, Value>,
    ) -> PaymentResult<PaymentProfile>;

    async fn delete_profile(&self, profile: &PaymentProfile) -> PaymentResult<()>;

    async fn profile_exists(&self, customer_id: i64) -> PaymentResult<bool>;

    /// Charge the customer's saved card for `order`
    async fn charge_saved_profile(
        &self,
        order: &Order,
        extra: Map<String, Value>,
    ) -> PaymentResult<ChargeOutcome>;
}

#[async_trait]
pub trait Refunder: Send + Sync {
    async fn refund(
        &self,
        order: &Order,
        attempt: &PaymentAttempt,
        amount: RefundAmount,
    ) -> PaymentResult<()>;
}
