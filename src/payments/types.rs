//! Payment types and data structures
//!
//! Domain types shared by the reconciliation engine, the Paystack client and
//! the host persistence layer, plus the lenient wire types Paystack returns.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Paystack account mode; selects which secret key is active
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionMode {
    #[default]
    Test,
    Live,
}

/// How the payer completes the payment
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationType {
    /// Inline popup opened by the checkout page
    #[default]
    Popup,
    /// Browser redirect to the Paystack hosted page
    Redirect,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeeType {
    #[default]
    Fixed,
    Percentage,
}

/// Convert a decimal currency amount to minor units (kobo, cents, pesewas)
///
/// Rounds half away from zero. Saturates at `i64::MAX`, which can never match
/// a provider amount.
pub fn to_minor_units(amount: Decimal) -> i64 {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(i64::MAX)
}

/// Order as owned by the host order system
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Opaque correlation token shared with Paystack
    pub hash: String,
    /// Numeric invoice id
    pub order_id: i64,
    pub customer_id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub telephone: Option<String>,
    pub order_total: Decimal,
    pub status_id: i32,
    pub is_payment_processed: bool,
}

impl Order {
    pub fn total_minor_units(&self) -> i64 {
        to_minor_units(self.order_total)
    }

    pub fn customer_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Saved card for a customer, built from a reusable Paystack authorization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentProfile {
    pub id: Uuid,
    pub customer_id: i64,
    pub card_brand: Option<String>,
    pub last_four: Option<String>,
    pub provider_data: Map<String, Value>,
}

impl PaymentProfile {
    pub fn new(customer_id: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            card_brand: None,
            last_four: None,
            provider_data: Map::new(),
        }
    }

    /// Reusable authorization code, when the profile carries a non-empty one
    pub fn authorization_code(&self) -> Option<&str> {
        self.provider_data
            .get("authorization_code")
            .and_then(Value::as_str)
            .filter(|code| !code.is_empty())
    }
}

/// Append-only attempt log record attached to an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentAttempt {
    pub id: Uuid,
    pub order_hash: String,
    pub message: String,
    pub is_success: bool,
    pub request: Value,
    pub response: Value,
    /// Marks the record of final settlement
    pub is_final: bool,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PaymentAttempt {
    pub fn is_refunded(&self) -> bool {
        self.refunded_at.is_some()
    }
}

/// Attempt log entry before the host persists it
#[derive(Debug, Clone, PartialEq)]
pub struct NewPaymentAttempt {
    pub message: String,
    pub is_success: bool,
    pub request: Value,
    pub response: Value,
    pub is_final: bool,
}

impl NewPaymentAttempt {
    pub fn failure(message: impl Into<String>, request: Value, response: Value) -> Self {
        Self {
            message: message.into(),
            is_success: false,
            request,
            response,
            is_final: false,
        }
    }

    pub fn success(message: impl Into<String>, request: Value, response: Value) -> Self {
        Self {
            message: message.into(),
            is_success: true,
            request,
            response,
            is_final: false,
        }
    }

    pub fn settlement(message: impl Into<String>, request: Value, response: Value) -> Self {
        Self {
            is_final: true,
            ..Self::success(message, request, response)
        }
    }
}

/// Display field carried in the transaction metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomField {
    pub display_name: String,
    pub variable_name: String,
    pub value: Value,
}

impl CustomField {
    pub fn new(
        display_name: impl Into<String>,
        variable_name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            variable_name: variable_name.into(),
            value: value.into(),
        }
    }
}

/// Metadata attached to every Paystack transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetadataEnvelope {
    pub order_hash: String,
    pub custom_fields: Vec<CustomField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_action: Option<String>,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

// Paystack API response wrapper
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Default + Deserialize<'de>"))]
pub struct GatewayResponse<T: Default> {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: T,
}

/// Transaction payload returned by initialize, verify and charge_authorization,
/// and carried in `charge.success` webhooks
///
/// Every field is optional: Paystack omits fields depending on the endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransactionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_response: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<Authorization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub paused: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TransactionData {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }

    pub fn status_or_unknown(&self) -> &str {
        self.status.as_deref().unwrap_or("unknown")
    }
}

/// Card authorization attached to a successful transaction
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Authorization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last4: Option<String>,
    #[serde(default)]
    pub reusable: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Authorization {
    pub fn to_profile_data(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Refund payload returned by `/refund`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RefundData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Webhook event envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub event: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: TransactionData,
}

/// Result of charging a saved card
#[derive(Debug, Clone, PartialEq)]
pub enum ChargeOutcome {
    Settled,
    /// Paystack needs another interactive step (OTP, PIN); send the payer here
    RequiresAction { redirect_url: String },
}

/// Result of submitting the checkout form
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentFormOutcome {
    /// Popup flow: the client completes payment and confirms
    CompletesOnClient,
    Redirect { url: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefundAmount {
    Full,
    Partial(Decimal),
}

/// Plain-text acknowledgement returned to the webhook caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookReply {
    pub status: u16,
    pub message: &'static str,
}

impl WebhookReply {
    pub const fn ok(message: &'static str) -> Self {
        Self {
            status: 200,
            message,
        }
    }

    pub const fn bad_request(message: &'static str) -> Self {
        Self {
            status: 400,
            message,
        }
    }

    pub const fn not_found(message: &'static str) -> Self {
        Self {
            status: 404,
            message,
        }
    }

    /// Storage outage; Paystack will redeliver
    pub const fn server_error(message: &'static str) -> Self {
        Self {
            status: 500,
            message,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Paystack sends integers, but older payloads and hand-built tests use strings
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        // Minor units are whole; a fractional amount is treated as missing
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_minor_units_rounding() {
        assert_eq!(to_minor_units(dec!(100.00)), 10000);
        assert_eq!(to_minor_units(dec!(19.99)), 1999);
        assert_eq!(to_minor_units(dec!(0.005)), 1);
        assert_eq!(to_minor_units(dec!(10.124)), 1012);
    }

    #[test]
    fn test_transaction_data_is_lenient() {
        let data: TransactionData = serde_json::from_value(json!({
            "status": "success",
            "amount": "10000",
            "id": 42,
            "customer": {"email": "ada@example.com"}
        }))
        .unwrap();

        assert!(data.is_success());
        assert_eq!(data.amount, Some(10000));
        assert_eq!(data.extra.get("id"), Some(&json!(42)));

        let empty: TransactionData = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.amount, None);
        assert_eq!(empty.status_or_unknown(), "unknown");
    }

    #[test]
    fn test_fractional_amount_is_not_truncated() {
        let data: TransactionData = serde_json::from_value(json!({ "amount": 9999.9 })).unwrap();
        assert_eq!(data.amount, None);

        let data: TransactionData = serde_json::from_value(json!({ "amount": 10000.0 })).unwrap();
        assert_eq!(data.amount, Some(10000));
    }

    #[test]
    fn test_gateway_response_with_null_data() {
        let resp: GatewayResponse<TransactionData> =
            serde_json::from_value(json!({"status": false, "message": "Invalid key", "data": null}))
                .unwrap();
        assert!(!resp.status);
        assert_eq!(resp.data, TransactionData::default());
    }

    #[test]
    fn test_authorization_profile_data_keeps_extra_fields() {
        let auth: Authorization = serde_json::from_value(json!({
            "authorization_code": "AUTH_abc",
            "card_type": "Visa",
            "last4": "4081",
            "reusable": true,
            "exp_month": "12"
        }))
        .unwrap();

        let data = auth.to_profile_data();
        assert_eq!(data.get("authorization_code"), Some(&json!("AUTH_abc")));
        assert_eq!(data.get("exp_month"), Some(&json!("12")));
    }

    #[test]
    fn test_profile_requires_non_empty_authorization_code() {
        let mut profile = PaymentProfile::new(7);
        assert!(profile.authorization_code().is_none());

        profile
            .provider_data
            .insert("authorization_code".into(), json!(""));
        assert!(profile.authorization_code().is_none());

        profile
            .provider_data
            .insert("authorization_code".into(), json!("AUTH_abc"));
        assert_eq!(profile.authorization_code(), Some("AUTH_abc"));
    }
}
