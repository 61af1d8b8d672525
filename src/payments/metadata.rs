//! Transaction metadata codec
//!
//! The metadata envelope is the only link between a Paystack transaction and
//! a local order. It is written on initialize/charge and read back from
//! verify responses and webhooks, which are untrusted input.

use crate::payments::types::{CustomField, MetadataEnvelope, Order};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

pub const ORDER_HASH_KEY: &str = "order_hash";

const RESERVED_KEYS: [&str; 2] = [ORDER_HASH_KEY, "custom_fields"];

/// Contributes extra custom fields for an order
pub type CustomFieldExtender =
    Arc<dyn Fn(&[CustomField], &Order) -> Vec<CustomField> + Send + Sync>;

/// Contributes extra root-level metadata entries for an order
pub type MetadataExtender =
    Arc<dyn Fn(&MetadataEnvelope, &Order) -> Map<String, Value> + Send + Sync>;

#[derive(Clone, Default)]
pub struct MetadataCodec {
    field_extenders: Vec<CustomFieldExtender>,
    metadata_extenders: Vec<MetadataExtender>,
}

impl fmt::Debug for MetadataCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataCodec")
            .field("field_extenders", &self.field_extenders.len())
            .field("metadata_extenders", &self.metadata_extenders.len())
            .finish()
    }
}

impl MetadataCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom field extender; extenders run in registration order
    pub fn with_custom_fields<F>(mut self, extender: F) -> Self
    where
        F: Fn(&[CustomField], &Order) -> Vec<CustomField> + Send + Sync + 'static,
    {
        self.field_extenders.push(Arc::new(extender));
        self
    }

    /// Register a metadata extender; extenders run in registration order
    pub fn with_metadata<F>(mut self, extender: F) -> Self
    where
        F: Fn(&MetadataEnvelope, &Order) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.metadata_extenders.push(Arc::new(extender));
        self
    }

    /// Base custom fields followed by every extender's contribution
    pub fn custom_fields(&self, order: &Order) -> Vec<CustomField> {
        let mut fields = vec![
            CustomField::new("Invoice ID", "invoice_id", order.order_id),
            CustomField::new("Customer Name", "customer_name", order.customer_name()),
            CustomField::new("Customer Email", "customer_email", order.email.clone()),
            CustomField::new(
                "Customer Phone",
                "customer_phone",
                order.telephone.clone().unwrap_or_default(),
            ),
            CustomField::new("Order Hash", ORDER_HASH_KEY, order.hash.clone()),
        ];

        for extender in &self.field_extenders {
            let extra = extender(&fields, order);
            fields.extend(extra);
        }

        fields
    }

    /// Build the envelope for `order`; `extra_fields` are appended last
    pub fn encode(&self, order: &Order, extra_fields: &[CustomField]) -> MetadataEnvelope {
        let mut custom_fields = self.custom_fields(order);
        custom_fields.extend_from_slice(extra_fields);

        let mut envelope = MetadataEnvelope {
            order_hash: order.hash.clone(),
            custom_fields,
            cancel_action: None,
            extensions: Map::new(),
        };

        for extender in &self.metadata_extenders {
            for (key, value) in extender(&envelope, order) {
                if RESERVED_KEYS.contains(&key.as_str()) {
                    warn!("Ignoring metadata extension for reserved key '{}'", key);
                    continue;
                }
                envelope.extensions.insert(key, value);
            }
        }

        envelope
    }

    /// Recover the order hash from a provider payload (`{ data: { metadata } }`)
    pub fn decode(payload: &Value) -> Option<String> {
        payload
            .get("data")
            .and_then(|data| data.get("metadata"))
            .and_then(Self::decode_metadata)
    }

    /// Recover the order hash from a metadata value
    ///
    /// Prefers the root `order_hash` key and falls back to the first custom
    /// field named `order_hash`. Metadata echoed back as a JSON string is
    /// parsed first. Never fails; malformed input yields `None`.
    pub fn decode_metadata(metadata: &Value) -> Option<String> {
        let parsed;
        let metadata = match metadata {
            Value::String(raw) => {
                parsed = serde_json::from_str::<Value>(raw).ok()?;
                &parsed
            }
            other => other,
        };

        if let Some(hash) = metadata
            .get(ORDER_HASH_KEY)
            .and_then(Value::as_str)
            .filter(|hash| !hash.is_empty())
        {
            return Some(hash.to_string());
        }

        metadata
            .get("custom_fields")
            .and_then(Value::as_array)?
            .iter()
            .find(|field| field.get("variable_name").and_then(Value::as_str) == Some(ORDER_HASH_KEY))
            .and_then(|field| field.get("value"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}
