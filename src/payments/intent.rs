//! Checkout intent store
//!
//! Remembers whether the pending checkout for an order should save the card
//! once payment succeeds. The redirect flow loses the original request, so the
//! intent is stored against the order hash between initialize and confirm.

use crate::error::PaymentResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// How long an unconfirmed checkout intent is kept
pub const DEFAULT_INTENT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutIntent {
    pub create_payment_profile: bool,
}

#[async_trait]
pub trait IntentStore: Send + Sync {
    async fn remember(&self, order_hash: &str, intent: CheckoutIntent) -> PaymentResult<()>;

    async fn recall(&self, order_hash: &str) -> PaymentResult<Option<CheckoutIntent>>;

    async fn forget(&self, order_hash: &str) -> PaymentResult<()>;
}

/// Process-local store, for single-instance deployments and tests
pub struct InMemoryIntentStore {
    ttl: Duration,
    entries: RwLock<HashMap<String, (CheckoutIntent, Instant)>>,
}

impl InMemoryIntentStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryIntentStore {
    fn default() -> Self {
        Self::new(DEFAULT_INTENT_TTL)
    }
}

#[async_trait]
impl IntentStore for InMemoryIntentStore {
    async fn remember(&self, order_hash: &str, intent: CheckoutIntent) -> PaymentResult<()> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, (_, stored_at)| now.duration_since(*stored_at) < self.ttl);
        entries.insert(order_hash.to_string(), (intent, now));
        debug!("Stored checkout intent for order {}", order_hash);
        Ok(())
    }

    async fn recall(&self, order_hash: &str) -> PaymentResult<Option<CheckoutIntent>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(order_hash)
            .filter(|(_, stored_at)| stored_at.elapsed() < self.ttl)
            .map(|(intent, _)| *intent))
    }

    async fn forget(&self, order_hash: &str) -> PaymentResult<()> {
        self.entries.write().await.remove(order_hash);
        Ok(())
    }
}
