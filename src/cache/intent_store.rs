//! Redis-backed checkout intent store
//!
//! Intents are JSON values under `paystack:intent:<order_hash>` with a TTL,
//! so an abandoned checkout cleans itself up.

use super::error::CacheResult;
use super::keys::intent_key;
use super::RedisPool;
use crate::error::PaymentResult;
use crate::payments::intent::{CheckoutIntent, IntentStore, DEFAULT_INTENT_TTL};
use async_trait::async_trait;
use bb8::PooledConnection;
use bb8_redis::RedisConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, warn};

type RedisConnection<'a> = PooledConnection<'a, RedisConnectionManager>;

#[derive(Clone)]
pub struct RedisIntentStore {
    pool: RedisPool,
    ttl: Duration,
}

impl RedisIntentStore {
    pub fn new(pool: RedisPool) -> Self {
        Self::with_ttl(pool, DEFAULT_INTENT_TTL)
    }

    pub fn with_ttl(pool: RedisPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    async fn get_connection(&self) -> CacheResult<RedisConnection<'_>> {
        self.pool.get().await.map_err(|e| {
            warn!("Failed to get Redis connection: {}", e);
            e.into()
        })
    }
}

#[async_trait]
impl IntentStore for RedisIntentStore {
    async fn remember(&self, order_hash: &str, intent: CheckoutIntent) -> PaymentResult<()> {
        let key = intent_key(order_hash);
        let json_str = serde_json::to_string(&intent).map_err(super::CacheError::from)?;

        let mut conn = self.get_connection().await?;
        let _: () = conn
            .set_ex(&key, json_str, self.ttl.as_secs().max(1))
            .await
            .map_err(|e| {
                warn!("Redis SET_EX failed for key '{}': {}", key, e);
                super::CacheError::from(e)
            })?;

        debug!("Stored checkout intent for order {}", order_hash);
        Ok(())
    }

    async fn recall(&self, order_hash: &str) -> PaymentResult<Option<CheckoutIntent>> {
        let key = intent_key(order_hash);
        let mut conn = self.get_connection().await?;

        let result: Option<String> = conn.get(&key).await.map_err(|e| {
            warn!("Redis GET failed for key '{}': {}", key, e);
            super::CacheError::from(e)
        })?;

        match result {
            Some(json_str) => {
                let intent = serde_json::from_str(&json_str).map_err(|e| {
                    warn!("Failed to deserialize checkout intent '{}': {}", key, e);
                    super::CacheError::from(e)
                })?;
                Ok(Some(intent))
            }
            None => Ok(None),
        }
    }

    async fn forget(&self, order_hash: &str) -> PaymentResult<()> {
        let key = intent_key(order_hash);
        let mut conn = self.get_connection().await?;

        let _: () = conn.del(&key).await.map_err(|e| {
            warn!("Redis DEL failed for key '{}': {}", key, e);
            super::CacheError::from(e)
        })?;

        Ok(())
    }
}
