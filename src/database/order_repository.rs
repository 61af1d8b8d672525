use crate::database::error::{DatabaseError, DatabaseErrorKind, DbResult};
use crate::error::PaymentResult;
use crate::payments::traits::OrderRepository;
use crate::payments::types::{NewPaymentAttempt, Order, PaymentAttempt};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgExecutor, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

const PAYMENT_CODE: &str = "paystack";

#[derive(Debug, Clone, FromRow)]
struct OrderRow {
    order_id: i64,
    hash: String,
    customer_id: Option<i64>,
    first_name: String,
    last_name: String,
    email: String,
    telephone: Option<String>,
    order_total: Decimal,
    status_id: i32,
    is_payment_processed: bool,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            hash: row.hash,
            order_id: row.order_id,
            customer_id: row.customer_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            telephone: row.telephone,
            order_total: row.order_total,
            status_id: row.status_id,
            is_payment_processed: row.is_payment_processed,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct PaymentLogRow {
    id: Uuid,
    order_hash: String,
    message: String,
    is_success: bool,
    request: serde_json::Value,
    response: serde_json::Value,
    is_final: bool,
    refunded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<PaymentLogRow> for PaymentAttempt {
    fn from(row: PaymentLogRow) -> Self {
        PaymentAttempt {
            id: row.id,
            order_hash: row.order_hash,
            message: row.message,
            is_success: row.is_success,
            request: row.request,
            response: row.response,
            is_final: row.is_final,
            refunded_at: row.refunded_at,
            created_at: row.created_at,
        }
    }
}

/// Orders and their payment attempt log in Postgres
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attempt log for an order, oldest first
    pub async fn find_attempts(&self, order_hash: &str) -> DbResult<Vec<PaymentAttempt>> {
        let rows = sqlx::query_as::<_, PaymentLogRow>(
            "SELECT id, order_hash, message, is_success, request, response, is_final, refunded_at, created_at
             FROM payment_logs
             WHERE order_hash = $1
             ORDER BY created_at ASC",
        )
        .bind(order_hash)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PaymentAttempt::from).collect())
    }

    async fn insert_attempt<'e, E>(
        executor: E,
        order: &Order,
        attempt: NewPaymentAttempt,
    ) -> DbResult<PaymentAttempt>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, PaymentLogRow>(
            "INSERT INTO payment_logs
                (id, order_id, order_hash, payment_code, message, is_success, request, response, is_final)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id, order_hash, message, is_success, request, response, is_final, refunded_at, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(order.order_id)
        .bind(&order.hash)
        .bind(PAYMENT_CODE)
        .bind(&attempt.message)
        .bind(attempt.is_success)
        .bind(&attempt.request)
        .bind(&attempt.response)
        .bind(attempt.is_final)
        .fetch_one(executor)
        .await?;

        Ok(row.into())
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn find_by_hash(&self, hash: &str) -> PaymentResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT order_id, hash, customer_id, first_name, last_name, email, telephone,
                    order_total, status_id, is_payment_processed
             FROM orders
             WHERE hash = $1",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(row.map(Order::from))
    }

    async fn log_payment_attempt(
        &self,
        order: &Order,
        attempt: NewPaymentAttempt,
    ) -> PaymentResult<PaymentAttempt> {
        debug!(
            "Logging payment attempt for order {}: {}",
            order.hash, attempt.message
        );
        Ok(Self::insert_attempt(&self.pool, order, attempt).await?)
    }

    async fn settle(
        &self,
        order: &Order,
        status_id: i32,
        attempt: NewPaymentAttempt,
    ) -> PaymentResult<bool> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        // Compare-and-set: only the first settling caller flips the flag
        let updated = sqlx::query(
            "UPDATE orders
             SET status_id = $2, is_payment_processed = true, updated_at = NOW()
             WHERE hash = $1 AND is_payment_processed = false",
        )
        .bind(&order.hash)
        .bind(status_id)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(DatabaseError::from_sqlx)?;
            return Ok(false);
        }

        Self::insert_attempt(&mut *tx, order, attempt)
            .await
            .map_err(|e| e.with_context(format!("settle order {}", order.hash)))?;

        tx.commit().await.map_err(|e| {
            DatabaseError::new(DatabaseErrorKind::TransactionError {
                message: e.to_string(),
            })
        })?;

        info!("Order {} marked as payment processed", order.hash);
        Ok(true)
    }

    async fn mark_attempt_refunded(&self, attempt_id: Uuid) -> PaymentResult<()> {
        let result = sqlx::query(
            "UPDATE payment_logs SET refunded_at = NOW() WHERE id = $1 AND refunded_at IS NULL",
        )
        .bind(attempt_id)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::new(DatabaseErrorKind::NotFound {
                entity: "Unrefunded payment log".to_string(),
                id: attempt_id.to_string(),
            })
            .into());
        }

        Ok(())
    }
}
