use crate::database::error::{DatabaseError, DatabaseErrorKind};
use crate::error::PaymentResult;
use crate::payments::traits::ProfileRepository;
use crate::payments::types::PaymentProfile;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const PAYMENT_CODE: &str = "paystack";

#[derive(Debug, Clone, FromRow)]
struct ProfileRow {
    id: Uuid,
    customer_id: i64,
    card_brand: Option<String>,
    last_four: Option<String>,
    provider_data: Value,
}

impl TryFrom<ProfileRow> for PaymentProfile {
    type Error = DatabaseError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let provider_data = match row.provider_data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(DatabaseError::new(DatabaseErrorKind::Decode {
                    message: format!("provider_data must be an object, got {}", other),
                }))
            }
        };

        Ok(PaymentProfile {
            id: row.id,
            customer_id: row.customer_id,
            card_brand: row.card_brand,
            last_four: row.last_four,
            provider_data,
        })
    }
}

/// Saved Paystack cards, one per customer
#[derive(Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn find_profile(&self, customer_id: i64) -> PaymentResult<Option<PaymentProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, customer_id, card_brand, last_four, provider_data
             FROM payment_profiles
             WHERE customer_id = $1 AND payment_code = $2",
        )
        .bind(customer_id)
        .bind(PAYMENT_CODE)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(row.map(PaymentProfile::try_from).transpose()?)
    }

    async fn save_profile(&self, profile: &PaymentProfile) -> PaymentResult<()> {
        sqlx::query(
            "INSERT INTO payment_profiles
                (id, customer_id, payment_code, card_brand, last_four, provider_data)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (customer_id, payment_code) DO UPDATE
             SET card_brand = EXCLUDED.card_brand,
                 last_four = EXCLUDED.last_four,
                 provider_data = EXCLUDED.provider_data,
                 updated_at = NOW()",
        )
        .bind(profile.id)
        .bind(profile.customer_id)
        .bind(PAYMENT_CODE)
        .bind(&profile.card_brand)
        .bind(&profile.last_four)
        .bind(Value::Object(profile.provider_data.clone()))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(())
    }
}
