use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::models::DbPayment;
use super::DbResult;

/// Repository for recorded on-chain transfers. Insert is idempotent on
/// `tx_hash` — replays of the same transaction are no-ops (spec.md §3,
/// Invariant 6).
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Returns `true` if a new row was inserted, `false` if `tx_hash` already existed.
    async fn insert_if_absent(
        &self,
        tx_hash: &str,
        order_id: &str,
        from_address: Option<&str>,
        to_address: &str,
        amount_peaka: &str,
        denom: &str,
        height: i64,
        block_time: DateTime<Utc>,
    ) -> DbResult<bool>;

    async fn get_by_order(&self, order_id: &str) -> DbResult<Vec<DbPayment>>;
}

pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert_if_absent(
        &self,
        tx_hash: &str,
        order_id: &str,
        from_address: Option<&str>,
        to_address: &str,
        amount_peaka: &str,
        denom: &str,
        height: i64,
        block_time: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (tx_hash, order_id, from_address, to_address, amount_peaka, denom, height, block_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (tx_hash) DO NOTHING
            "#,
        )
        .bind(tx_hash)
        .bind(order_id)
        .bind(from_address)
        .bind(to_address)
        .bind(amount_peaka)
        .bind(denom)
        .bind(height)
        .bind(block_time)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get_by_order(&self, order_id: &str) -> DbResult<Vec<DbPayment>> {
        let rows = sqlx::query_as::<_, DbPayment>(
            "SELECT * FROM payments WHERE order_id = $1 ORDER BY created_at ASC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
