use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::models::{status, DbOrder};
use super::{DbError, DbResult};

/// Repository for Order persistence and settlement transitions.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Allocates the next derivation index. Backed by a Postgres sequence:
    /// strictly monotonic, never reused, safe under concurrent callers.
    async fn allocate_derivation_index(&self) -> DbResult<i64>;

    async fn create(&self, order: &DbOrder) -> DbResult<()>;

    async fn get(&self, order_id: &str) -> DbResult<DbOrder>;

    /// Orders eligible for settlement evaluation: `status IN ('created', 'expired')`.
    async fn get_open(&self) -> DbResult<Vec<DbOrder>>;

    /// The open order paying to `recipient_address`, if any — used by the
    /// WS stream loop, which observes one transfer at a time rather than
    /// scanning all open orders.
    async fn get_open_by_recipient(&self, recipient_address: &str) -> DbResult<Option<DbOrder>>;

    /// `UPDATE orders SET status = 'expired' WHERE status = 'created' AND expires_at < now()`.
    /// Returns the number of rows flipped.
    async fn sweep_expired(&self) -> DbResult<u64>;

    /// Conditional settlement update: targets `order_id AND status IN
    /// ('created', 'expired')` so concurrent appliers race safely and the
    /// first writer wins. Returns whether this call performed the update.
    #[allow(clippy::too_many_arguments)]
    async fn apply_settlement(
        &self,
        order_id: &str,
        new_status: &str,
        paid_at: DateTime<Utc>,
        tx_hash: &str,
        credit_issued: Option<i64>,
    ) -> DbResult<bool>;

    /// Admin listing: optionally filtered by status, newest first, paginated.
    async fn list(&self, status: Option<&str>, limit: i64, offset: i64) -> DbResult<Vec<DbOrder>>;
}

pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn allocate_derivation_index(&self) -> DbResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT nextval('order_derivation_index_seq')")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    async fn create(&self, order: &DbOrder) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                order_id, user_id, recipient_address, derivation_index,
                credit_requested, amount_peaka, denom, price_snapshot,
                status, expires_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&order.order_id)
        .bind(&order.user_id)
        .bind(&order.recipient_address)
        .bind(order.derivation_index)
        .bind(order.credit_requested)
        .bind(&order.amount_peaka)
        .bind(&order.denom)
        .bind(&order.price_snapshot)
        .bind(&order.status)
        .bind(order.expires_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, order_id: &str) -> DbResult<DbOrder> {
        sqlx::query_as::<_, DbOrder>("SELECT * FROM orders WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::OrderNotFound(order_id.to_string()))
    }

    async fn get_open(&self) -> DbResult<Vec<DbOrder>> {
        let orders = sqlx::query_as::<_, DbOrder>(
            "SELECT * FROM orders WHERE status = $1 OR status = $2 ORDER BY derivation_index ASC",
        )
        .bind(status::CREATED)
        .bind(status::EXPIRED)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    async fn get_open_by_recipient(&self, recipient_address: &str) -> DbResult<Option<DbOrder>> {
        let order = sqlx::query_as::<_, DbOrder>(
            "SELECT * FROM orders WHERE recipient_address = $1 AND (status = $2 OR status = $3) LIMIT 1",
        )
        .bind(recipient_address)
        .bind(status::CREATED)
        .bind(status::EXPIRED)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    async fn sweep_expired(&self) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE orders SET status = $1, updated_at = now() WHERE status = $2 AND expires_at < now()",
        )
        .bind(status::EXPIRED)
        .bind(status::CREATED)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn apply_settlement(
        &self,
        order_id: &str,
        new_status: &str,
        paid_at: DateTime<Utc>,
        tx_hash: &str,
        credit_issued: Option<i64>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $1, paid_at = $2, tx_hash = $3, credit_issued = $4, updated_at = now()
            WHERE order_id = $5 AND (status = $6 OR status = $7)
            "#,
        )
        .bind(new_status)
        .bind(paid_at)
        .bind(tx_hash)
        .bind(credit_issued)
        .bind(order_id)
        .bind(status::CREATED)
        .bind(status::EXPIRED)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list(&self, status: Option<&str>, limit: i64, offset: i64) -> DbResult<Vec<DbOrder>> {
        let orders = match status {
            Some(status) => {
                sqlx::query_as::<_, DbOrder>(
                    "SELECT * FROM orders WHERE status = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                )
                .bind(status)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, DbOrder>(
                    "SELECT * FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2",
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(orders)
    }
}
