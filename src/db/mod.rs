pub mod models;
pub mod orders;
pub mod payments;
pub mod sync_state;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;

use models::DbOrder;
use orders::OrderRepository;
use payments::PaymentRepository;
use sync_state::SyncStateRepository;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("order not found: {0}")]
    OrderNotFound(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection manager for the reconciliation store.
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(60))
            .max_lifetime(Duration::from_secs(300))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> DbResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn health_check(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ===== Order methods =====

    pub async fn allocate_derivation_index(&self) -> DbResult<i64> {
        orders::PostgresOrderRepository::new(self.pool.clone())
            .allocate_derivation_index()
            .await
    }

    pub async fn create_order(&self, order: &DbOrder) -> DbResult<()> {
        orders::PostgresOrderRepository::new(self.pool.clone())
            .create(order)
            .await
    }

    pub async fn get_order(&self, order_id: &str) -> DbResult<DbOrder> {
        orders::PostgresOrderRepository::new(self.pool.clone())
            .get(order_id)
            .await
    }

    pub async fn get_open_orders(&self) -> DbResult<Vec<DbOrder>> {
        orders::PostgresOrderRepository::new(self.pool.clone())
            .get_open()
            .await
    }

    pub async fn get_open_order_by_recipient(&self, recipient_address: &str) -> DbResult<Option<DbOrder>> {
        orders::PostgresOrderRepository::new(self.pool.clone())
            .get_open_by_recipient(recipient_address)
            .await
    }

    pub async fn sweep_expired_orders(&self) -> DbResult<u64> {
        orders::PostgresOrderRepository::new(self.pool.clone())
            .sweep_expired()
            .await
    }

    pub async fn apply_settlement(
        &self,
        order_id: &str,
        new_status: &str,
        paid_at: DateTime<Utc>,
        tx_hash: &str,
        credit_issued: Option<i64>,
    ) -> DbResult<bool> {
        orders::PostgresOrderRepository::new(self.pool.clone())
            .apply_settlement(order_id, new_status, paid_at, tx_hash, credit_issued)
            .await
    }

    pub async fn list_orders(&self, status: Option<&str>, limit: i64, offset: i64) -> DbResult<Vec<DbOrder>> {
        orders::PostgresOrderRepository::new(self.pool.clone())
            .list(status, limit, offset)
            .await
    }

    // ===== Payment methods =====

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_payment_if_absent(
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
        payments::PostgresPaymentRepository::new(self.pool.clone())
            .insert_if_absent(tx_hash, order_id, from_address, to_address, amount_peaka, denom, height, block_time)
            .await
    }

    pub async fn get_payments_by_order(&self, order_id: &str) -> DbResult<Vec<models::DbPayment>> {
        payments::PostgresPaymentRepository::new(self.pool.clone())
            .get_by_order(order_id)
            .await
    }

    // ===== Sync state methods =====

    pub async fn get_last_processed_height(&self) -> DbResult<u64> {
        sync_state::PostgresSyncStateRepository::new(self.pool.clone())
            .get_last_processed_height()
            .await
    }

    pub async fn set_last_processed_height(&self, height: u64) -> DbResult<()> {
        sync_state::PostgresSyncStateRepository::new(self.pool.clone())
            .set_last_processed_height(height)
            .await
    }
}
