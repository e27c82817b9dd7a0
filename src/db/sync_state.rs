use async_trait::async_trait;
use sqlx::PgPool;

use super::models::SyncStateRow;
use super::DbResult;

const LAST_PROCESSED_HEIGHT_KEY: &str = "last_processed_height";

/// Repository for the single-row-per-key `sync_state` table. Only one key
/// is used today (`last_processed_height`), stored as a decimal string so
/// it shares the same text-based-integer convention as `amount_peaka`.
#[async_trait]
pub trait SyncStateRepository: Send + Sync {
    async fn get_last_processed_height(&self) -> DbResult<u64>;
    async fn set_last_processed_height(&self, height: u64) -> DbResult<()>;
}

pub struct PostgresSyncStateRepository {
    pool: PgPool,
}

impl PostgresSyncStateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncStateRepository for PostgresSyncStateRepository {
    async fn get_last_processed_height(&self) -> DbResult<u64> {
        let row = sqlx::query_as::<_, SyncStateRow>("SELECT * FROM sync_state WHERE key = $1")
            .bind(LAST_PROCESSED_HEIGHT_KEY)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row
            .and_then(|r| r.value.parse().ok())
            .unwrap_or(0))
    }

    async fn set_last_processed_height(&self, height: u64) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_state (key, value, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
            "#,
        )
        .bind(LAST_PROCESSED_HEIGHT_KEY)
        .bind(height.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
