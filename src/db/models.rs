use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database model for Order — the central entity (spec.md §3).
///
/// `amount_peaka`, `derivation_index`, and `credit_requested` are stored as
/// text/bigint rather than native decimals: `amount_peaka` can exceed i64
/// range and is always routed through `bigint::parse_peaka` before any
/// arithmetic.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbOrder {
    pub order_id: String,
    pub user_id: String,
    pub recipient_address: String,
    pub derivation_index: i64,
    pub credit_requested: i64,
    pub amount_peaka: String,
    pub denom: String,
    pub price_snapshot: String,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub tx_hash: Option<String>,
    pub credit_issued: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Closed status enumeration (spec.md §3). `created`/`expired` are the only
/// non-terminal statuses; everything else is final.
pub mod status {
    pub const CREATED: &str = "created";
    pub const EXPIRED: &str = "expired";
    pub const PAID: &str = "paid";
    pub const PAID_LATE_REPRICED: &str = "paid_late_repriced";
    pub const LATE_NO_CREDIT: &str = "late_no_credit";
    pub const UNDERPAID: &str = "underpaid";
    pub const OVERPAID: &str = "overpaid";

    pub fn is_open(status: &str) -> bool {
        status == CREATED || status == EXPIRED
    }
}

/// Database model for Payment — a recorded on-chain transfer (spec.md §3).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbPayment {
    pub tx_hash: String,
    pub order_id: String,
    pub from_address: Option<String>,
    pub to_address: String,
    pub amount_peaka: String,
    pub denom: String,
    pub height: i64,
    pub block_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One row of the `sync_state` key-value store.
#[derive(Debug, Clone, FromRow)]
pub struct SyncStateRow {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}
