//! HTTP request/response DTOs (spec.md §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::DbOrder;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub credit: u64,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(rename = "amountPeaka")]
    pub amount_peaka: String,
    pub denom: String,
    #[serde(rename = "recipientAddress")]
    pub recipient_address: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    #[serde(rename = "priceSnapshot")]
    pub price_snapshot: String,
}

impl From<DbOrder> for CreateOrderResponse {
    fn from(o: DbOrder) -> Self {
        Self {
            order_id: o.order_id,
            amount_peaka: o.amount_peaka,
            denom: o.denom,
            recipient_address: o.recipient_address,
            expires_at: o.expires_at,
            price_snapshot: o.price_snapshot,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderStatusResponse {
    pub status: String,
    #[serde(rename = "amountPeaka")]
    pub amount_peaka: String,
    pub denom: String,
    #[serde(rename = "recipientAddress")]
    pub recipient_address: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    #[serde(rename = "paidAt", skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(rename = "txHash", skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(rename = "creditIssued", skip_serializing_if = "Option::is_none")]
    pub credit_issued: Option<i64>,
}

impl From<DbOrder> for OrderStatusResponse {
    fn from(o: DbOrder) -> Self {
        Self {
            status: o.status,
            amount_peaka: o.amount_peaka,
            denom: o.denom,
            recipient_address: o.recipient_address,
            expires_at: o.expires_at,
            paid_at: o.paid_at,
            tx_hash: o.tx_hash,
            credit_issued: o.credit_issued,
        }
    }
}

/// Full order view returned by the admin endpoints.
#[derive(Debug, Serialize)]
pub struct AdminOrder {
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub status: String,
    #[serde(rename = "recipientAddress")]
    pub recipient_address: String,
    #[serde(rename = "derivationIndex")]
    pub derivation_index: i64,
    #[serde(rename = "creditRequested")]
    pub credit_requested: i64,
    #[serde(rename = "amountPeaka")]
    pub amount_peaka: String,
    pub denom: String,
    #[serde(rename = "priceSnapshot")]
    pub price_snapshot: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    #[serde(rename = "paidAt", skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(rename = "txHash", skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(rename = "creditIssued", skip_serializing_if = "Option::is_none")]
    pub credit_issued: Option<i64>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<DbOrder> for AdminOrder {
    fn from(o: DbOrder) -> Self {
        Self {
            order_id: o.order_id,
            user_id: o.user_id,
            status: o.status,
            recipient_address: o.recipient_address,
            derivation_index: o.derivation_index,
            credit_requested: o.credit_requested,
            amount_peaka: o.amount_peaka,
            denom: o.denom,
            price_snapshot: o.price_snapshot,
            expires_at: o.expires_at,
            paid_at: o.paid_at,
            tx_hash: o.tx_hash,
            credit_issued: o.credit_issued,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminOrderListResponse {
    pub items: Vec<AdminOrder>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct VerifyTxRequest {
    #[serde(rename = "txHash")]
    pub tx_hash: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyTxResponse {
    pub items: Vec<AdminOrder>,
}

#[derive(Debug, Deserialize)]
pub struct AdminOrderQueryParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
