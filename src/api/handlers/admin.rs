//! Admin/operational handlers: tx verification and order listing (spec.md §6).

use axum::extract::{Path, Query, State};
use axum::Json;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::api::types::{AdminOrder, AdminOrderListResponse, AdminOrderQueryParams, VerifyTxRequest, VerifyTxResponse};
use crate::chain::extract_transfers;

const DEFAULT_LIMIT: i64 = 50;

/// `POST /admin/verify-tx` — looks up a transaction by hash, re-extracts its
/// transfers, and applies payment against any matching open order.
pub async fn verify_tx(
    State(state): State<AppState>,
    Json(req): Json<VerifyTxRequest>,
) -> ApiResult<Json<VerifyTxResponse>> {
    if req.tx_hash.trim().is_empty() {
        return Err(ApiError::BadRequest("txHash is required".to_string()));
    }
    let rpc = state
        .rpc
        .as_ref()
        .ok_or_else(|| ApiError::PreconditionFailed("rpc endpoints are not configured".to_string()))?;

    let tx = rpc.tx_by_hash(&req.tx_hash).await?;
    if tx.code != 0 {
        return Err(ApiError::BadRequest(format!("tx {} failed with code {}", req.tx_hash, tx.code)));
    }

    let transfers = extract_transfers(&tx.events, &state.denom);
    if transfers.is_empty() {
        return Err(ApiError::BadRequest(format!("tx {} carries no matching transfer", req.tx_hash)));
    }

    let mut items = Vec::new();
    for transfer in &transfers {
        let Some(order) = state.db.get_open_order_by_recipient(&transfer.recipient).await? else {
            continue;
        };
        let block_time = tx.timestamp.unwrap_or_else(chrono::Utc::now);
        state
            .orders
            .apply_payment(
                &order,
                &tx.hash,
                &transfer.amount,
                transfer.sender.as_deref(),
                &order.recipient_address,
                tx.height as i64,
                block_time,
            )
            .await?;
        let refreshed = state.orders.get_order(&order.order_id).await?;
        items.push(AdminOrder::from(refreshed));
    }

    if items.is_empty() {
        return Err(ApiError::NotFound(format!("no order matches a recipient in tx {}", req.tx_hash)));
    }

    Ok(Json(VerifyTxResponse { items }))
}

/// `GET /admin/orders?status=&limit=&offset=`
pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<AdminOrderQueryParams>,
) -> ApiResult<Json<AdminOrderListResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 500);
    let offset = params.offset.unwrap_or(0).max(0);
    let orders = state.db.list_orders(params.status.as_deref(), limit, offset).await?;
    Ok(Json(AdminOrderListResponse {
        items: orders.into_iter().map(AdminOrder::from).collect(),
        limit,
        offset,
    }))
}

/// `GET /admin/orders/{orderId}`
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> ApiResult<Json<AdminOrder>> {
    if order_id.is_empty() {
        return Err(ApiError::BadRequest("order id is required".to_string()));
    }
    let order = state.orders.get_order(&order_id).await?;
    Ok(Json(order.into()))
}
