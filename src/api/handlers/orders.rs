//! Payment order handlers: create and point-read (spec.md §6).

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::api::types::{CreateOrderRequest, CreateOrderResponse, OrderStatusResponse};

const USER_ID_HEADER: &str = "X-User-Id";

/// `POST /payments/orders`
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<Json<CreateOrderResponse>> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if user_id.is_empty() {
        return Err(ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")));
    }

    let order = state.orders.create_order(user_id, req.credit).await?;
    Ok(Json(order.into()))
}

/// `GET /payments/orders/{orderId}`
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> ApiResult<Json<OrderStatusResponse>> {
    if order_id.is_empty() {
        return Err(ApiError::BadRequest("order id is required".to_string()));
    }
    let order = state.orders.get_order(&order_id).await?;
    Ok(Json(order.into()))
}

/// `POST /payments/confirm` — reserved, per spec.md §6.
pub async fn confirm_payment() -> ApiError {
    ApiError::NotImplemented
}
