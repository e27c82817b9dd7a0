//! API handlers.
//!
//! - orders.rs: payment order creation and point reads
//! - admin.rs: tx verification and order listing

pub mod admin;
pub mod orders;

use axum::{extract::State, Json};

use crate::api::{state::AppState, types::HealthResponse};

pub use admin::{get_order as admin_get_order, list_orders, verify_tx};
pub use orders::{confirm_payment, create_order, get_order};

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = match state.db.health_check().await {
        Ok(_) => "ok",
        Err(_) => "degraded",
    };
    Json(HealthResponse { status: status.to_string() })
}
