use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::{handlers, state::AppState};

/// Builds the HTTP router (spec.md §6).
///
/// - `GET  /health`
/// - `POST /payments/orders`
/// - `GET  /payments/orders/:order_id`
/// - `POST /payments/confirm`              (reserved, 501)
/// - `POST /admin/verify-tx`
/// - `GET  /admin/orders`
/// - `GET  /admin/orders/:order_id`
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/payments/orders", post(handlers::create_order))
        .route("/payments/orders/:order_id", get(handlers::get_order))
        .route("/payments/confirm", post(handlers::confirm_payment))
        .route("/admin/verify-tx", post(handlers::verify_tx))
        .route("/admin/orders", get(handlers::list_orders))
        .route("/admin/orders/:order_id", get(handlers::admin_get_order))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
