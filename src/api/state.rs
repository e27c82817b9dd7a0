use std::sync::Arc;

use crate::chain::MultiRpcClient;
use crate::db::Database;
use crate::orders::OrderService;

/// Shared application state for the HTTP API (spec.md §5 "shared resources").
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub orders: Arc<OrderService>,
    /// Present when the API server is configured with chain RPC endpoints;
    /// backs `POST /admin/verify-tx`. Absent otherwise (412).
    pub rpc: Option<Arc<MultiRpcClient>>,
    pub denom: String,
}

impl AppState {
    pub fn new(
        db: Arc<Database>,
        orders: Arc<OrderService>,
        rpc: Option<Arc<MultiRpcClient>>,
        denom: String,
    ) -> Self {
        Self { db, orders, rpc, denom }
    }
}
