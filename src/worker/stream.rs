//! WebSocket stream loop (C5, half two): subscribes to `tm.event='Tx'`,
//! backfills on connect, and applies payments as they arrive — converging
//! with the poll loop purely through apply-idempotency (spec.md §4.5, §9).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::chain::types::extract_transfers;
use crate::chain::ws::{next_backoff, WsSubscription};
use crate::db::Database;
use crate::orders::OrderService;
use crate::worker::sync::SyncWorker;

const MIN_BACKOFF: Duration = Duration::from_secs(2);

pub struct StreamWorkerConfig {
    pub ws_endpoints: Vec<String>,
    pub ws_backfill_blocks: u64,
    pub ws_failover_threshold: u32,
    pub denom: String,
}

pub struct StreamWorker {
    sync: Arc<SyncWorker>,
    orders: Arc<OrderService>,
    db: Arc<Database>,
    config: StreamWorkerConfig,
}

impl StreamWorker {
    pub fn new(sync: Arc<SyncWorker>, orders: Arc<OrderService>, db: Arc<Database>, config: StreamWorkerConfig) -> Self {
        Self { sync, orders, db, config }
    }

    /// Runs the reconnect-forever WS loop until `shutdown` is cancelled. A
    /// no-op (immediate return) if no WS endpoints are configured.
    pub async fn run(&self, shutdown: CancellationToken) {
        if self.config.ws_endpoints.is_empty() {
            tracing::info!("ws disabled: no ws endpoints configured");
            return;
        }

        let mut endpoint_index = 0usize;
        let mut fail_count: u32 = 0;
        let mut backoff = MIN_BACKOFF;

        loop {
            if shutdown.is_cancelled() {
                tracing::info!("stream loop shutting down");
                return;
            }

            let endpoint = &self.config.ws_endpoints[endpoint_index];
            match WsSubscription::connect(endpoint).await {
                Ok(mut sub) => {
                    tracing::info!("ws connected {endpoint}");
                    fail_count = 0;
                    backoff = MIN_BACKOFF;

                    self.sync.backfill_recent(self.config.ws_backfill_blocks).await;

                    loop {
                        tokio::select! {
                            _ = shutdown.cancelled() => {
                                let _ = sub.close().await;
                                tracing::info!("stream loop shutting down");
                                return;
                            }
                            msg = sub.next_tx() => {
                                match msg {
                                    Ok(tx) => {
                                        if tx.code != 0 || tx.hash.is_empty() {
                                            continue;
                                        }
                                        self.handle_tx(&tx).await;
                                    }
                                    Err(e) => {
                                        tracing::warn!("ws read failed: {e}");
                                        fail_count += 1;
                                        if fail_count >= self.config.ws_failover_threshold && self.config.ws_endpoints.len() > 1 {
                                            endpoint_index = (endpoint_index + 1) % self.config.ws_endpoints.len();
                                            fail_count = 0;
                                        }
                                        break;
                                    }
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("ws connect failed ({endpoint}): {e}");
                    fail_count += 1;
                    if fail_count >= self.config.ws_failover_threshold && self.config.ws_endpoints.len() > 1 {
                        endpoint_index = (endpoint_index + 1) % self.config.ws_endpoints.len();
                        fail_count = 0;
                    }
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = next_backoff(backoff);
        }
    }

    async fn handle_tx(&self, tx: &crate::chain::types::Tx) {
        for transfer in extract_transfers(&tx.events, &self.config.denom) {
            let order = match self.db.get_open_order_by_recipient(&transfer.recipient).await {
                Ok(Some(order)) => order,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("ws get order failed: {e}");
                    continue;
                }
            };

            let block_time = tx.timestamp.unwrap_or_else(Utc::now);
            match self
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
                .await
            {
                Ok((status, updated)) => {
                    if updated {
                        tracing::info!("ws order {} -> {status} tx={}", order.order_id, tx.hash);
                    }
                }
                Err(e) => tracing::warn!("ws apply payment failed: {e}"),
            }
        }
    }
}
