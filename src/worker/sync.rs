//! Poll loop (C5, half one): fixed-interval backward scan with confirmation
//! depth and rewind overlap (spec.md §4.5).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::chain::types::extract_transfers;
use crate::chain::MultiRpcClient;
use crate::db::models::DbOrder;
use crate::db::Database;
use crate::orders::OrderService;

/// Event-attribute keys scanned per order, per spec.md §4.5 / original
/// `scanOrder`'s two-key loop.
const RECIPIENT_EVENT_KEYS: [&str; 2] = ["transfer.recipient", "coin_received.receiver"];

pub struct SyncWorkerConfig {
    pub denom: String,
    pub confirm_depth: u64,
    pub start_height: u64,
    pub rewind_blocks: u64,
    pub max_blocks_per_tick: u64,
    pub interval: Duration,
    pub per_page: u32,
}

pub struct SyncWorker {
    db: Arc<Database>,
    rpc: Arc<MultiRpcClient>,
    orders: Arc<OrderService>,
    config: SyncWorkerConfig,
}

impl SyncWorker {
    pub fn new(db: Arc<Database>, rpc: Arc<MultiRpcClient>, orders: Arc<OrderService>, config: SyncWorkerConfig) -> Self {
        Self { db, rpc, orders, config }
    }

    /// Runs the fixed-interval poll loop until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        let interval = self.config.interval.max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("poll loop shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sync_once().await {
                        tracing::error!("sync error: {e}");
                    }
                }
            }
        }
    }

    /// One tick of the poll loop, per spec.md §4.5 step list.
    pub async fn sync_once(&self) -> anyhow::Result<()> {
        let latest = self.rpc.latest_height().await?;
        let confirm_depth = self.config.confirm_depth;
        if latest <= confirm_depth {
            return Ok(());
        }
        let mut to = latest - confirm_depth;

        let last = self.db.get_last_processed_height().await?;
        let from = if last == 0 {
            if self.config.start_height > 0 {
                self.config.start_height
            } else {
                1
            }
        } else if self.config.rewind_blocks > 0 {
            if last > self.config.rewind_blocks {
                last - self.config.rewind_blocks + 1
            } else {
                1
            }
        } else {
            last + 1
        };

        if from > to {
            return Ok(());
        }
        if self.config.max_blocks_per_tick > 0 {
            let limit_to = from + self.config.max_blocks_per_tick - 1;
            if limit_to < to {
                to = limit_to;
            }
        }

        let expired = self.db.sweep_expired_orders().await?;
        if expired > 0 {
            tracing::info!("swept {expired} expired orders");
        }

        self.scan_range(from, to).await?;
        self.db.set_last_processed_height(to).await?;
        Ok(())
    }

    /// Backward scan of `[from, to]` across all open orders, used by both the
    /// poll loop and the stream loop's backfill.
    pub async fn scan_range(&self, from: u64, to: u64) -> anyhow::Result<()> {
        let orders = self.db.get_open_orders().await?;
        if orders.is_empty() {
            tracing::debug!("sync range={from}..{to} pending=0");
            return Ok(());
        }
        tracing::info!("sync range={from}..{to} pending={}", orders.len());
        for order in &orders {
            if let Err(e) = self.scan_order(order, from, to).await {
                tracing::error!("scan order {} failed: {e}", order.order_id);
            }
        }
        Ok(())
    }

    async fn scan_order(&self, order: &DbOrder, from: u64, to: u64) -> anyhow::Result<()> {
        let per_page = if self.config.per_page == 0 { 30 } else { self.config.per_page };

        for key in RECIPIENT_EVENT_KEYS {
            let mut page: u32 = 1;
            loop {
                let res = self.rpc.tx_search_by_event(key, &order.recipient_address, page, per_page).await?;
                if res.total_count == 0 {
                    break;
                }
                for tx in &res.txs {
                    if tx.height < from || tx.height > to {
                        continue;
                    }
                    if tx.code != 0 {
                        continue;
                    }
                    for transfer in extract_transfers(&tx.events, &self.config.denom) {
                        if transfer.recipient != order.recipient_address {
                            continue;
                        }
                        let block_time = tx.timestamp.unwrap_or_else(Utc::now);
                        match self
                            .orders
                            .apply_payment(
                                order,
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
                                    tracing::info!(
                                        "order {} -> {status} tx={} amount={}",
                                        order.order_id,
                                        tx.hash,
                                        transfer.amount
                                    );
                                }
                            }
                            Err(e) => {
                                tracing::error!("apply payment failed order={} tx={}: {e}", order.order_id, tx.hash);
                            }
                        }
                    }
                }

                if (page as u64) * (per_page as u64) >= res.total_count {
                    break;
                }
                page += 1;
            }
        }
        Ok(())
    }

    /// Re-scans the most recent `blocks` blocks — the stream loop's
    /// backfill on (re)connect, per spec.md §4.5 "backfill".
    pub async fn backfill_recent(&self, blocks: u64) {
        if blocks == 0 {
            return;
        }
        let latest = match self.rpc.latest_height().await {
            Ok(h) => h,
            Err(e) => {
                tracing::error!("ws backfill latest height failed: {e}");
                return;
            }
        };
        if latest <= self.config.confirm_depth {
            return;
        }
        let to = latest - self.config.confirm_depth;
        let from = if to > blocks { to - blocks + 1 } else { 1 };
        tracing::info!("ws backfill range={from}..{to}");
        if let Err(e) = self.scan_range(from, to).await {
            tracing::error!("ws backfill failed: {e}");
        }
    }
}
