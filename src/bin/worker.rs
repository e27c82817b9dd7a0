//! Worker process (spec.md §5: "a separate worker process runs two
//! long-lived cooperative tasks: the poll loop and the stream loop").

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dora_pollcredit::chain::{derive_ws_endpoint, normalize_endpoints, MultiRpcClient};
use dora_pollcredit::orders::{OrderService, OrderServiceConfig};
use dora_pollcredit::pricing::FixedPricingSource;
use dora_pollcredit::worker::{StreamWorker, StreamWorkerConfig, SyncWorker, SyncWorkerConfig};
use dora_pollcredit::{Config, Database};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dora_pollcredit=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting pollcredit worker");

    let config = Config::load()?;
    config.log_summary();

    let db = Arc::new(Database::new(&config.db.dsn).await?);
    db.migrate().await?;
    tracing::info!("database connected and migrated");

    let rpc_endpoints = normalize_endpoints(&config.chain.rpc_endpoints);
    let rpc = Arc::new(MultiRpcClient::new(rpc_endpoints.clone(), config.worker.rpc_failover_threshold));

    let pricing = Arc::new(FixedPricingSource::new(config.pricing.fixed_credit_per_dora));
    let orders = Arc::new(OrderService::new(
        db.clone(),
        pricing,
        OrderServiceConfig {
            xpub: config.wallet.xpub.clone(),
            bech32_prefix: config.chain.bech32_prefix.clone(),
            denom: config.chain.denom.clone(),
            decimals: config.chain.decimals,
            min_credit: config.orders.min_credit,
            ttl_minutes: config.orders.ttl_minutes,
        },
    ));

    let sync_worker = Arc::new(SyncWorker::new(
        db.clone(),
        rpc.clone(),
        orders.clone(),
        SyncWorkerConfig {
            denom: config.chain.denom.clone(),
            confirm_depth: config.chain.confirm_depth,
            start_height: config.worker.start_height,
            rewind_blocks: config.worker.rewind_blocks,
            max_blocks_per_tick: config.worker.max_blocks_per_tick,
            interval: Duration::from_secs(config.worker.interval_seconds.max(1)),
            per_page: config.worker.per_page,
        },
    ));

    // Default WS endpoints from the RPC endpoints when none are configured,
    // per spec.md §4.3 "Default WS derivation".
    let ws_endpoints = if config.chain.ws_endpoints.is_empty() {
        rpc_endpoints.iter().map(|e| derive_ws_endpoint(e)).collect()
    } else {
        normalize_endpoints(&config.chain.ws_endpoints)
    };

    let stream_worker = StreamWorker::new(
        sync_worker.clone(),
        orders.clone(),
        db.clone(),
        StreamWorkerConfig {
            ws_endpoints,
            ws_backfill_blocks: if config.worker.ws_backfill_blocks > 0 {
                config.worker.ws_backfill_blocks
            } else {
                config.worker.rewind_blocks
            },
            ws_failover_threshold: config.worker.ws_failover_threshold,
            denom: config.chain.denom.clone(),
        },
    );

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
        shutdown_signal.cancel();
    });

    let poll_shutdown = shutdown.clone();
    let poll_handle = tokio::spawn(async move { sync_worker.run(poll_shutdown).await });

    let stream_shutdown = shutdown.clone();
    let stream_handle = tokio::spawn(async move { stream_worker.run(stream_shutdown).await });

    let _ = tokio::join!(poll_handle, stream_handle);

    tracing::info!("worker stopped");
    db.close().await;
    Ok(())
}
