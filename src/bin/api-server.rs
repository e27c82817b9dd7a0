//! HTTP API server process (spec.md §5: "one process runs the API server
//! with many concurrent request-handler tasks over a connection pool").

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dora_pollcredit::chain::{normalize_endpoints, MultiRpcClient};
use dora_pollcredit::orders::{OrderService, OrderServiceConfig};
use dora_pollcredit::pricing::FixedPricingSource;
use dora_pollcredit::{AppState, Config, Database};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dora_pollcredit=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting pollcredit api server");

    let config = Config::load()?;
    config.log_summary();

    let db = Arc::new(Database::new(&config.db.dsn).await?);
    db.migrate().await?;
    tracing::info!("database connected and migrated");

    let pricing = Arc::new(FixedPricingSource::new(config.pricing.fixed_credit_per_dora));
    let order_service = Arc::new(OrderService::new(
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

    let rpc_endpoints = normalize_endpoints(&config.chain.rpc_endpoints);
    let rpc = if rpc_endpoints.is_empty() {
        None
    } else {
        Some(Arc::new(MultiRpcClient::new(rpc_endpoints, config.worker.rpc_failover_threshold)))
    };

    let state = AppState::new(db.clone(), order_service, rpc, config.chain.denom.clone());
    let app = dora_pollcredit::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.addr).await?;
    tracing::info!("listening on {}", config.server.addr);

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
        shutdown_signal.cancel();
    });

    let shutdown_for_serve = shutdown.clone();
    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_for_serve.cancelled().await;
    });

    tokio::select! {
        result = serve => result?,
        _ = async { shutdown.cancelled().await; tokio::time::sleep(SHUTDOWN_GRACE).await; } => {
            tracing::warn!("graceful shutdown exceeded {SHUTDOWN_GRACE:?}, exiting anyway");
        }
    }

    tracing::info!("server stopped");
    db.close().await;
    Ok(())
}
