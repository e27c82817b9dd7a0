//! Configuration loader: a YAML file (path from `CONFIG_PATH`, default
//! `./config.yaml`) with same-named upper-snake-case environment overrides
//! applied on top, per field — extending the teacher's `Config::load()`
//! env-only style with the YAML layer spec.md §6 requires.

use serde::Deserialize;
use std::env;
use std::fs;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub db: DbConfig,
    pub wallet: WalletConfig,
    pub chain: ChainConfig,
    pub orders: OrdersConfig,
    pub worker: WorkerConfig,
    pub pricing: PricingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub dsn: String,
}

#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub xpub: String,
}

#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: String,
    pub rpc_endpoints: Vec<String>,
    pub ws_endpoints: Vec<String>,
    pub denom: String,
    pub decimals: u32,
    pub bech32_prefix: String,
    pub confirm_depth: u64,
}

#[derive(Debug, Clone)]
pub struct OrdersConfig {
    pub min_credit: u64,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub start_height: u64,
    pub rewind_blocks: u64,
    pub max_blocks_per_tick: u64,
    pub interval_seconds: u64,
    pub per_page: u32,
    pub ws_backfill_blocks: u64,
    pub rpc_failover_threshold: u32,
    pub ws_failover_threshold: u32,
}

#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub fixed_credit_per_dora: i64,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(var) => write!(f, "missing required config: {var}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Mirrors the YAML tree with every field optional, so a partially-present
/// (or entirely absent) `config.yaml` still parses; env overrides and
/// defaults fill the rest.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    db: RawDb,
    #[serde(default)]
    wallet: RawWallet,
    #[serde(default)]
    chain: RawChain,
    #[serde(default)]
    orders: RawOrders,
    #[serde(default)]
    worker: RawWorker,
    #[serde(default)]
    pricing: RawPricing,
}

#[derive(Debug, Default, Deserialize)]
struct RawServer {
    addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDb {
    dsn: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawWallet {
    xpub: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawChain {
    chain_id: Option<String>,
    rpc_endpoints: Option<Vec<String>>,
    ws_endpoints: Option<Vec<String>>,
    denom: Option<String>,
    decimals: Option<u32>,
    bech32_prefix: Option<String>,
    confirm_depth: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawOrders {
    min_credit: Option<u64>,
    ttl_minutes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawWorker {
    start_height: Option<u64>,
    rewind_blocks: Option<u64>,
    max_blocks_per_tick: Option<u64>,
    interval_seconds: Option<u64>,
    per_page: Option<u32>,
    ws_backfill_blocks: Option<u64>,
    rpc_failover_threshold: Option<u32>,
    ws_failover_threshold: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPricing {
    fixed_credit_per_dora: Option<i64>,
}

/// `env_var` takes precedence over the YAML-sourced `from_yaml` value.
fn overlay_string(env_var: &str, from_yaml: Option<String>) -> Option<String> {
    env::var(env_var).ok().or(from_yaml)
}

fn overlay_parsed<T: std::str::FromStr>(env_var: &str, from_yaml: Option<T>) -> Option<T> {
    env::var(env_var).ok().and_then(|s| s.parse().ok()).or(from_yaml)
}

fn overlay_list(env_var: &str, from_yaml: Option<Vec<String>>) -> Vec<String> {
    // A comma-separated env var fully replaces the YAML list when present.
    if let Ok(raw) = env::var(env_var) {
        return raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
    }
    from_yaml.unwrap_or_default()
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "./config.yaml".to_string());
        let raw: RawConfig = match fs::read_to_string(&config_path) {
            Ok(contents) => serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::Invalid(format!("{config_path}: {e}")))?,
            Err(_) => RawConfig::default(),
        };

        let addr = overlay_string("SERVER_ADDR", raw.server.addr)
            .ok_or_else(|| ConfigError::Missing("server.addr".to_string()))?;
        let dsn = overlay_string("DB_DSN", raw.db.dsn)
            .ok_or_else(|| ConfigError::Missing("db.dsn".to_string()))?;
        let xpub = overlay_string("WALLET_XPUB", raw.wallet.xpub).unwrap_or_default();

        let chain_id = overlay_string("CHAIN_CHAIN_ID", raw.chain.chain_id)
            .ok_or_else(|| ConfigError::Missing("chain.chain_id".to_string()))?;
        let rpc_endpoints = overlay_list("CHAIN_RPC_ENDPOINTS", raw.chain.rpc_endpoints);
        if rpc_endpoints.is_empty() {
            return Err(ConfigError::Missing("chain.rpc_endpoints".to_string()));
        }
        let ws_endpoints = overlay_list("CHAIN_WS_ENDPOINTS", raw.chain.ws_endpoints);
        let denom = overlay_string("CHAIN_DENOM", raw.chain.denom)
            .ok_or_else(|| ConfigError::Missing("chain.denom".to_string()))?;
        let decimals = overlay_parsed("CHAIN_DECIMALS", raw.chain.decimals).unwrap_or(18);
        let bech32_prefix = overlay_string("CHAIN_BECH32_PREFIX", raw.chain.bech32_prefix).unwrap_or_default();
        let confirm_depth = overlay_parsed("CHAIN_CONFIRM_DEPTH", raw.chain.confirm_depth).unwrap_or(1);

        let min_credit = overlay_parsed("ORDERS_MIN_CREDIT", raw.orders.min_credit).unwrap_or(1);
        let ttl_minutes = overlay_parsed("ORDERS_TTL_MINUTES", raw.orders.ttl_minutes).unwrap_or(30);

        let start_height = overlay_parsed("WORKER_START_HEIGHT", raw.worker.start_height).unwrap_or(0);
        let rewind_blocks = overlay_parsed("WORKER_REWIND_BLOCKS", raw.worker.rewind_blocks).unwrap_or(0);
        let max_blocks_per_tick =
            overlay_parsed("WORKER_MAX_BLOCKS_PER_TICK", raw.worker.max_blocks_per_tick).unwrap_or(0);
        let interval_seconds_raw =
            overlay_parsed("WORKER_INTERVAL_SECONDS", raw.worker.interval_seconds).unwrap_or(5);
        let interval_seconds = interval_seconds_raw.max(1); // clamped to >= 1s per spec.md §6
        let per_page = overlay_parsed("WORKER_PER_PAGE", raw.worker.per_page).unwrap_or(30);
        let ws_backfill_blocks =
            overlay_parsed("WORKER_WS_BACKFILL_BLOCKS", raw.worker.ws_backfill_blocks).unwrap_or(0);
        let rpc_failover_threshold =
            overlay_parsed("WORKER_RPC_FAILOVER_THRESHOLD", raw.worker.rpc_failover_threshold).unwrap_or(3);
        let ws_failover_threshold =
            overlay_parsed("WORKER_WS_FAILOVER_THRESHOLD", raw.worker.ws_failover_threshold).unwrap_or(3);

        let fixed_credit_per_dora =
            overlay_parsed("PRICING_FIXED_CREDIT_PER_DORA", raw.pricing.fixed_credit_per_dora).unwrap_or(1);

        Ok(Config {
            server: ServerConfig { addr },
            db: DbConfig { dsn },
            wallet: WalletConfig { xpub },
            chain: ChainConfig {
                chain_id,
                rpc_endpoints,
                ws_endpoints,
                denom,
                decimals,
                bech32_prefix,
                confirm_depth,
            },
            orders: OrdersConfig { min_credit, ttl_minutes },
            worker: WorkerConfig {
                start_height,
                rewind_blocks,
                max_blocks_per_tick,
                interval_seconds,
                per_page,
                ws_backfill_blocks,
                rpc_failover_threshold,
                ws_failover_threshold,
            },
            pricing: PricingConfig { fixed_credit_per_dora },
        })
    }

    pub fn log_summary(&self) {
        tracing::info!("=== dora-pollcredit configuration ===");
        tracing::info!("server.addr: {}", self.server.addr);
        tracing::info!("chain.chain_id: {}", self.chain.chain_id);
        tracing::info!("chain.rpc_endpoints: {} configured", self.chain.rpc_endpoints.len());
        tracing::info!("chain.ws_endpoints: {} configured", self.chain.ws_endpoints.len());
        tracing::info!("chain.denom: {}", self.chain.denom);
        tracing::info!("wallet.xpub: {}", if self.wallet.xpub.is_empty() { "not set" } else { "set" });
        tracing::info!("=====================================");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_list_splits_comma_separated_env_value() {
        std::env::set_var("TEST_OVERLAY_LIST", "http://a, http://b ,,http://c");
        let v = overlay_list("TEST_OVERLAY_LIST", Some(vec!["http://yaml".to_string()]));
        assert_eq!(v, vec!["http://a", "http://b", "http://c"]);
        std::env::remove_var("TEST_OVERLAY_LIST");
    }

    #[test]
    fn overlay_list_falls_back_to_yaml_when_env_absent() {
        std::env::remove_var("TEST_OVERLAY_LIST_ABSENT");
        let v = overlay_list("TEST_OVERLAY_LIST_ABSENT", Some(vec!["http://yaml".to_string()]));
        assert_eq!(v, vec!["http://yaml"]);
    }
}
