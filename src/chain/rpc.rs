//! Single-endpoint Tendermint-compatible JSON-RPC client.
//!
//! Multi-endpoint failover lives one layer up, in [`super::multi`]; this
//! module only knows how to talk to one node.

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use super::types::{Tx, TxSearchResponse};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rpc error: {0}")]
    RpcError(String),
    #[error("malformed rpc response: {0}")]
    Malformed(String),
}

pub type RpcResult<T> = Result<T, RpcError>;

#[derive(Debug, Deserialize)]
struct JsonRpcEnvelope {
    result: Option<Value>,
    error: Option<JsonRpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorBody {
    message: String,
}

/// Trims whitespace and a trailing slash from an endpoint URL.
pub fn normalize_endpoint(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// De-duplicates a list of endpoints after normalizing each one.
pub fn normalize_endpoints(raw: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for r in raw {
        let n = normalize_endpoint(r);
        if n.is_empty() {
            continue;
        }
        if seen.insert(n.clone()) {
            out.push(n);
        }
    }
    out
}

#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RpcClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("reqwest client build");
        Self {
            http,
            endpoint: normalize_endpoint(&endpoint.into()),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(&self, path: &str, query: &[(&str, String)]) -> RpcResult<Value> {
        let url = format!("{}/{}", self.endpoint, path);
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        let envelope: JsonRpcEnvelope = resp.json().await?;
        if let Some(err) = envelope.error {
            return Err(RpcError::RpcError(err.message));
        }
        envelope
            .result
            .ok_or_else(|| RpcError::Malformed("missing result".to_string()))
    }

    pub async fn latest_height(&self) -> RpcResult<u64> {
        let result = self.call("status", &[]).await?;
        let height_str = result
            .get("sync_info")
            .and_then(|s| s.get("latest_block_height"))
            .and_then(|h| h.as_str())
            .ok_or_else(|| RpcError::Malformed("no latest_block_height".to_string()))?;
        height_str
            .parse()
            .map_err(|_| RpcError::Malformed(format!("bad height: {height_str}")))
    }

    pub async fn block_time(&self, height: u64) -> RpcResult<chrono::DateTime<chrono::Utc>> {
        let result = self
            .call("block", &[("height", height.to_string())])
            .await?;
        let time_str = result
            .get("block")
            .and_then(|b| b.get("header"))
            .and_then(|h| h.get("time"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| RpcError::Malformed("no block time".to_string()))?;
        chrono::DateTime::parse_from_rfc3339(time_str)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| RpcError::Malformed(format!("bad block time: {e}")))
    }

    pub async fn tx_by_hash(&self, hash: &str) -> RpcResult<Tx> {
        let result = self.call("tx", &[("hash", format!("0x{hash}"))]).await?;
        parse_tx_result(&result, hash)
    }

    /// `tx_search(query, page, per_page)`. Tendermint pagination is 1-based;
    /// query string values are quoted with double quotes, e.g.
    /// `key="value"`.
    pub async fn tx_search(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> RpcResult<TxSearchResponse> {
        let result = self
            .call(
                "tx_search",
                &[
                    ("query", format!("\"{query}\"")),
                    ("page", page.to_string()),
                    ("per_page", per_page.to_string()),
                ],
            )
            .await?;
        let total_count = result
            .get("total_count")
            .and_then(|v| v.as_str().and_then(|s| s.parse::<u64>().ok()).or_else(|| v.as_u64()))
            .ok_or_else(|| RpcError::Malformed("no total_count".to_string()))?;
        let txs = result
            .get("txs")
            .and_then(|v| v.as_array())
            .ok_or_else(|| RpcError::Malformed("no txs array".to_string()))?
            .iter()
            .map(|t| parse_tx_result(t, ""))
            .collect::<RpcResult<Vec<_>>>()?;
        Ok(TxSearchResponse { total_count, txs })
    }
}

/// Query string for a tx_search against a recipient/receiver attribute
/// value, per spec.md §4.5: `["transfer.recipient", "coin_received.receiver"]`.
pub fn event_query(key: &str, address: &str) -> String {
    format!("{key}='{address}'")
}

fn parse_tx_result(result: &Value, fallback_hash: &str) -> RpcResult<Tx> {
    let hash = result
        .get("hash")
        .and_then(|v| v.as_str())
        .unwrap_or(fallback_hash)
        .to_string();
    let height: u64 = result
        .get("height")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| RpcError::Malformed("no height".to_string()))?;
    let code = result
        .get("tx_result")
        .and_then(|tr| tr.get("code"))
        .and_then(|c| c.as_u64())
        .unwrap_or(0) as u32;
    let events = result
        .get("tx_result")
        .and_then(|tr| tr.get("events"))
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| RpcError::Malformed(format!("bad events: {e}")))?
        .unwrap_or_default();
    let timestamp = result
        .get("timestamp")
        .and_then(|t| t.as_str())
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&chrono::Utc));
    Ok(Tx {
        hash,
        height,
        code,
        events,
        timestamp,
    })
}

/// Derive the default WebSocket endpoint from an RPC endpoint when none is
/// configured explicitly (spec.md §4.3 "Default WS derivation").
pub fn derive_ws_endpoint(rpc_endpoint: &str) -> String {
    let rpc_endpoint = normalize_endpoint(rpc_endpoint);
    if let Some(rest) = rpc_endpoint.strip_prefix("https://") {
        format!("wss://{rest}/websocket")
    } else if let Some(rest) = rpc_endpoint.strip_prefix("http://") {
        format!("ws://{rest}/websocket")
    } else if rpc_endpoint.starts_with("ws://") || rpc_endpoint.starts_with("wss://") {
        if rpc_endpoint.ends_with("/websocket") {
            rpc_endpoint
        } else {
            format!("{rpc_endpoint}/websocket")
        }
    } else {
        format!("ws://{rpc_endpoint}/websocket")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_whitespace_and_trailing_slash() {
        assert_eq!(normalize_endpoint("  http://a.com/ "), "http://a.com");
        assert_eq!(normalize_endpoint("http://a.com//"), "http://a.com");
    }

    #[test]
    fn normalize_endpoints_dedupes() {
        let v = vec!["http://a.com/".to_string(), "http://a.com".to_string(), "http://b.com".to_string()];
        assert_eq!(normalize_endpoints(&v), vec!["http://a.com", "http://b.com"]);
    }

    #[test]
    fn event_query_uses_single_quotes_inside_double_quoted_param() {
        assert_eq!(event_query("transfer.recipient", "dora1abc"), "transfer.recipient='dora1abc'");
    }

    #[test]
    fn derive_ws_from_https() {
        assert_eq!(derive_ws_endpoint("https://rpc.dora.org"), "wss://rpc.dora.org/websocket");
    }

    #[test]
    fn derive_ws_from_http() {
        assert_eq!(derive_ws_endpoint("http://localhost:26657"), "ws://localhost:26657/websocket");
    }

    #[test]
    fn derive_ws_from_existing_ws_without_path() {
        assert_eq!(derive_ws_endpoint("ws://localhost:26657"), "ws://localhost:26657/websocket");
    }

    #[test]
    fn derive_ws_from_existing_ws_with_path() {
        assert_eq!(derive_ws_endpoint("ws://localhost:26657/websocket"), "ws://localhost:26657/websocket");
    }
}
