//! WebSocket event stream (C1 stream half): subscribes to `tm.event='Tx'`
//! on one endpoint at a time, reconnecting with exponential backoff and
//! rotating endpoints independently of the HTTP [`super::multi::MultiRpcClient`].

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio_tungstenite::tungstenite::Message;

use super::types::{Event, Tx};

const MIN_BACKOFF: Duration = Duration::from_secs(2);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const SUBSCRIBE_QUERY: &str = "tm.event='Tx'";

#[derive(Debug, Error)]
pub enum WsError {
    #[error("websocket connect error: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("malformed websocket payload: {0}")]
    Malformed(String),
    #[error("connection closed by peer")]
    Closed,
}

pub type WsResult<T> = Result<T, WsError>;

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<Value>,
}

/// Doubles the previous backoff, capped at [`MAX_BACKOFF`]. Call with the
/// previous sleep duration; pass `MIN_BACKOFF` for the first failure.
pub fn next_backoff(previous: Duration) -> Duration {
    let doubled = previous.saturating_mul(2);
    doubled.min(MAX_BACKOFF).max(MIN_BACKOFF)
}

/// A single connected subscription to one endpoint's `tm.event='Tx'` feed.
pub struct WsSubscription {
    socket: tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
}

impl WsSubscription {
    /// Connects to `ws_endpoint` and issues the `subscribe` JSON-RPC call.
    pub async fn connect(ws_endpoint: &str) -> WsResult<Self> {
        let (mut socket, _) = tokio_tungstenite::connect_async(ws_endpoint).await?;
        let subscribe = json!({
            "jsonrpc": "2.0",
            "method": "subscribe",
            "id": "pollcredit-tx-subscription",
            "params": { "query": SUBSCRIBE_QUERY },
        });
        socket
            .send(Message::Text(subscribe.to_string()))
            .await
            .map_err(WsError::Connect)?;
        Ok(Self { socket })
    }

    /// Waits for the next `Tx` event on the subscription, skipping the
    /// initial subscribe-confirmation frame (an envelope with an empty
    /// `result` object) and any ping/pong control frames.
    pub async fn next_tx(&mut self) -> WsResult<Tx> {
        loop {
            let msg = self
                .socket
                .next()
                .await
                .ok_or(WsError::Closed)?
                .map_err(WsError::Connect)?;
            match msg {
                Message::Text(text) => {
                    if let Some(tx) = parse_tx_event(&text)? {
                        return Ok(tx);
                    }
                    // Subscribe confirmation or an unrelated event kind; keep reading.
                }
                Message::Ping(_) | Message::Pong(_) => continue,
                Message::Close(_) => return Err(WsError::Closed),
                Message::Binary(_) | Message::Frame(_) => continue,
            }
        }
    }

    pub async fn close(mut self) -> WsResult<()> {
        self.socket.close(None).await.map_err(WsError::Connect)
    }
}

/// SHA-256 of the base64-decoded raw tx bytes, uppercase-hex-encoded — the
/// fallback used when `TxResult.hash` is absent (spec.md §4.3).
fn hash_from_tx(tx_base64: &str) -> WsResult<String> {
    use base64::Engine;
    use sha2::{Digest, Sha256};
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(tx_base64)
        .map_err(|e| WsError::Malformed(format!("bad tx base64: {e}")))?;
    let digest = Sha256::digest(&bytes);
    Ok(hex::encode_upper(digest))
}

/// Parses one `tm.event='Tx'` subscription frame, returning `None` for
/// non-Tx frames (subscribe ack, other event kinds).
fn parse_tx_event(text: &str) -> WsResult<Option<Tx>> {
    let envelope: RpcEnvelope =
        serde_json::from_str(text).map_err(|e| WsError::Malformed(e.to_string()))?;
    let Some(result) = envelope.result else {
        return Ok(None);
    };
    let Some(data) = result.get("data") else {
        return Ok(None);
    };
    let Some(value) = data.get("value") else {
        return Ok(None);
    };

    let tx_result = value.get("TxResult");
    let hash_field = tx_result
        .and_then(|tr| tr.get("hash"))
        .and_then(|h| h.as_str())
        .unwrap_or("")
        .trim();
    let hash = if !hash_field.is_empty() {
        hash_field.to_uppercase()
    } else {
        tx_result
            .and_then(|tr| tr.get("tx"))
            .and_then(|t| t.as_str())
            .and_then(|t| hash_from_tx(t).ok())
            .unwrap_or_default()
    };
    let height: u64 = value
        .get("TxResult")
        .and_then(|tr| tr.get("height"))
        .and_then(|h| h.as_str())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| WsError::Malformed("missing TxResult.height".to_string()))?;
    let code = value
        .get("TxResult")
        .and_then(|tr| tr.get("result"))
        .and_then(|r| r.get("code"))
        .and_then(|c| c.as_u64())
        .unwrap_or(0) as u32;
    let events: Vec<Event> = value
        .get("TxResult")
        .and_then(|tr| tr.get("result"))
        .and_then(|r| r.get("events"))
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| WsError::Malformed(format!("bad events: {e}")))?
        .unwrap_or_default();

    Ok(Some(Tx {
        hash,
        height,
        code,
        events,
        timestamp: Some(chrono::Utc::now()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let mut b = MIN_BACKOFF;
        assert_eq!(b, Duration::from_secs(2));
        b = next_backoff(b);
        assert_eq!(b, Duration::from_secs(4));
        b = next_backoff(b);
        assert_eq!(b, Duration::from_secs(8));
        b = next_backoff(b);
        assert_eq!(b, Duration::from_secs(16));
        b = next_backoff(b);
        assert_eq!(b, Duration::from_secs(30)); // would be 32, capped
        b = next_backoff(b);
        assert_eq!(b, Duration::from_secs(30)); // stays capped
    }

    #[test]
    fn subscribe_confirmation_frame_yields_no_tx() {
        let frame = r#"{"jsonrpc":"2.0","id":"pollcredit-tx-subscription","result":{}}"#;
        let parsed = parse_tx_event(frame).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn tx_event_frame_parses_hash_height_and_events() {
        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "result": {
                "query": SUBSCRIBE_QUERY,
                "data": {
                    "type": "tendermint/event/Tx",
                    "value": {
                        "TxResult": {
                            "height": "100",
                            "hash": "abcdef0123",
                            "result": {
                                "code": 0,
                                "events": [
                                    {
                                        "type": "transfer",
                                        "attributes": [
                                            {"key": "recipient", "value": "dora1recv"},
                                            {"key": "amount", "value": "100peaka"}
                                        ]
                                    }
                                ]
                            }
                        }
                    }
                }
            }
        })
        .to_string();
        let tx = parse_tx_event(&frame).unwrap().expect("tx frame");
        assert_eq!(tx.hash, "ABCDEF0123");
        assert_eq!(tx.height, 100);
        assert_eq!(tx.code, 0);
        assert_eq!(tx.events.len(), 1);
    }

    #[test]
    fn tx_event_frame_falls_back_to_hash_from_raw_tx_bytes() {
        use base64::Engine;
        use sha2::{Digest, Sha256};
        let raw_tx = b"some-raw-tx-bytes";
        let tx_b64 = base64::engine::general_purpose::STANDARD.encode(raw_tx);
        let expected_hash = hex::encode_upper(Sha256::digest(raw_tx));

        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "result": {
                "query": SUBSCRIBE_QUERY,
                "data": {
                    "type": "tendermint/event/Tx",
                    "value": {
                        "TxResult": {
                            "height": "100",
                            "hash": "",
                            "tx": tx_b64,
                            "result": { "code": 0, "events": [] }
                        }
                    }
                }
            }
        })
        .to_string();
        let tx = parse_tx_event(&frame).unwrap().expect("tx frame");
        assert_eq!(tx.hash, expected_hash);
    }
}
