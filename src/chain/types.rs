//! Wire types for the Tendermint/CometBFT-compatible JSON-RPC and WS surface.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventAttribute {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: Vec<EventAttribute>,
}

impl Event {
    /// Decoded attribute value for `key`, applying the base64-or-raw rule.
    pub fn attr(&self, key: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|a| a.key == key || decode_attribute(&a.key) == key)
            .map(|a| decode_attribute(&a.value))
    }
}

/// Event attribute keys/values returned by a node may be plain text or
/// base64-encoded. Attempt base64 decode; accept it only if at least 80% of
/// the decoded bytes are printable ASCII (0x20-0x7E), else fall back to the
/// raw string untouched.
pub fn decode_attribute(raw: &str) -> String {
    use base64::Engine;
    let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(raw) else {
        return raw.to_string();
    };
    if decoded.is_empty() {
        return raw.to_string();
    }
    let printable = decoded
        .iter()
        .filter(|&&b| (0x20..=0x7E).contains(&b))
        .count();
    if printable * 5 >= decoded.len() * 4 {
        // >= 80% printable ASCII
        match String::from_utf8(decoded) {
            Ok(s) => s,
            Err(_) => raw.to_string(),
        }
    } else {
        raw.to_string()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Tx {
    pub hash: String,
    pub height: u64,
    pub code: u32,
    #[serde(default)]
    pub events: Vec<Event>,
    /// Present on `tx_search` results; absent on `tx` lookups and WS pushes,
    /// in which case callers fall back to `block_time(height)` or `now()`.
    #[serde(default)]
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TxSearchResponse {
    pub total_count: u64,
    pub txs: Vec<Tx>,
}

/// A single decoded coin transfer extracted from a transaction's events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub recipient: String,
    pub sender: Option<String>,
    pub amount: String,
    pub denom: String,
}

/// Split a Cosmos coin amount string (`"<digits><denom>"`) into its numeric
/// and denom parts. Returns `None` if there is no leading digit run.
fn split_coin(coin: &str) -> Option<(&str, &str)> {
    let split_at = coin.find(|c: char| !c.is_ascii_digit())?;
    if split_at == 0 {
        return None;
    }
    Some(coin.split_at(split_at))
}

/// Parse a Cosmos coin-list string (comma-separated `"<digits><denom>"`
/// tuples), keeping only entries matching `denom`.
pub fn parse_coins(raw: &str, denom: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            split_coin(part)
        })
        .filter(|(_, d)| *d == denom)
        .map(|(amt, d)| (amt.to_string(), d.to_string()))
        .collect()
}

/// Walk a transaction's events and extract transfers matching `denom`, per
/// spec.md §4.5 ("Transfer extraction").
pub fn extract_transfers(events: &[Event], denom: &str) -> Vec<Transfer> {
    let mut out = Vec::new();
    for ev in events {
        match ev.kind.as_str() {
            "transfer" => {
                let Some(amount_raw) = ev.attr("amount") else {
                    continue;
                };
                let Some(recipient) = ev.attr("recipient") else {
                    continue;
                };
                let sender = ev.attr("sender");
                for (amount, coin_denom) in parse_coins(&amount_raw, denom) {
                    out.push(Transfer {
                        recipient: recipient.clone(),
                        sender: sender.clone(),
                        amount,
                        denom: coin_denom,
                    });
                }
            }
            "coin_received" => {
                let Some(amount_raw) = ev.attr("amount") else {
                    continue;
                };
                let Some(receiver) = ev.attr("receiver") else {
                    continue;
                };
                for (amount, coin_denom) in parse_coins(&amount_raw, denom) {
                    out.push(Transfer {
                        recipient: receiver.clone(),
                        sender: None,
                        amount,
                        denom: coin_denom,
                    });
                }
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_attribute_roundtrips_printable_base64() {
        use base64::Engine;
        let raw = base64::engine::general_purpose::STANDARD.encode("dora1abc...");
        assert_eq!(decode_attribute(&raw), "dora1abc...");
    }

    #[test]
    fn decode_attribute_passes_through_non_printable() {
        // Raw bytes that happen to be valid base64 but decode to mostly
        // non-printable binary must be returned untouched.
        let raw = "//79/Pv6"; // decodes to mostly high-byte binary
        let decoded = decode_attribute(raw);
        assert_eq!(decoded, raw);
    }

    #[test]
    fn decode_attribute_passes_through_plain_text() {
        assert_eq!(decode_attribute("dora1plain"), "dora1plain");
    }

    #[test]
    fn parse_coins_splits_and_filters_denom() {
        let coins = parse_coins("10000000000000000000peaka,500uatom", "peaka");
        assert_eq!(coins, vec![("10000000000000000000".to_string(), "peaka".to_string())]);
    }

    #[test]
    fn parse_coins_ignores_malformed_entries() {
        assert!(parse_coins("peaka,  ,123", "peaka").is_empty());
    }

    #[test]
    fn extract_transfers_reads_transfer_and_coin_received() {
        let events = vec![
            Event {
                kind: "transfer".to_string(),
                attributes: vec![
                    EventAttribute { key: "recipient".to_string(), value: "dora1recv".to_string() },
                    EventAttribute { key: "sender".to_string(), value: "dora1send".to_string() },
                    EventAttribute { key: "amount".to_string(), value: "100peaka".to_string() },
                ],
            },
            Event {
                kind: "coin_received".to_string(),
                attributes: vec![
                    EventAttribute { key: "receiver".to_string(), value: "dora1recv2".to_string() },
                    EventAttribute { key: "amount".to_string(), value: "200peaka".to_string() },
                ],
            },
        ];
        let transfers = extract_transfers(&events, "peaka");
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].recipient, "dora1recv");
        assert_eq!(transfers[0].sender.as_deref(), Some("dora1send"));
        assert_eq!(transfers[1].recipient, "dora1recv2");
        assert!(transfers[1].sender.is_none());
    }
}
