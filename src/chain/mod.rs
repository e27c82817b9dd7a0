//! Chain client (C1) and address deriver (C2).
//!
//! `multi` and `ws` are the two halves of the client facade described in
//! spec.md §4.3 — multiplexed HTTP JSON-RPC and an independent WebSocket
//! event stream. `deriver` is the pure C2 function; `types` holds the wire
//! types shared by both halves.

pub mod deriver;
pub mod multi;
pub mod rpc;
pub mod types;
pub mod ws;

pub use deriver::{derive, DeriverError};
pub use multi::MultiRpcClient;
pub use rpc::{derive_ws_endpoint, normalize_endpoints, RpcError};
pub use types::{extract_transfers, Event, Transfer, Tx};
pub use ws::{next_backoff, WsError, WsSubscription};
