//! Credit-purchase payment reconciliation engine.
//!
//! Watches a Cosmos-style chain for DORA transfers to per-order deposit
//! addresses and reconciles them into issued credit:
//! - `chain`: multi-endpoint RPC/WS client (C1) and HD address deriver (C2)
//! - `pricing`: fixed-ratio quote snapshots (C3)
//! - `orders`: order lifecycle and the settlement decision table (C4)
//! - `worker`: poll + stream sync loops (C5)
//! - `db`: Postgres-backed store
//! - `api`: HTTP surface

pub mod api;
pub mod bigint;
pub mod chain;
pub mod config;
pub mod db;
pub mod orders;
pub mod pricing;
pub mod worker;

pub use api::{create_router, AppState};
pub use config::Config;
pub use db::{Database, DbError, DbResult};
