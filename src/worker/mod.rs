pub mod stream;
pub mod sync;

pub use stream::{StreamWorker, StreamWorkerConfig};
pub use sync::{SyncWorker, SyncWorkerConfig};
