pub mod service;

pub use service::{OrderError, OrderResult, OrderService, OrderServiceConfig};
