//! Pricing oracle (C3).
//!
//! Produces the quote basis recorded verbatim on every order so a later
//! repricing decision (see `orders::service::apply_payment`) uses the same
//! arithmetic contract as order creation. The only implementation today is a
//! fixed ratio configured at startup; the trait exists so a future
//! oracle-driven source can be swapped in without touching the order service.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceSnapshot {
    pub credit_per_dora: i64,
    pub source: String,
}

pub trait PricingSource: Send + Sync {
    fn current_snapshot(&self) -> PriceSnapshot;
}

/// Fixed-ratio pricing source. `source` is always `"fixed"`.
pub struct FixedPricingSource {
    credit_per_dora: i64,
}

impl FixedPricingSource {
    pub fn new(credit_per_dora: i64) -> Self {
        Self { credit_per_dora }
    }
}

impl PricingSource for FixedPricingSource {
    fn current_snapshot(&self) -> PriceSnapshot {
        PriceSnapshot {
            credit_per_dora: self.credit_per_dora,
            source: "fixed".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_source_reports_configured_ratio() {
        let src = FixedPricingSource::new(10);
        let snap = src.current_snapshot();
        assert_eq!(snap.credit_per_dora, 10);
        assert_eq!(snap.source, "fixed");
    }
}
