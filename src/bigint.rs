//! Arbitrary-precision helpers for `amount_peaka` math.
//!
//! 64-bit integers overflow for realistic decimals (10^18 peaka per DORA),
//! so every computation or comparison involving `amount_peaka` goes through
//! here rather than through native integer types.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, thiserror::Error)]
pub enum BigIntError {
    #[error("invalid decimal integer string: {0}")]
    InvalidDecimal(String),
}

fn ten() -> &'static BigUint {
    static TEN: OnceLock<BigUint> = OnceLock::new();
    TEN.get_or_init(|| BigUint::from(10u32))
}

fn pow10(decimals: u32) -> BigUint {
    ten().pow(decimals)
}

/// `ceil(credit * 10^decimals / credit_per_dora)`, per Invariant 3.
///
/// Both `credit` and `credit_per_dora` are positive by the time this is
/// called (validated by the caller); `credit_per_dora == 0` would make the
/// quote ill-defined and is rejected by the caller before this runs.
pub fn payable_amount_peaka(credit: u64, decimals: u32, credit_per_dora: i64) -> BigUint {
    let numerator = BigUint::from(credit) * pow10(decimals);
    let denom = BigUint::from(credit_per_dora as u64);
    ceil_div(&numerator, &denom)
}

/// `floor(amount * credit_per_dora / 10^decimals)` — the repriced credit for
/// a late-but-matching payment (spec.md §4.4, `paid_late_repriced` row).
pub fn floor_mul_div(amount: &BigUint, credit_per_dora: i64, decimals: u32) -> BigUint {
    let scaled = amount * BigUint::from(credit_per_dora as u64);
    &scaled / pow10(decimals)
}

fn ceil_div(numerator: &BigUint, denom: &BigUint) -> BigUint {
    if denom.is_zero() {
        return BigUint::zero();
    }
    let one = BigUint::one();
    (numerator + denom - &one) / denom
}

/// Parse a decimal-string big integer as stored in `amount_peaka` columns.
pub fn parse_peaka(s: &str) -> Result<BigUint, BigIntError> {
    BigUint::from_str(s).map_err(|_| BigIntError::InvalidDecimal(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_division_has_no_remainder_added() {
        // credit=100, decimals=18, credit_per_dora=10 -> 10^19/10 = 10^18 * 10
        let amt = payable_amount_peaka(100, 18, 10);
        assert_eq!(amt.to_string(), "10000000000000000000");
    }

    #[test]
    fn ceiling_quote_rounds_up() {
        // credit=1, decimals=18, credit_per_dora=3 -> ceil(10^18/3)
        let amt = payable_amount_peaka(1, 18, 3);
        assert_eq!(amt.to_string(), "333333333333333334");
    }

    #[test]
    fn floor_mul_div_repricing() {
        let amount = parse_peaka("10000000000000000000").unwrap();
        let credit = floor_mul_div(&amount, 8, 18);
        assert_eq!(credit.to_string(), "80");
    }

    #[test]
    fn parse_rejects_non_numeric() {
        assert!(parse_peaka("abc").is_err());
        assert!(parse_peaka("-5").is_err());
    }
}
