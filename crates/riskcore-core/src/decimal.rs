//! `Decimal` <-> `f64` boundary conversions.
//!
//! Weights, expected returns, and risk-limit thresholds are caller-facing
//! economic quantities and are modeled as `Decimal`. Every numerical
//! kernel (C2-C9) works in `f64`. Conversion happens once, at the
//! boundary between `riskcore-core` types and the numerical crates.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Converts a `Decimal` to `f64`, losslessly for all values the engine
/// produces (weights and returns never approach `f64`'s precision
/// limits in practice).
#[must_use]
pub fn to_f64_lossy(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Converts an `f64` back to `Decimal`.
#[must_use]
pub fn from_f64(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_roundtrip() {
        let d = dec!(0.4);
        let f = to_f64_lossy(d);
        assert!((f - 0.4).abs() < 1e-12);
        let back = from_f64(f);
        assert!((back - d).abs() < dec!(0.0000001));
    }
}
