//! Cache fingerprinting (§4.10): SHA-256 over a canonical JSON encoding
//! of a computation's logical inputs, so two callers with byte-identical
//! logical inputs derive the same key without coordination.
//!
//! Canonicalization goes through `serde_json::Value`, whose `Map` is
//! `BTreeMap`-backed by default (the `preserve_order` feature is not
//! enabled anywhere in this workspace), so key order and whitespace in
//! the source value never affect the hash.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest, Sha256};

use riskcore_core::types::{DateRange, Portfolio, ProxySet, RiskLimits, Ticker};
use riskcore_core::{RiskError, RiskResult};
use riskcore_traits::config::AnalysisKind;

#[derive(Serialize)]
struct FingerprintKey<'a> {
    weights: &'a BTreeMap<Ticker, Decimal>,
    range: &'a DateRange,
    proxies: &'a BTreeMap<Ticker, ProxySet>,
    risk_limits: &'a RiskLimits,
    analysis_kind: AnalysisKind,
    scenario_spec: Option<&'a serde_json::Value>,
}

/// Computes the cache key for one computation's logical inputs: the
/// normalized `(weights, range, proxies, risk_limits, analysis_kind,
/// scenario_spec?)` tuple, per §4.10.
///
/// `scenario_spec` is `None` for non-scenario analysis kinds and
/// `Some` (already serialized by the caller via `serde_json::to_value`)
/// for `AnalysisKind::Scenario`.
///
/// # Errors
///
/// Returns `RiskError::NumericalFailure` if the canonicalization pass
/// itself fails to serialize, which should not happen for any value
/// that type-checks against the field types above.
pub fn compute(
    portfolio: &Portfolio,
    analysis_kind: AnalysisKind,
    scenario_spec: Option<&serde_json::Value>,
) -> RiskResult<String> {
    let key = FingerprintKey {
        weights: &portfolio.weights,
        range: &portfolio.range,
        proxies: &portfolio.proxies,
        risk_limits: &portfolio.risk_limits,
        analysis_kind,
        scenario_spec,
    };
    canonical_hash(&key)
}

/// Computes a digest over the content of every monthly series a
/// computation actually consumed (provider fetches for factor proxies,
/// peers, treasury, and the priced tickers themselves), for provenance
/// (`AnalysisResult::inputs_digest`) and cache-entry self-validation.
///
/// The caller assembles whatever map of consumed series is relevant to
/// its computation kind; this function only canonicalizes and hashes
/// it, so the digest is stable under key reordering the same way the
/// fingerprint is.
///
/// # Errors
///
/// Returns `RiskError::NumericalFailure` on a canonicalization failure.
pub fn inputs_digest<T: Serialize>(consumed_series: &T) -> RiskResult<String> {
    canonical_hash(consumed_series)
}

fn canonical_hash<T: Serialize>(value: &T) -> RiskResult<String> {
    let canonical = serde_json::to_value(value)
        .map_err(|e| RiskError::numerical_failure(format!("fingerprint canonicalization failed: {e}")))?;
    let bytes = serde_json::to_vec(&canonical)
        .map_err(|e| RiskError::numerical_failure(format!("fingerprint serialization failed: {e}")))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskcore_core::types::Date;
    use rust_decimal_macros::dec;

    fn range() -> DateRange {
        DateRange::new(Date::from_ymd(2014, 1, 31).unwrap(), Date::from_ymd(2024, 1, 31).unwrap()).unwrap()
    }

    fn portfolio() -> Portfolio {
        Portfolio::builder()
            .weight("NVDA", dec!(0.6))
            .weight("V", dec!(0.4))
            .range(range())
            .risk_limits(RiskLimits {
                max_portfolio_volatility: 0.3,
                max_loss: -0.2,
                max_single_stock_weight: 0.5,
                max_factor_contribution: 0.6,
                max_market_contribution: 0.5,
                max_industry_contribution: 0.5,
                max_single_factor_loss: -0.15,
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_fingerprint_is_order_insensitive() {
        let reordered = Portfolio::builder()
            .weight("V", dec!(0.4))
            .weight("NVDA", dec!(0.6))
            .range(range())
            .risk_limits(portfolio().risk_limits)
            .build()
            .unwrap();

        let a = compute(&portfolio(), AnalysisKind::RiskAnalysis, None).unwrap();
        let b = compute(&reordered, AnalysisKind::RiskAnalysis, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_changes_with_analysis_kind() {
        let a = compute(&portfolio(), AnalysisKind::RiskAnalysis, None).unwrap();
        let b = compute(&portfolio(), AnalysisKind::Optimization, None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_changes_with_weight_value() {
        let mut changed = portfolio();
        changed.weights.insert(Ticker::new("NVDA"), dec!(0.61));
        let a = compute(&portfolio(), AnalysisKind::RiskAnalysis, None).unwrap();
        let b = compute(&changed, AnalysisKind::RiskAnalysis, None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_inputs_digest_stable_across_map_construction_order() {
        let mut m1 = BTreeMap::new();
        m1.insert("SPY".to_string(), vec![1.0, 2.0, 3.0]);
        m1.insert("MTUM".to_string(), vec![4.0, 5.0, 6.0]);

        let mut m2 = BTreeMap::new();
        m2.insert("MTUM".to_string(), vec![4.0, 5.0, 6.0]);
        m2.insert("SPY".to_string(), vec![1.0, 2.0, 3.0]);

        assert_eq!(inputs_digest(&m1).unwrap(), inputs_digest(&m2).unwrap());
    }
}
