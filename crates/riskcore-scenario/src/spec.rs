//! `ScenarioSpec` and the delta-string parser (§4.7).

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use riskcore_core::types::Ticker;
use riskcore_core::RiskError;

/// A scenario's requested weight change, either a full replacement or a
/// sparse per-ticker delta. `new_weights` takes precedence over `delta`
/// when both are set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioSpec {
    /// A full weight map replacing the base portfolio's weights
    /// entirely.
    pub new_weights: Option<BTreeMap<Ticker, Decimal>>,
    /// A sparse per-ticker weight shift, added to the base weight (or
    /// treated as the ticker's weight if it is new to the portfolio).
    pub delta: BTreeMap<Ticker, Decimal>,
}

impl ScenarioSpec {
    /// Builds a scenario spec from a `new_weights` map, which takes
    /// precedence over any `delta`.
    #[must_use]
    pub fn from_new_weights(weights: BTreeMap<Ticker, Decimal>) -> Self {
        Self {
            new_weights: Some(weights),
            delta: BTreeMap::new(),
        }
    }

    /// Builds a scenario spec from a sparse delta map.
    #[must_use]
    pub fn from_delta(delta: BTreeMap<Ticker, Decimal>) -> Self {
        Self {
            new_weights: None,
            delta,
        }
    }

    /// Parses a comma-separated delta string of the form
    /// `"NVDA:-200bp,V:+200bp"` into a [`ScenarioSpec`]. Each entry is
    /// `<ticker>:<delta>`, where `<delta>` recognizes `+200bp`,
    /// `-75bps`, `1.5%`, or a bare decimal like `-0.01`.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::InputInvalid` if any entry is malformed.
    pub fn parse_delta(spec: &str) -> Result<Self, RiskError> {
        let mut delta = BTreeMap::new();
        for entry in spec.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let (ticker, raw_delta) = entry.split_once(':').ok_or_else(|| {
                RiskError::input_invalid(format!(
                    "scenario delta entry '{entry}' is not of the form <ticker>:<delta>"
                ))
            })?;
            let value = parse_delta_value(raw_delta.trim())
                .ok_or_else(|| RiskError::input_invalid(format!("unparseable delta '{raw_delta}'")))?;
            delta.insert(Ticker::new(ticker.trim()), value);
        }
        Ok(Self::from_delta(delta))
    }
}

/// Parses one delta value: `+200bp`/`-75bps` (basis points, /10000),
/// `1.5%` (percent, /100), or a bare decimal (`-0.01`).
fn parse_delta_value(raw: &str) -> Option<Decimal> {
    if let Some(stripped) = raw.strip_suffix("bps").or_else(|| raw.strip_suffix("bp")) {
        let bps: Decimal = stripped.trim().parse().ok()?;
        return Some(bps / Decimal::new(10_000, 0));
    }
    if let Some(stripped) = raw.strip_suffix('%') {
        let pct: Decimal = stripped.trim().parse().ok()?;
        return Some(pct / Decimal::new(100, 0));
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_bps_suffix() {
        assert_eq!(parse_delta_value("+200bp"), Some(dec!(0.02)));
        assert_eq!(parse_delta_value("-75bps"), Some(dec!(-0.0075)));
    }

    #[test]
    fn test_parse_percent_suffix() {
        assert_eq!(parse_delta_value("1.5%"), Some(dec!(0.015)));
    }

    #[test]
    fn test_parse_bare_decimal() {
        assert_eq!(parse_delta_value("-0.01"), Some(dec!(-0.01)));
    }

    #[test]
    fn test_parse_delta_spec_multiple_entries() {
        let spec = ScenarioSpec::parse_delta("NVDA:-200bp,V:+200bp").unwrap();
        assert_eq!(spec.delta.get(&Ticker::new("NVDA")), Some(&dec!(-0.02)));
        assert_eq!(spec.delta.get(&Ticker::new("V")), Some(&dec!(0.02)));
    }

    #[test]
    fn test_parse_delta_spec_malformed_entry_errors() {
        let err = ScenarioSpec::parse_delta("NVDA-200bp").unwrap_err();
        assert!(matches!(err, RiskError::InputInvalid { .. }));
    }

    #[test]
    fn test_parse_delta_spec_unparseable_value_errors() {
        let err = ScenarioSpec::parse_delta("NVDA:abc").unwrap_err();
        assert!(matches!(err, RiskError::InputInvalid { .. }));
    }
}
