//! `FactorPanel` and `BetaVector`: the Factor Model Assembler's (C4)
//! shared data contract.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::MonthlySeries;

/// Standard factor labels shared by every ticker's proxy set.
pub const MARKET: &str = "market";
/// Momentum factor label.
pub const MOMENTUM: &str = "momentum";
/// Value factor label.
pub const VALUE: &str = "value";
/// Industry factor label.
pub const INDUSTRY: &str = "industry";
/// Interest-rate factor label (key-rate aggregate), present for
/// bond-like assets.
pub const INTEREST_RATE: &str = "interest_rate";
/// Per-ticker synthetic subindustry factor label prefix; the full label
/// is `"subindustry:<ticker>"`.
pub const SUBINDUSTRY_PREFIX: &str = "subindustry:";

/// For a given date range, a mapping `factor_label -> MonthlySeries<return>`.
///
/// Labels include the four standard labels and optionally
/// `interest_rate` and a synthetic per-ticker `subindustry:<ticker>`
/// series (equal-weighted peer return minus industry return).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactorPanel {
    factors: BTreeMap<String, MonthlySeries<f64>>,
}

impl FactorPanel {
    /// Creates an empty panel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a factor's return series.
    pub fn insert(&mut self, label: impl Into<String>, series: MonthlySeries<f64>) {
        self.factors.insert(label.into(), series);
    }

    /// Returns a factor's return series, if present.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&MonthlySeries<f64>> {
        self.factors.get(label)
    }

    /// Removes a factor from the panel (used when subindustry peer
    /// validation leaves fewer than two peers, §4.4).
    pub fn remove(&mut self, label: &str) -> Option<MonthlySeries<f64>> {
        self.factors.remove(label)
    }

    /// Factor labels present in the panel, in a stable (sorted) order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.factors.keys().map(String::as_str)
    }

    /// Number of factors in the panel.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// True if the panel has no factors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

/// Per-ticker regression output: factor sensitivities plus fit
/// diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetaVector {
    /// Sensitivity to each factor, keyed by factor label.
    pub betas: BTreeMap<String, f64>,
    /// Regression intercept.
    pub alpha: f64,
    /// Annualized idiosyncratic (residual) volatility.
    pub residual_vol: f64,
    /// Adjusted R-squared of the fit.
    pub r_squared: f64,
}

impl BetaVector {
    /// Returns the beta for a factor, or 0.0 if the ticker has no
    /// exposure to it (e.g. a cash ticker, or a factor dropped by peer
    /// validation).
    #[must_use]
    pub fn beta(&self, factor: &str) -> f64 {
        self.betas.get(factor).copied().unwrap_or(0.0)
    }

    /// Aggregated interest-rate beta: the sum of all key-rate betas
    /// (§4.3). Effective duration is `|beta_ir()|` in years.
    #[must_use]
    pub fn beta_ir(&self) -> f64 {
        self.betas
            .iter()
            .filter(|(label, _)| label.starts_with(INTEREST_RATE))
            .map(|(_, beta)| *beta)
            .fold(0.0, |acc, b| acc + b)
    }
}
