//! Engine configuration (§6): a single immutable record, constructed
//! once at startup and passed by reference into the engine. No
//! module-level globals, no hot-reload machinery — date defaults,
//! lookbacks, and cache policy are all fields here.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use riskcore_core::types::DateRange;

/// Per-analysis-kind cache time-to-live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnalysisKind {
    /// A standalone risk analysis.
    RiskAnalysis,
    /// A scenario comparison.
    Scenario,
    /// An optimizer run.
    Optimization,
    /// A single-ticker factor fit.
    Stock,
    /// A composite risk score.
    RiskScore,
    /// Reference-data-only lookups (proxy resolution, currency mapping).
    ReferenceDataOnly,
}

/// Tolerances the convex solvers (C8) must meet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolverTolerances {
    /// Tolerance on the objective value.
    pub objective_tolerance: f64,
    /// Tolerance on equality-constraint residuals.
    pub equality_residual_tolerance: f64,
}

impl Default for SolverTolerances {
    fn default() -> Self {
        Self {
            objective_tolerance: 1e-6,
            equality_residual_tolerance: 1e-8,
        }
    }
}

/// Parameters for the HAC (Newey-West) lag-length formula,
/// `L = floor(a * (T / b) ^ c)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HacLagFormula {
    /// Leading coefficient `a`.
    pub coefficient: f64,
    /// Normalization constant `b`.
    pub normalizer: f64,
    /// Exponent `c`.
    pub exponent: f64,
}

impl Default for HacLagFormula {
    fn default() -> Self {
        Self {
            coefficient: 4.0,
            normalizer: 100.0,
            exponent: 2.0 / 9.0,
        }
    }
}

impl HacLagFormula {
    /// Evaluates the lag length for `t` observations.
    #[must_use]
    pub fn lag(&self, t: usize) -> usize {
        (self.coefficient * (t as f64 / self.normalizer).powf(self.exponent)).floor() as usize
    }
}

/// The engine's single immutable configuration record (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Date range used when a request omits an explicit one.
    pub default_date_range: DateRange,
    /// Lookback, in years, for the worst-case factor/portfolio loss
    /// calculation (§4.5/§4.6). Default 10.
    pub worst_case_lookback_years: u32,
    /// Lookback, in years, for auto-generated expected returns (§4.8).
    /// Default 10.
    pub expected_returns_lookback_years: u32,
    /// Fallback annual expected return when auto-generation itself has
    /// no data (e.g. an industry ETF with insufficient history).
    /// Default 0.06.
    pub expected_returns_fallback_default: f64,
    /// Fallback annual return for cash pseudo-tickers when the treasury
    /// series itself is unavailable. Default 0.02.
    pub cash_proxy_fallback_return: f64,
    /// Minimum monthly observations a provider series must have.
    /// Default 24.
    pub min_observations: usize,
    /// HAC (Newey-West) lag-length formula parameters.
    pub hac_lag_formula: HacLagFormula,
    /// Maximum condition number of `X'X` before a regression fails with
    /// `SingularDesign`.
    pub max_condition_number: f64,
    /// Cache capacity, in bytes.
    pub cache_capacity_bytes: u64,
    /// Maximum number of cache entries.
    pub cache_entry_limit: usize,
    /// Per-analysis-kind cache TTL.
    pub cache_ttl_seconds_by_kind: BTreeMap<AnalysisKind, Duration>,
    /// Convex solver tolerances (C8).
    pub solver_tolerances: SolverTolerances,
    /// Ridge added to `X'X`/`Sigma` before inversion (§4.5). Default
    /// 1e-10.
    pub numeric_ridge: f64,
}

impl EngineConfig {
    /// Builds a config with the spec's documented defaults and the
    /// given default date range (which has no sensible default of its
    /// own).
    #[must_use]
    pub fn with_defaults(default_date_range: DateRange) -> Self {
        let mut cache_ttl_seconds_by_kind = BTreeMap::new();
        for kind in [
            AnalysisKind::RiskAnalysis,
            AnalysisKind::Scenario,
            AnalysisKind::Optimization,
            AnalysisKind::Stock,
            AnalysisKind::RiskScore,
        ] {
            cache_ttl_seconds_by_kind.insert(kind, Duration::from_secs(2 * 60 * 60));
        }
        cache_ttl_seconds_by_kind
            .insert(AnalysisKind::ReferenceDataOnly, Duration::from_secs(7 * 24 * 60 * 60));

        Self {
            default_date_range,
            worst_case_lookback_years: 10,
            expected_returns_lookback_years: 10,
            expected_returns_fallback_default: 0.06,
            cash_proxy_fallback_return: 0.02,
            min_observations: 24,
            hac_lag_formula: HacLagFormula::default(),
            max_condition_number: 1e10,
            cache_capacity_bytes: 256 * 1024 * 1024,
            cache_entry_limit: 10_000,
            cache_ttl_seconds_by_kind,
            solver_tolerances: SolverTolerances::default(),
            numeric_ridge: 1e-10,
        }
    }
}
