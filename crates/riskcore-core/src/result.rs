//! The Result Envelope (C11): a tagged `AnalysisResult` variant with two
//! pure derivations, `to_api()` and `to_report()`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::RiskError;
use crate::types::Ticker;

/// An `f64` that is guaranteed finite at construction and refuses to
/// serialize if it somehow isn't — NaN/Infinity are forbidden in
/// `to_api()` output per §4.11; failures must be tagged variants, never
/// numeric sentinels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiniteF64(f64);

impl FiniteF64 {
    /// Wraps a finite value.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::NumericalFailure` if `value` is NaN or
    /// infinite.
    pub fn new(value: f64) -> Result<Self, RiskError> {
        if value.is_finite() {
            Ok(Self(value))
        } else {
            Err(RiskError::numerical_failure(format!(
                "non-finite value produced: {value}"
            )))
        }
    }

    /// Returns the wrapped value.
    #[must_use]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Serialize for FiniteF64 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !self.0.is_finite() {
            return Err(serde::ser::Error::custom(
                "FiniteF64 holds a non-finite value at serialization time",
            ));
        }
        serializer.serialize_f64(self.0)
    }
}

impl fmt::Display for FiniteF64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

impl<'de> Deserialize<'de> for FiniteF64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        FiniteF64::new(value).map_err(serde::de::Error::custom)
    }
}

/// Identifies which risk limit a [`LimitCheck`] or optimizer binding
/// constraint refers to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LimitId {
    /// `max_portfolio_volatility`.
    PortfolioVolatility,
    /// `max_single_stock_weight`, for one ticker.
    SingleStockWeight(Ticker),
    /// `max_factor_contribution`, for one factor.
    FactorContribution(String),
    /// `max_market_contribution`.
    MarketContribution,
    /// `max_industry_contribution`.
    IndustryContribution,
    /// `max_single_factor_loss`, for one factor.
    SingleFactorLoss(String),
    /// `max_loss` (worst-case historical portfolio loss).
    WorstCaseLoss,
}

impl fmt::Display for LimitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitId::PortfolioVolatility => write!(f, "portfolio_volatility"),
            LimitId::SingleStockWeight(t) => write!(f, "single_stock_weight[{t}]"),
            LimitId::FactorContribution(factor) => write!(f, "factor_contribution[{factor}]"),
            LimitId::MarketContribution => write!(f, "market_contribution"),
            LimitId::IndustryContribution => write!(f, "industry_contribution"),
            LimitId::SingleFactorLoss(factor) => write!(f, "single_factor_loss[{factor}]"),
            LimitId::WorstCaseLoss => write!(f, "worst_case_loss"),
        }
    }
}

/// One risk-limit evaluation (C6). Evaluation does not short-circuit:
/// every limit in a request produces one of these, pass or fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitCheck {
    /// Which limit this check evaluates.
    pub limit_id: LimitId,
    /// Whether the observed value satisfies the limit.
    pub passed: bool,
    /// The observed value.
    pub observed: FiniteF64,
    /// The configured limit value.
    pub limit: FiniteF64,
    /// `limit - observed` (or its sign-appropriate equivalent) — how
    /// much headroom remains, negative if failing.
    pub margin: FiniteF64,
}

/// Top-line portfolio risk metrics (C5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetricsSummary {
    /// Annualized portfolio volatility, `sqrt(w^T Sigma w)`.
    pub portfolio_volatility: FiniteF64,
    /// Raw Herfindahl concentration index, `sum(w_i^2)`.
    pub herfindahl: FiniteF64,
    /// Herfindahl index normalized by `1/n` (1.0 = fully concentrated).
    pub herfindahl_normalized: FiniteF64,
}

/// Portfolio-level exposure to one factor, `E_f = (B^T w)_f`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorExposure {
    /// Factor label.
    pub factor: String,
    /// Exposure value.
    pub exposure: FiniteF64,
}

/// One ticker's Euler risk contribution, `RC_i = w_i (Sigma w)_i / sigma_p`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskContribution {
    /// Ticker this contribution belongs to.
    pub ticker: Ticker,
    /// The ticker's weight.
    pub weight: FiniteF64,
    /// The Euler contribution to portfolio volatility.
    pub contribution: FiniteF64,
    /// The contribution as a percentage of total portfolio volatility.
    pub contribution_pct: FiniteF64,
}

/// Variance decomposition into systematic (by-factor) and idiosyncratic
/// components (§4.5), satisfying
/// `sigma_p^2 = sum(V_f) + w^T diag(sigma_eps^2) w`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceDecomposition {
    /// Variance attributable to each factor, `V_f`.
    pub factor_variance: BTreeMap<String, FiniteF64>,
    /// Total systematic (factor) variance, `sum(V_f)`.
    pub systematic_variance: FiniteF64,
    /// Idiosyncratic variance, `w^T diag(sigma_eps^2) w`.
    pub idiosyncratic_variance: FiniteF64,
    /// Total portfolio variance.
    pub total_variance: FiniteF64,
}

/// A full risk analysis, the payload of `AnalysisResult::RiskAnalysis`
/// and the `before`/`after` legs of `AnalysisResult::Scenario`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAnalysis {
    /// Top-line metrics.
    pub metrics: RiskMetricsSummary,
    /// Portfolio-level factor exposures.
    pub factor_exposures: Vec<FactorExposure>,
    /// Per-ticker Euler risk contributions.
    pub risk_contributions: Vec<RiskContribution>,
    /// Variance decomposition.
    pub variance_decomposition: VarianceDecomposition,
    /// Risk-limit evaluations, every limit evaluated unconditionally.
    pub limit_checks: Vec<LimitCheck>,
    /// Free-text recommendations derived from the above (e.g. net
    /// exposure notes, concentration warnings).
    pub recommendations: Vec<String>,
}

/// Which convex program an `Optimization` result was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationKind {
    /// Minimum-variance program (§4.8).
    MinVar,
    /// Maximum-expected-return program (§4.8).
    MaxRet,
}

/// Risk-score category thresholds (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCategory {
    /// Score >= 80.
    Low,
    /// 60 <= score < 80.
    Moderate,
    /// 40 <= score < 60.
    Elevated,
    /// Score < 40.
    High,
}

impl RiskCategory {
    /// Categorizes a score per §4.9's fixed thresholds.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            RiskCategory::Low
        } else if score >= 60.0 {
            RiskCategory::Moderate
        } else if score >= 40.0 {
            RiskCategory::Elevated
        } else {
            RiskCategory::High
        }
    }
}

/// One risk-score sub-component (§4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentScore {
    /// Component name (`"volatility"`, `"concentration"`, ...).
    pub name: String,
    /// Sub-score in [0, 100].
    pub score: FiniteF64,
    /// The signal value that produced this sub-score.
    pub observed: FiniteF64,
    /// The limit the signal was compared against.
    pub limit: FiniteF64,
}

/// The tagged result variant every analysis kind produces (C11).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AnalysisResultKind {
    /// A standalone risk analysis (C5/C6/C9 combined).
    RiskAnalysis(RiskAnalysis),
    /// A before/after scenario comparison (C7).
    Scenario {
        /// The base portfolio's risk analysis.
        before: RiskAnalysis,
        /// The modified portfolio's risk analysis.
        after: RiskAnalysis,
        /// Tickers newly introduced by the scenario, for which a
        /// `ProxySet` was auto-assigned.
        new_tickers_assigned: Vec<Ticker>,
    },
    /// An optimizer result (C8).
    Optimization {
        /// Which program produced this result.
        kind: OptimizationKind,
        /// Optimal normalized weights.
        weights: BTreeMap<Ticker, FiniteF64>,
        /// Achieved portfolio volatility at the optimum.
        achieved_risk: FiniteF64,
        /// Achieved expected return at the optimum.
        achieved_return: FiniteF64,
        /// Constraints active (binding) at the optimum.
        binding_constraints: Vec<LimitId>,
    },
    /// A single ticker's factor-model fit (C4 output, surfaced
    /// directly).
    Stock {
        /// The ticker analyzed.
        ticker: Ticker,
        /// Factor betas.
        betas: BTreeMap<String, FiniteF64>,
        /// Annualized idiosyncratic volatility.
        idiosyncratic_vol: FiniteF64,
        /// Human-readable date range the fit was computed over.
        period: String,
    },
    /// A composite risk score (C9).
    RiskScore {
        /// Overall score in [0, 100].
        score: FiniteF64,
        /// Per-component sub-scores.
        component_scores: Vec<ComponentScore>,
        /// Free-text rationale citing the controlling limit per
        /// component.
        rationale: Vec<String>,
        /// The score's category.
        category: RiskCategory,
    },
}

/// The full result envelope: a tagged variant plus provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// The tagged result payload.
    pub kind: AnalysisResultKind,
    /// Content-addressed cache key for this computation's inputs.
    pub fingerprint: String,
    /// Unix timestamp (seconds) the result was produced at.
    pub as_of: i64,
    /// Hash of the provider data consumed, for provenance.
    pub inputs_digest: String,
}

impl AnalysisResult {
    /// Returns a JSON-safe structure. Serialization itself enforces the
    /// "no NaN/Infinity" invariant via [`FiniteF64`]; a result that
    /// contains one fails serialization rather than emitting a numeric
    /// sentinel.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if serialization fails (including
    /// the non-finite case above).
    pub fn to_api(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Renders a deterministic textual report with a stable section
    /// order, for operator consumption.
    #[must_use]
    pub fn to_report(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("fingerprint: {}\n", self.fingerprint));
        out.push_str(&format!("as_of:       {}\n", self.as_of));
        out.push_str(&format!("inputs:      {}\n", self.inputs_digest));
        out.push_str("---\n");
        match &self.kind {
            AnalysisResultKind::RiskAnalysis(analysis) => render_risk_analysis(&mut out, analysis),
            AnalysisResultKind::Scenario {
                before,
                after,
                new_tickers_assigned,
            } => {
                out.push_str("[scenario: before]\n");
                render_risk_analysis(&mut out, before);
                out.push_str("[scenario: after]\n");
                render_risk_analysis(&mut out, after);
                out.push_str(&format!(
                    "new tickers assigned proxies: {}\n",
                    new_tickers_assigned
                        .iter()
                        .map(Ticker::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
            AnalysisResultKind::Optimization {
                kind,
                weights,
                achieved_risk,
                achieved_return,
                binding_constraints,
            } => {
                out.push_str(&format!(
                    "optimization: {}\n",
                    match kind {
                        OptimizationKind::MinVar => "min-variance",
                        OptimizationKind::MaxRet => "max-return",
                    }
                ));
                for (ticker, w) in weights {
                    out.push_str(&format!("  {ticker:<12} {w}\n"));
                }
                out.push_str(&format!("achieved risk:   {achieved_risk}\n"));
                out.push_str(&format!("achieved return: {achieved_return}\n"));
                out.push_str(&format!(
                    "binding constraints: {}\n",
                    binding_constraints
                        .iter()
                        .map(LimitId::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
            AnalysisResultKind::Stock {
                ticker,
                betas,
                idiosyncratic_vol,
                period,
            } => {
                out.push_str(&format!("stock: {ticker} ({period})\n"));
                for (factor, beta) in betas {
                    out.push_str(&format!("  beta[{factor:<12}] = {beta}\n"));
                }
                out.push_str(&format!("idiosyncratic vol: {idiosyncratic_vol}\n"));
            }
            AnalysisResultKind::RiskScore {
                score,
                component_scores,
                rationale,
                category,
            } => {
                out.push_str(&format!("risk score: {score} ({category:?})\n"));
                for component in component_scores {
                    out.push_str(&format!(
                        "  {:<16} score={} observed={} limit={}\n",
                        component.name, component.score, component.observed, component.limit
                    ));
                }
                for line in rationale {
                    out.push_str(&format!("  - {line}\n"));
                }
            }
        }
        out
    }
}

fn render_risk_analysis(out: &mut String, analysis: &RiskAnalysis) {
    out.push_str(&format!(
        "portfolio volatility: {}\n",
        analysis.metrics.portfolio_volatility
    ));
    out.push_str(&format!(
        "herfindahl: {} (normalized {})\n",
        analysis.metrics.herfindahl, analysis.metrics.herfindahl_normalized
    ));
    out.push_str("factor exposures:\n");
    for exposure in &analysis.factor_exposures {
        out.push_str(&format!("  {:<12} {}\n", exposure.factor, exposure.exposure));
    }
    out.push_str("risk contributions:\n");
    for contribution in &analysis.risk_contributions {
        out.push_str(&format!(
            "  {:<12} weight={} contribution={} ({}%)\n",
            contribution.ticker,
            contribution.weight,
            contribution.contribution,
            contribution.contribution_pct
        ));
    }
    out.push_str("limit checks:\n");
    for check in &analysis.limit_checks {
        out.push_str(&format!(
            "  [{}] {} observed={} limit={} margin={}\n",
            if check.passed { "PASS" } else { "FAIL" },
            check.limit_id,
            check.observed,
            check.limit,
            check.margin
        ));
    }
    for rec in &analysis.recommendations {
        out.push_str(&format!("note: {rec}\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_f64_rejects_nan() {
        assert!(FiniteF64::new(f64::NAN).is_err());
        assert!(FiniteF64::new(f64::INFINITY).is_err());
        assert!(FiniteF64::new(1.5).is_ok());
    }

    #[test]
    fn test_risk_category_thresholds() {
        assert_eq!(RiskCategory::from_score(85.0), RiskCategory::Low);
        assert_eq!(RiskCategory::from_score(65.0), RiskCategory::Moderate);
        assert_eq!(RiskCategory::from_score(45.0), RiskCategory::Elevated);
        assert_eq!(RiskCategory::from_score(10.0), RiskCategory::High);
        // Boundary behavior: exactly-on-threshold values round up.
        assert_eq!(RiskCategory::from_score(80.0), RiskCategory::Low);
        assert_eq!(RiskCategory::from_score(60.0), RiskCategory::Moderate);
        assert_eq!(RiskCategory::from_score(40.0), RiskCategory::Elevated);
    }

    #[test]
    fn test_to_api_roundtrips_through_json() {
        let result = AnalysisResult {
            kind: AnalysisResultKind::RiskScore {
                score: FiniteF64::new(72.0).unwrap(),
                component_scores: vec![],
                rationale: vec!["within bounds".to_string()],
                category: RiskCategory::Moderate,
            },
            fingerprint: "abc123".to_string(),
            as_of: 1_700_000_000,
            inputs_digest: "def456".to_string(),
        };
        let value = result.to_api().unwrap();
        assert_eq!(value["fingerprint"], "abc123");
        assert_eq!(value["kind"]["kind"], "RiskScore");
    }

    #[test]
    fn test_to_report_has_stable_section_order() {
        let result = AnalysisResult {
            kind: AnalysisResultKind::RiskScore {
                score: FiniteF64::new(72.0).unwrap(),
                component_scores: vec![],
                rationale: vec![],
                category: RiskCategory::Moderate,
            },
            fingerprint: "abc123".to_string(),
            as_of: 1_700_000_000,
            inputs_digest: "def456".to_string(),
        };
        let report = result.to_report();
        assert!(report.starts_with("fingerprint:"));
        assert!(report.contains("risk score:"));
    }

    #[test]
    fn test_analysis_result_round_trips_through_json() {
        let result = AnalysisResult {
            kind: AnalysisResultKind::RiskScore {
                score: FiniteF64::new(72.0).unwrap(),
                component_scores: vec![ComponentScore {
                    name: "volatility".to_string(),
                    score: FiniteF64::new(80.0).unwrap(),
                    observed: FiniteF64::new(0.1).unwrap(),
                    limit: FiniteF64::new(0.2).unwrap(),
                }],
                rationale: vec!["within bounds".to_string()],
                category: RiskCategory::Moderate,
            },
            fingerprint: "abc123".to_string(),
            as_of: 1_700_000_000,
            inputs_digest: "def456".to_string(),
        };
        let bytes = serde_json::to_vec(&result).unwrap();
        let parsed: AnalysisResult = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.fingerprint, result.fingerprint);
        match parsed.kind {
            AnalysisResultKind::RiskScore { score, .. } => {
                assert!((score.get() - 72.0).abs() < 1e-12);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_finite_f64_rejects_non_finite_on_deserialize() {
        let err = serde_json::from_str::<FiniteF64>("null");
        assert!(err.is_err());
    }
}
