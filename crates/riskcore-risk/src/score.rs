//! Risk Score (C9, §4.9): maps C5/C6 outputs to a single `[0, 100]`
//! score, higher is safer.

use riskcore_core::result::{ComponentScore, FiniteF64, RiskCategory};
use riskcore_core::types::RiskLimits;
use riskcore_core::RiskResult;

use crate::engine::RiskEngineOutput;

/// Fixed component weights, in the order components are computed:
/// volatility, concentration, systematic share, factor tail, drawdown.
const WEIGHTS: [f64; 5] = [0.25, 0.20, 0.20, 0.20, 0.15];

/// Linear mapping shared by every component: `100` at `observed = 0`,
/// `0` at `observed >= 2 * limit_magnitude`, clamped to `[0, 100]`.
/// `limit_magnitude` is the absolute value of the limit — every
/// component here is checked against a distance from zero, regardless
/// of whether the underlying limit itself is a positive bound (like
/// `max_portfolio_volatility`) or a negative one (like `max_loss`).
fn linear_score(observed_magnitude: f64, limit_magnitude: f64) -> f64 {
    if limit_magnitude <= 0.0 {
        return 0.0;
    }
    let ratio = observed_magnitude / (2.0 * limit_magnitude);
    ((1.0 - ratio) * 100.0).clamp(0.0, 100.0)
}

/// Computes the composite risk score (§4.9) from risk-engine output and
/// the portfolio's limits.
///
/// # Errors
///
/// Returns `RiskError::NumericalFailure` if any component or the
/// overall score is non-finite.
pub fn compute(
    output: &RiskEngineOutput,
    limits: &RiskLimits,
) -> RiskResult<(FiniteF64, Vec<ComponentScore>, RiskCategory)> {
    let max_single_weight = output
        .effective_weights
        .values()
        .fold(0.0_f64, |acc, w| acc.max(w.abs()));

    let systematic_share = if output.total_variance.abs() > 1e-30 {
        output.systematic_variance / output.total_variance
    } else {
        0.0
    };

    let worst_factor_loss = output
        .worst_case_factor_loss
        .values()
        .copied()
        .fold(f64::INFINITY, f64::min);
    let worst_factor_loss = if worst_factor_loss.is_finite() { worst_factor_loss } else { 0.0 };

    let components_raw = [
        (
            "volatility",
            output.portfolio_volatility,
            limits.max_portfolio_volatility,
        ),
        ("concentration", max_single_weight, limits.max_single_stock_weight),
        (
            "systematic_share",
            systematic_share,
            limits.max_factor_contribution,
        ),
        (
            "factor_tail",
            worst_factor_loss.abs(),
            limits.max_single_factor_loss.abs(),
        ),
        (
            "drawdown_proxy",
            output.worst_case_portfolio_loss.abs(),
            limits.max_loss.abs(),
        ),
    ];

    let mut component_scores = Vec::with_capacity(components_raw.len());
    let mut weighted_sum = 0.0;
    for (i, (name, observed, limit)) in components_raw.iter().enumerate() {
        let score = linear_score(*observed, *limit);
        weighted_sum += WEIGHTS[i] * score;
        component_scores.push(ComponentScore {
            name: (*name).to_string(),
            score: FiniteF64::new(score)?,
            observed: FiniteF64::new(*observed)?,
            limit: FiniteF64::new(*limit)?,
        });
    }

    let overall = FiniteF64::new(weighted_sum)?;
    let category = RiskCategory::from_score(weighted_sum);
    Ok((overall, component_scores, category))
}

/// Builds the rationale strings for a risk score: one line per
/// component explaining its contribution, in the same order as the
/// component scores.
#[must_use]
pub fn rationale(components: &[ComponentScore]) -> Vec<String> {
    components
        .iter()
        .map(|c| {
            format!(
                "{}: observed {:.4} vs limit {:.4} -> score {:.1}/100",
                c.name, c.observed, c.limit, c.score
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_score_at_zero_is_hundred() {
        assert!((linear_score(0.0, 0.2) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_score_at_limit_is_fifty() {
        assert!((linear_score(0.2, 0.2) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_score_at_double_limit_is_zero() {
        assert!((linear_score(0.4, 0.2) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_score_clamps_beyond_double_limit() {
        assert_eq!(linear_score(1.0, 0.2), 0.0);
    }
}
