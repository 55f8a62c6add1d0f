//! Minimum-variance program (§4.8): minimize `wᵀ Σ w` subject to the
//! full `RiskLimits` constraint set.

use std::collections::BTreeMap;

use riskcore_core::result::{LimitId, OptimizationKind};
use riskcore_core::types::{Portfolio, Ticker};
use riskcore_core::{RiskError, RiskResult};
use riskcore_factors::FactorModelOutput;
use riskcore_math::optimize::{penalty_minimize, PenaltyConfig};
use riskcore_traits::{EngineConfig, PriceProvider};
use tokio_util::sync::CancellationToken;

use crate::constraints::{equal_weighted, initial_weights, validate_nonempty, OptimizationContext};
use crate::expected_returns;
use crate::penalty_config_from;
use crate::OptimizationOutcome;

/// Solves the minimum-variance program over `portfolio`'s tickers,
/// reusing an already-assembled `factor_model`.
///
/// `cancellation` is checked once per outer penalty-method round (§5);
/// a token cancelled mid-solve yields `RiskError::Cancelled` rather than
/// a partial result.
///
/// # Errors
///
/// Returns `RiskError::Infeasible` if the penalty method cannot drive
/// every constraint violation below `config.solver_tolerances`'s
/// equality residual tolerance within the configured rounds,
/// `RiskError::Cancelled` if `cancellation` fired before the solve
/// completed, and propagates `RiskError` from expected-return
/// resolution (used only to report achieved return alongside the
/// minimized-risk solution).
pub async fn solve(
    portfolio: &Portfolio,
    factor_model: &FactorModelOutput,
    provider: &dyn PriceProvider,
    config: &EngineConfig,
    cancellation: &CancellationToken,
) -> RiskResult<OptimizationOutcome> {
    let context = OptimizationContext::build(portfolio, factor_model, config)?;
    validate_nonempty(context.tickers())?;

    let mut initial = initial_weights(portfolio, context.tickers());
    if initial.iter().all(|w| w.abs() < 1e-15) {
        initial = equal_weighted(context.dim());
    }

    let objective = |w: &[f64]| context.portfolio_variance(w);
    let penalty = |w: &[f64]| context.limit_penalty(w);
    let penalty_config = penalty_config_from(config);

    let result = penalty_minimize(objective, penalty, &initial, &penalty_config, || cancellation.is_cancelled())?;
    if result.cancelled {
        return Err(RiskError::Cancelled);
    }
    if !result.feasible {
        return Err(RiskError::infeasible(context.tightest_violation(&result.parameters)));
    }

    let expected_returns = expected_returns::resolve(portfolio, provider, config).await?;
    let achieved_return = weighted_return(context.tickers(), &result.parameters, &expected_returns);
    let binding = context.binding_constraints(&result.parameters, config.solver_tolerances.equality_residual_tolerance);

    Ok(build_outcome(
        OptimizationKind::MinVar,
        context.tickers(),
        &result.parameters,
        result.objective_value.sqrt(),
        achieved_return,
        binding,
    ))
}

fn weighted_return(tickers: &[Ticker], weights: &[f64], expected_returns: &BTreeMap<Ticker, f64>) -> f64 {
    tickers
        .iter()
        .zip(weights.iter())
        .fold(0.0, |acc, (t, w)| acc + w * expected_returns.get(t).copied().unwrap_or(0.0))
}

pub(crate) fn build_outcome(
    kind: OptimizationKind,
    tickers: &[Ticker],
    weights: &[f64],
    achieved_risk: f64,
    achieved_return: f64,
    binding_constraints: Vec<LimitId>,
) -> OptimizationOutcome {
    OptimizationOutcome {
        kind,
        weights: tickers
            .iter()
            .zip(weights.iter())
            .map(|(t, w)| (t.clone(), *w))
            .collect(),
        achieved_risk,
        achieved_return,
        binding_constraints,
    }
}
