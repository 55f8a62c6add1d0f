//! Maximum-expected-return program (§4.8): maximize `μᵀ w` subject to
//! `wᵀ Σ w ≤ max_portfolio_volatility²` and the same concentration,
//! variance-share, and loss bounds as MinVar.

use riskcore_core::result::OptimizationKind;
use riskcore_core::types::Portfolio;
use riskcore_core::{RiskError, RiskResult};
use riskcore_factors::FactorModelOutput;
use riskcore_math::optimize::{penalty_minimize, upper_bound_penalty};
use riskcore_traits::{EngineConfig, PriceProvider};
use tokio_util::sync::CancellationToken;

use crate::constraints::{equal_weighted, initial_weights, validate_nonempty, OptimizationContext};
use crate::expected_returns;
use crate::minvar::build_outcome;
use crate::penalty_config_from;
use crate::OptimizationOutcome;

/// Solves the maximum-expected-return program over `portfolio`'s
/// tickers, reusing an already-assembled `factor_model`.
///
/// `cancellation` is checked once per outer penalty-method round (§5),
/// the same as [`crate::minvar::solve`].
///
/// # Errors
///
/// Returns `RiskError::Infeasible` if the penalty method cannot drive
/// every constraint violation — including the volatility cap — below
/// tolerance within the configured rounds, `RiskError::Cancelled` if
/// `cancellation` fired before the solve completed. Propagates
/// `RiskError` from expected-return resolution, which feeds the
/// objective directly here (unlike MinVar, where it is informational
/// only).
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

    let expected_returns = expected_returns::resolve(portfolio, provider, config).await?;
    let mu: Vec<f64> = context
        .tickers()
        .iter()
        .map(|t| expected_returns.get(t).copied().unwrap_or(0.0))
        .collect();

    let volatility_cap = portfolio.risk_limits.max_portfolio_volatility.powi(2);

    let objective = |w: &[f64]| -mu.iter().zip(w.iter()).fold(0.0, |acc, (m, wi)| acc + m * wi);
    let penalty = |w: &[f64]| {
        context.limit_penalty(w) + upper_bound_penalty(context.portfolio_variance(w), volatility_cap)
    };
    let penalty_config = penalty_config_from(config);

    let result = penalty_minimize(objective, penalty, &initial, &penalty_config, || cancellation.is_cancelled())?;
    if result.cancelled {
        return Err(RiskError::Cancelled);
    }
    if !result.feasible {
        return Err(RiskError::infeasible(context.tightest_violation(&result.parameters)));
    }

    let achieved_risk = context.portfolio_variance(&result.parameters).max(0.0).sqrt();
    let achieved_return = -result.objective_value;
    let mut binding = context.binding_constraints(&result.parameters, config.solver_tolerances.equality_residual_tolerance);
    if (achieved_risk.powi(2) - volatility_cap).abs() <= config.solver_tolerances.equality_residual_tolerance {
        binding.push(riskcore_core::result::LimitId::PortfolioVolatility);
    }

    Ok(build_outcome(
        OptimizationKind::MaxRet,
        context.tickers(),
        &result.parameters,
        achieved_risk,
        achieved_return,
        binding,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nalgebra::DMatrix;
    use riskcore_core::types::{BetaVector, Date, DateRange, FactorPanel, MonthlySeries, RiskLimits, Ticker, MARKET};
    use riskcore_traits::error::TraitError;
    use riskcore_traits::market_data::DividendPayment;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    struct UnusedProvider;

    #[async_trait]
    impl PriceProvider for UnusedProvider {
        async fn fetch_monthly_close(&self, _t: &Ticker, _range: &DateRange) -> Result<MonthlySeries<f64>, TraitError> {
            unimplemented!()
        }
        async fn fetch_monthly_total_return(
            &self,
            _t: &Ticker,
            _range: &DateRange,
        ) -> Result<MonthlySeries<f64>, TraitError> {
            unimplemented!()
        }
        async fn fetch_monthly_treasury(
            &self,
            _m: riskcore_traits::market_data::TreasuryMaturity,
            _range: &DateRange,
        ) -> Result<MonthlySeries<f64>, TraitError> {
            unimplemented!()
        }
        async fn fetch_dividend_history(
            &self,
            _t: &Ticker,
            _range: &DateRange,
        ) -> Result<Vec<DividendPayment>, TraitError> {
            Ok(Vec::new())
        }
    }

    fn range() -> DateRange {
        DateRange::new(Date::from_ymd(2014, 1, 31).unwrap(), Date::from_ymd(2024, 1, 31).unwrap()).unwrap()
    }

    fn portfolio_with_explicit_returns() -> Portfolio {
        Portfolio::builder()
            .weight("NVDA", dec!(0.5))
            .expected_return("NVDA", dec!(0.15))
            .weight("V", dec!(0.5))
            .expected_return("V", dec!(0.05))
            .range(range())
            .risk_limits(RiskLimits {
                max_portfolio_volatility: 0.5,
                max_loss: -0.9,
                max_single_stock_weight: 0.9,
                max_factor_contribution: 1.0,
                max_market_contribution: 1.0,
                max_industry_contribution: 1.0,
                max_single_factor_loss: -0.9,
            })
            .build()
            .unwrap()
    }

    fn fixture_factor_model() -> FactorModelOutput {
        let mut betas = BTreeMap::new();
        betas.insert(
            Ticker::new("NVDA"),
            BetaVector {
                betas: BTreeMap::from([(MARKET.to_string(), 1.2)]),
                alpha: 0.0,
                residual_vol: 0.25,
                r_squared: 0.4,
            },
        );
        betas.insert(
            Ticker::new("V"),
            BetaVector {
                betas: BTreeMap::from([(MARKET.to_string(), 0.9)]),
                alpha: 0.0,
                residual_vol: 0.12,
                r_squared: 0.5,
            },
        );

        let mut idiosyncratic_variance = BTreeMap::new();
        idiosyncratic_variance.insert(Ticker::new("NVDA"), 0.0625);
        idiosyncratic_variance.insert(Ticker::new("V"), 0.0144);

        let mut panel = FactorPanel::new();
        panel.insert(
            MARKET,
            MonthlySeries::new(vec![
                (Date::from_ymd(2023, 11, 30).unwrap(), -0.08),
                (Date::from_ymd(2023, 12, 31).unwrap(), 0.02),
                (Date::from_ymd(2024, 1, 31).unwrap(), 0.01),
            ])
            .unwrap(),
        );

        FactorModelOutput {
            betas,
            residuals: BTreeMap::new(),
            idiosyncratic_variance,
            factor_labels: vec![MARKET.to_string()],
            factor_covariance: DMatrix::from_row_slice(1, 1, &[0.04]),
            factor_panel: panel,
            validated_tickers: vec![Ticker::new("NVDA"), Ticker::new("V")],
        }
    }

    #[tokio::test]
    async fn test_maxret_favors_higher_expected_return_ticker() {
        let portfolio = portfolio_with_explicit_returns();
        let config = EngineConfig::with_defaults(range());
        let factor_model = fixture_factor_model();
        let outcome = solve(&portfolio, &factor_model, &UnusedProvider, &config, &CancellationToken::new()).await.unwrap();
        assert!(outcome.weights[&Ticker::new("NVDA")] > outcome.weights[&Ticker::new("V")]);
    }

    #[tokio::test]
    async fn test_maxret_respects_volatility_cap() {
        let mut portfolio = portfolio_with_explicit_returns();
        portfolio.risk_limits.max_portfolio_volatility = 0.15;
        let config = EngineConfig::with_defaults(range());
        let factor_model = fixture_factor_model();
        let outcome = solve(&portfolio, &factor_model, &UnusedProvider, &config, &CancellationToken::new()).await.unwrap();
        assert!(outcome.achieved_risk <= 0.15 + 1e-2);
    }
}
