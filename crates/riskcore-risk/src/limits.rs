//! Risk Limit Checker (C6, §4.6): typed, non-short-circuiting checks
//! over the Portfolio Risk Engine's (C5) output.

use riskcore_core::result::{FiniteF64, LimitCheck, LimitId};
use riskcore_core::types::{Portfolio, RiskLimits, INDUSTRY, MARKET};
use riskcore_core::{RiskError, RiskResult};

use crate::engine::RiskEngineOutput;

fn check(limit_id: LimitId, observed: f64, limit: f64, passed: bool) -> RiskResult<LimitCheck> {
    Ok(LimitCheck {
        limit_id,
        passed,
        observed: FiniteF64::new(observed)?,
        limit: FiniteF64::new(limit)?,
        margin: FiniteF64::new(limit - observed)?,
    })
}

/// Evaluates every risk limit in `limits` against `output`. Every limit
/// produces exactly one [`LimitCheck`]; none short-circuit on failure.
///
/// # Errors
///
/// Returns `RiskError::NumericalFailure` if an observed or limit value
/// is non-finite.
pub fn evaluate(
    portfolio: &Portfolio,
    output: &RiskEngineOutput,
    limits: &RiskLimits,
) -> RiskResult<Vec<LimitCheck>> {
    let mut checks = Vec::new();

    checks.push(check(
        LimitId::PortfolioVolatility,
        output.portfolio_volatility,
        limits.max_portfolio_volatility,
        output.portfolio_volatility <= limits.max_portfolio_volatility,
    )?);

    for ticker in portfolio.weights.keys() {
        let weight = output.effective_weights.get(ticker).copied().unwrap_or(0.0);
        let observed = weight.abs();
        checks.push(check(
            LimitId::SingleStockWeight(ticker.clone()),
            observed,
            limits.max_single_stock_weight,
            observed <= limits.max_single_stock_weight,
        )?);
    }

    let total_variance = output.total_variance.max(1e-30);
    for (factor, variance) in &output.factor_variance {
        let share = variance / total_variance;
        let (limit_id, bound) = factor_contribution_limit(factor, limits);
        checks.push(check(limit_id, share, bound, share <= bound)?);
    }

    for ticker in portfolio.weights.keys() {
        let has_asset_class = portfolio.proxies.get(ticker).is_some_and(|p| p.asset_class.is_some());
        if !has_asset_class {
            return Err(RiskError::input_invalid_for(
                ticker.as_str(),
                "worst-case-loss limit checks require a resolved asset_class",
            ));
        }
    }

    for (factor, loss) in &output.worst_case_factor_loss {
        checks.push(check(
            LimitId::SingleFactorLoss(factor.clone()),
            *loss,
            limits.max_single_factor_loss,
            *loss >= limits.max_single_factor_loss,
        )?);
    }

    checks.push(check(
        LimitId::WorstCaseLoss,
        output.worst_case_portfolio_loss,
        limits.max_loss,
        output.worst_case_portfolio_loss >= limits.max_loss,
    )?);

    Ok(checks)
}

/// Picks the limit a factor's variance share is checked against:
/// `market`/`industry` have dedicated limits, every other factor
/// (momentum, value, subindustry, interest-rate tenors) uses the
/// general `max_factor_contribution`.
fn factor_contribution_limit(factor: &str, limits: &RiskLimits) -> (LimitId, f64) {
    if factor == MARKET {
        (LimitId::MarketContribution, limits.max_market_contribution)
    } else if factor.starts_with(INDUSTRY) {
        (LimitId::IndustryContribution, limits.max_industry_contribution)
    } else {
        (
            LimitId::FactorContribution(factor.to_string()),
            limits.max_factor_contribution,
        )
    }
}

/// Generates short, deterministic recommendation strings for failed
/// checks — one per failure, in the same order as `checks`. Passing
/// checks contribute nothing.
#[must_use]
pub fn recommendations(checks: &[LimitCheck]) -> Vec<String> {
    checks
        .iter()
        .filter(|c| !c.passed)
        .map(|c| {
            format!(
                "{} is out of bounds: observed {:.4}, limit {:.4} (margin {:.4})",
                c.limit_id, c.observed, c.limit, c.margin
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskcore_core::types::{AssetClass, Date, ProxySet, Ticker};
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn sample_limits() -> RiskLimits {
        RiskLimits {
            max_portfolio_volatility: 0.2,
            max_loss: -0.15,
            max_single_stock_weight: 0.5,
            max_factor_contribution: 0.6,
            max_market_contribution: 0.6,
            max_industry_contribution: 0.6,
            max_single_factor_loss: -0.1,
        }
    }

    fn sample_portfolio() -> Portfolio {
        Portfolio::builder()
            .weight("CUR:USD", dec!(1.0))
            .proxy(
                "CUR:USD",
                ProxySet {
                    asset_class: Some(AssetClass::FixedIncome),
                    ..ProxySet::empty()
                },
            )
            .range(
                riskcore_core::types::DateRange::new(
                    Date::from_ymd(2023, 1, 31).unwrap(),
                    Date::from_ymd(2024, 1, 31).unwrap(),
                )
                .unwrap(),
            )
            .risk_limits(sample_limits())
            .build()
            .unwrap()
    }

    fn sample_output(volatility: f64) -> RiskEngineOutput {
        let mut effective_weights = BTreeMap::new();
        effective_weights.insert(Ticker::new("CUR:USD"), 1.0);
        RiskEngineOutput {
            portfolio_volatility: volatility,
            herfindahl: 1.0,
            herfindahl_normalized: 1.0,
            factor_exposure: BTreeMap::new(),
            risk_contributions: BTreeMap::new(),
            effective_weights,
            factor_variance: BTreeMap::new(),
            systematic_variance: 0.0,
            idiosyncratic_variance: 0.0,
            total_variance: volatility * volatility,
            worst_case_factor_loss: BTreeMap::new(),
            worst_case_portfolio_loss: -0.05,
        }
    }

    #[test]
    fn test_portfolio_volatility_check_fails_above_limit() {
        let portfolio = sample_portfolio();
        let output = sample_output(0.3);
        let checks = evaluate(&portfolio, &output, &portfolio.risk_limits).unwrap();
        let vol_check = checks
            .iter()
            .find(|c| matches!(c.limit_id, LimitId::PortfolioVolatility))
            .unwrap();
        assert!(!vol_check.passed);
    }

    #[test]
    fn test_portfolio_volatility_check_passes_under_limit() {
        let portfolio = sample_portfolio();
        let output = sample_output(0.1);
        let checks = evaluate(&portfolio, &output, &portfolio.risk_limits).unwrap();
        let vol_check = checks
            .iter()
            .find(|c| matches!(c.limit_id, LimitId::PortfolioVolatility))
            .unwrap();
        assert!(vol_check.passed);
    }

    #[test]
    fn test_recommendations_only_include_failures() {
        let portfolio = sample_portfolio();
        let output = sample_output(0.3);
        let checks = evaluate(&portfolio, &output, &portfolio.risk_limits).unwrap();
        let recs = recommendations(&checks);
        assert!(!recs.is_empty());
        assert!(recs.iter().any(|r| r.contains("portfolio_volatility")));
    }

    #[test]
    fn test_unresolved_asset_class_rejects_worst_case_loss_check() {
        let portfolio = Portfolio::builder()
            .weight("CUR:USD", dec!(1.0))
            .range(
                riskcore_core::types::DateRange::new(
                    Date::from_ymd(2023, 1, 31).unwrap(),
                    Date::from_ymd(2024, 1, 31).unwrap(),
                )
                .unwrap(),
            )
            .risk_limits(sample_limits())
            .build()
            .unwrap();
        let output = sample_output(0.1);
        let err = evaluate(&portfolio, &output, &portfolio.risk_limits).unwrap_err();
        assert!(matches!(err, RiskError::InputInvalid { .. }));
    }
}
