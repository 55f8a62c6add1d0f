//! Assembles a full [`RiskAnalysis`] leg (C4 -> C5 -> C6, plus
//! recommendation text) for one portfolio. Shared by standalone risk
//! analyses and both legs of a scenario comparison (C7), so the
//! before/after legs of a scenario are built exactly the same way a
//! standalone analysis would be.

use rust_decimal::Decimal;

use riskcore_core::result::RiskAnalysis;
use riskcore_core::types::Portfolio;
use riskcore_core::RiskResult;
use riskcore_traits::reference::{resolve_base_portfolio_cash_proxies, ReferenceMappings};
use riskcore_traits::{EngineConfig, PriceProvider};

use crate::engine;
use crate::limits;

/// Runs C4 (factor model assembly), C5 (risk engine), and C6 (limit
/// checks) over `portfolio`, returning the full analysis leg.
///
/// A base-portfolio cash ticker with no explicit proxy is auto-mapped to
/// its fixed-income proxy before assembly, the same resolution a
/// scenario's new cash tickers get (§4.7) — `Portfolio::validate` allows
/// such a ticker through unproxied, so without this it would reach
/// factor assembly and end up with zero exposure, including zero rate
/// exposure.
///
/// # Errors
///
/// Propagates any `RiskError` from cash-proxy resolution, factor
/// assembly, the risk engine, or limit evaluation.
pub async fn build(
    portfolio: &Portfolio,
    provider: &dyn PriceProvider,
    reference: &dyn ReferenceMappings,
    config: &EngineConfig,
) -> RiskResult<RiskAnalysis> {
    let portfolio = &resolve_base_portfolio_cash_proxies(portfolio, reference)?;
    let factor_model = riskcore_factors::assemble(portfolio, provider, config, &portfolio.range).await?;
    let output = engine::compute(portfolio, &factor_model, config)?;
    let (metrics, factor_exposures, risk_contributions, variance_decomposition) =
        engine::to_result_parts(&output)?;
    let limit_checks = limits::evaluate(portfolio, &output, &portfolio.risk_limits)?;

    let mut recommendations = limits::recommendations(&limit_checks);
    let net = portfolio.net_weight();
    if (net - Decimal::ONE).abs() > Decimal::new(1, 9) {
        recommendations.push(format!(
            "net portfolio weight is {net}, not 1.0; risk computed on {} weights",
            if portfolio.normalize_weights {
                "normalized"
            } else {
                "raw"
            }
        ));
    }

    Ok(RiskAnalysis {
        metrics,
        factor_exposures,
        risk_contributions,
        variance_decomposition,
        limit_checks,
        recommendations,
    })
}
