//! Auto-generated expected returns for MaxRet (§4.8): a ticker's
//! explicit `Portfolio::expected_returns` entry wins; otherwise cash
//! pseudo-tickers fall back to the mean treasury rate over the range
//! and equities to their industry ETF's annualized CAGR over
//! `config.expected_returns_lookback_years`.

use std::collections::BTreeMap;

use riskcore_core::decimal::to_f64_lossy;
use riskcore_core::types::{DateRange, Portfolio, Ticker};
use riskcore_core::RiskResult;
use riskcore_math::returns::cagr;
use riskcore_traits::market_data::TreasuryMaturity;
use riskcore_traits::{EngineConfig, PriceProvider};

/// Resolves an expected annual return for every ticker the portfolio
/// holds: explicit values from `portfolio.expected_returns` pass
/// through, everything else is auto-generated per §4.8.
///
/// Auto-generation never fails the whole resolve: a ticker whose
/// provider fetch errors (missing proxy, insufficient history) falls
/// back to `config.expected_returns_fallback_default` (or
/// `config.cash_proxy_fallback_return` for cash), since a missing
/// expected return should degrade the optimizer's objective, not abort
/// the run.
pub async fn resolve(
    portfolio: &Portfolio,
    provider: &dyn PriceProvider,
    config: &EngineConfig,
) -> RiskResult<BTreeMap<Ticker, f64>> {
    let lookback_start = portfolio
        .range
        .end()
        .add_months(-(i32::try_from(config.expected_returns_lookback_years).unwrap_or(i32::MAX) * 12))
        .unwrap_or(portfolio.range.start());
    let lookback_range = DateRange::new(lookback_start, portfolio.range.end()).unwrap_or(portfolio.range);

    let mut resolved = BTreeMap::new();
    for ticker in portfolio.weights.keys() {
        if let Some(explicit) = portfolio.expected_returns.get(ticker) {
            resolved.insert(ticker.clone(), to_f64_lossy(*explicit));
            continue;
        }

        let auto = if ticker.is_cash() {
            mean_treasury_rate(provider, &lookback_range)
                .await
                .unwrap_or(config.cash_proxy_fallback_return)
        } else {
            industry_cagr(ticker, portfolio, provider, &lookback_range, config)
                .await
                .unwrap_or(config.expected_returns_fallback_default)
        };
        resolved.insert(ticker.clone(), auto);
    }

    Ok(resolved)
}

/// Mean of the 2-year treasury yield (percent, converted to decimal)
/// over `range` — the nearest published tenor to a cash-equivalent
/// holding's duration.
async fn mean_treasury_rate(provider: &dyn PriceProvider, range: &DateRange) -> Option<f64> {
    let series = provider.fetch_monthly_treasury(TreasuryMaturity::Y2, range).await.ok()?;
    let values = series.values_vec();
    if values.is_empty() {
        return None;
    }
    let mean_percent = values.iter().sum::<f64>() / values.len() as f64;
    Some(mean_percent / 100.0)
}

/// Annualized CAGR of a ticker's industry ETF proxy total-return level
/// over `range`.
async fn industry_cagr(
    ticker: &Ticker,
    portfolio: &Portfolio,
    provider: &dyn PriceProvider,
    range: &DateRange,
    config: &EngineConfig,
) -> Option<f64> {
    let industry_proxy = portfolio.proxies.get(ticker)?.industry.as_ref()?;
    let series = provider.fetch_monthly_total_return(industry_proxy, range).await.ok()?;
    let points = series.points();
    let (_, start_value) = points.first()?;
    let (_, end_value) = points.last()?;
    let years = f64::from(config.expected_returns_lookback_years);
    cagr(*start_value, *end_value, years).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use riskcore_core::types::{AssetClass, Date, ProxySet};
    use riskcore_traits::error::TraitError;
    use riskcore_traits::market_data::DividendPayment;
    use rust_decimal_macros::dec;

    struct StubProvider;

    #[async_trait]
    impl PriceProvider for StubProvider {
        async fn fetch_monthly_close(
            &self,
            _ticker: &Ticker,
            _range: &DateRange,
        ) -> Result<riskcore_core::types::MonthlySeries<f64>, TraitError> {
            unimplemented!()
        }

        async fn fetch_monthly_total_return(
            &self,
            ticker: &Ticker,
            range: &DateRange,
        ) -> Result<riskcore_core::types::MonthlySeries<f64>, TraitError> {
            if ticker.as_str() == "SMH" {
                Ok(riskcore_core::types::MonthlySeries::new(vec![
                    (range.start(), 100.0),
                    (range.end(), 250.0),
                ])
                .unwrap())
            } else {
                Err(TraitError::DataUnavailable {
                    ticker: ticker.to_string(),
                    range: range.to_string(),
                })
            }
        }

        async fn fetch_monthly_treasury(
            &self,
            _maturity: TreasuryMaturity,
            range: &DateRange,
        ) -> Result<riskcore_core::types::MonthlySeries<f64>, TraitError> {
            Ok(riskcore_core::types::MonthlySeries::new(vec![(range.start(), 2.0), (range.end(), 4.0)]).unwrap())
        }

        async fn fetch_dividend_history(
            &self,
            _ticker: &Ticker,
            _range: &DateRange,
        ) -> Result<Vec<DividendPayment>, TraitError> {
            Ok(Vec::new())
        }
    }

    fn range() -> DateRange {
        DateRange::new(Date::from_ymd(2014, 1, 31).unwrap(), Date::from_ymd(2024, 1, 31).unwrap()).unwrap()
    }

    fn portfolio() -> Portfolio {
        Portfolio::builder()
            .weight("NVDA", dec!(0.5))
            .proxy(
                "NVDA",
                ProxySet {
                    market: Some(Ticker::new("SPY")),
                    momentum: Some(Ticker::new("MTUM")),
                    value: Some(Ticker::new("IWD")),
                    industry: Some(Ticker::new("SMH")),
                    subindustry_peers: vec![],
                    asset_class: Some(AssetClass::Equity),
                },
            )
            .weight("CUR:USD", dec!(0.5))
            .proxy(
                "CUR:USD",
                ProxySet {
                    market: None,
                    momentum: None,
                    value: None,
                    industry: None,
                    subindustry_peers: vec![],
                    asset_class: Some(AssetClass::FixedIncome),
                },
            )
            .range(range())
            .risk_limits(riskcore_core::types::RiskLimits {
                max_portfolio_volatility: 0.25,
                max_loss: -0.2,
                max_single_stock_weight: 1.0,
                max_factor_contribution: 1.0,
                max_market_contribution: 1.0,
                max_industry_contribution: 1.0,
                max_single_factor_loss: -1.0,
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_explicit_expected_return_passes_through() {
        let mut portfolio = portfolio();
        portfolio.expected_returns.insert(Ticker::new("NVDA"), dec!(0.3));
        let config = EngineConfig::with_defaults(range());
        let resolved = resolve(&portfolio, &StubProvider, &config).await.unwrap();
        assert!((resolved[&Ticker::new("NVDA")] - 0.3).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_equity_auto_generates_industry_cagr() {
        let portfolio = portfolio();
        let config = EngineConfig::with_defaults(range());
        let resolved = resolve(&portfolio, &StubProvider, &config).await.unwrap();
        let expected = cagr(100.0, 250.0, f64::from(config.expected_returns_lookback_years)).unwrap();
        assert!((resolved[&Ticker::new("NVDA")] - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_cash_auto_generates_mean_treasury_rate() {
        let portfolio = portfolio();
        let config = EngineConfig::with_defaults(range());
        let resolved = resolve(&portfolio, &StubProvider, &config).await.unwrap();
        assert!((resolved[&Ticker::new("CUR:USD")] - 0.03).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_missing_industry_proxy_falls_back_to_default() {
        let mut portfolio = portfolio();
        portfolio.proxies.get_mut(&Ticker::new("NVDA")).unwrap().industry = None;
        let config = EngineConfig::with_defaults(range());
        let resolved = resolve(&portfolio, &StubProvider, &config).await.unwrap();
        assert!((resolved[&Ticker::new("NVDA")] - config.expected_returns_fallback_default).abs() < 1e-12);
    }
}
