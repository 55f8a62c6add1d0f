//! Scenario application: builds a modified Portfolio from a
//! `ScenarioSpec`, auto-assigns proxies to any ticker new to the
//! portfolio, and re-runs C4-C6 on both the base and modified
//! portfolios (§4.7).

use std::collections::BTreeMap;

use riskcore_core::result::RiskAnalysis;
use riskcore_core::types::{AssetClass, Portfolio, ProxySet, Ticker};
use riskcore_core::RiskResult;
use riskcore_traits::reference::ReferenceMappings;
use riskcore_traits::{EngineConfig, PriceProvider};

use crate::spec::ScenarioSpec;

/// A scenario comparison: the base portfolio's analysis, the modified
/// portfolio's analysis, and the tickers a `ProxySet` was auto-assigned
/// to. The modified portfolio itself is never persisted or returned —
/// only its analysis.
#[derive(Debug, Clone)]
pub struct ScenarioOutput {
    /// The base portfolio's risk analysis.
    pub before: RiskAnalysis,
    /// The modified portfolio's risk analysis.
    pub after: RiskAnalysis,
    /// Tickers newly introduced by the scenario, for which a `ProxySet`
    /// was auto-assigned.
    pub new_tickers_assigned: Vec<Ticker>,
}

/// Runs a scenario: applies `spec` to `base`, auto-assigns proxies for
/// any new ticker, then re-runs the full risk analysis (C4-C6) on both
/// `base` and the modified portfolio. `default_exchange` is used only
/// when a new non-cash ticker needs system-default factor proxies and
/// no existing portfolio ticker can be used as a reference peer.
///
/// # Errors
///
/// Propagates any `RiskError` from proxy auto-assignment or from
/// running the risk analysis on either leg.
pub async fn run(
    base: &Portfolio,
    spec: &ScenarioSpec,
    provider: &dyn PriceProvider,
    reference: &dyn ReferenceMappings,
    config: &EngineConfig,
    default_exchange: &str,
) -> RiskResult<ScenarioOutput> {
    let (modified, new_tickers_assigned) = apply_spec(base, spec, reference, default_exchange)?;

    let before = riskcore_risk::build_analysis(base, provider, reference, config).await?;
    let after = riskcore_risk::build_analysis(&modified, provider, reference, config).await?;

    Ok(ScenarioOutput {
        before,
        after,
        new_tickers_assigned,
    })
}

/// Builds the modified portfolio without running any analysis — kept
/// separate so the §8 commutativity property (`new_weights = W` is
/// equivalent to a fresh portfolio with weights `W`) can be tested
/// directly against [`Portfolio::builder`] output.
///
/// # Errors
///
/// Propagates `RiskError` from proxy auto-assignment.
pub fn apply_spec(
    base: &Portfolio,
    spec: &ScenarioSpec,
    reference: &dyn ReferenceMappings,
    default_exchange: &str,
) -> RiskResult<(Portfolio, Vec<Ticker>)> {
    let weights = match &spec.new_weights {
        Some(new_weights) => new_weights.clone(),
        None => {
            let mut weights = base.weights.clone();
            for (ticker, delta) in &spec.delta {
                weights
                    .entry(ticker.clone())
                    .and_modify(|w| *w += *delta)
                    .or_insert(*delta);
            }
            weights
        }
    };

    let mut proxies = base.proxies.clone();
    let mut new_tickers_assigned = Vec::new();
    for ticker in weights.keys() {
        if proxies.contains_key(ticker) {
            continue;
        }
        let proxy_set = auto_assign_proxy(ticker, base, reference, default_exchange)?;
        proxies.insert(ticker.clone(), proxy_set);
        new_tickers_assigned.push(ticker.clone());
    }

    let modified = Portfolio {
        weights,
        range: base.range.clone(),
        proxies,
        risk_limits: base.risk_limits,
        expected_returns: base.expected_returns.clone(),
        normalize_weights: base.normalize_weights,
    };
    modified.validate()?;

    Ok((modified, new_tickers_assigned))
}

/// Auto-generates a `ProxySet` for a ticker new to the portfolio
/// (§4.7 step 2).
///
/// A cash pseudo-ticker (`CUR:*`) resolves no market/momentum/value/
/// industry proxy of its own — the provider resolves it to its
/// currency's short-duration cash proxy internally — but is tagged
/// `AssetClass::FixedIncome` so it still picks up the interest-rate
/// factor block in C4.
///
/// A non-cash ticker reuses the market/momentum/value proxies of any
/// existing portfolio ticker (a "reference peer"); absent one, it falls
/// back to `reference.default_factor_proxies(default_exchange)`. No
/// industry or subindustry-peer assignment is attempted automatically:
/// the spec's auto-assignment rule only covers standard factors and the
/// cash/industry reference lookups, and there is no industry label
/// input for a bare new ticker to look up against.
fn auto_assign_proxy(
    ticker: &Ticker,
    base: &Portfolio,
    reference: &dyn ReferenceMappings,
    default_exchange: &str,
) -> RiskResult<ProxySet> {
    if ticker.is_cash() {
        return riskcore_traits::reference::cash_proxy_set(ticker, reference);
    }

    let reference_peer = base.proxies.values().find(|p| p.market.is_some());
    let (market, momentum, value) = if let Some(peer) = reference_peer {
        (peer.market.clone(), peer.momentum.clone(), peer.value.clone())
    } else {
        let defaults = reference.default_factor_proxies(default_exchange)?;
        (Some(defaults.market), Some(defaults.momentum), Some(defaults.value))
    };

    Ok(ProxySet {
        market,
        momentum,
        value,
        industry: None,
        subindustry_peers: Vec::new(),
        asset_class: Some(AssetClass::Equity),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use riskcore_core::types::{Date, DateRange};
    use riskcore_traits::reference::ExchangeProxies;
    use riskcore_traits::TraitError;
    use rust_decimal_macros::dec;

    struct StubReference;

    impl ReferenceMappings for StubReference {
        fn cash_proxy(&self, currency_code: &str) -> Result<Ticker, TraitError> {
            if currency_code == "USD" {
                Ok(Ticker::new("BIL"))
            } else {
                Err(TraitError::UnmappedReference {
                    key: currency_code.to_string(),
                })
            }
        }

        fn industry_proxy(&self, _industry: &str) -> Result<Ticker, TraitError> {
            Err(TraitError::UnmappedReference {
                key: "industry".to_string(),
            })
        }

        fn default_factor_proxies(&self, _exchange: &str) -> Result<ExchangeProxies, TraitError> {
            Ok(ExchangeProxies {
                market: Ticker::new("SPY"),
                momentum: Ticker::new("MTUM"),
                value: Ticker::new("IWD"),
            })
        }
    }

    fn range() -> DateRange {
        DateRange::new(
            Date::from_ymd(2019, 1, 31).unwrap(),
            Date::from_ymd(2024, 3, 31).unwrap(),
        )
        .unwrap()
    }

    fn base_portfolio() -> Portfolio {
        Portfolio::builder()
            .weight("NVDA", dec!(0.4))
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
            .weight("V", dec!(0.3))
            .proxy(
                "V",
                ProxySet {
                    market: Some(Ticker::new("SPY")),
                    momentum: Some(Ticker::new("MTUM")),
                    value: Some(Ticker::new("IWD")),
                    industry: Some(Ticker::new("IYF")),
                    subindustry_peers: vec![],
                    asset_class: Some(AssetClass::Equity),
                },
            )
            .weight("IT", dec!(0.3))
            .proxy(
                "IT",
                ProxySet {
                    market: Some(Ticker::new("SPY")),
                    momentum: Some(Ticker::new("MTUM")),
                    value: Some(Ticker::new("IWD")),
                    industry: Some(Ticker::new("IYF")),
                    subindustry_peers: vec![],
                    asset_class: Some(AssetClass::Equity),
                },
            )
            .range(range())
            .risk_limits(riskcore_core::types::RiskLimits {
                max_portfolio_volatility: 0.25,
                max_loss: -0.2,
                max_single_stock_weight: 0.5,
                max_factor_contribution: 0.6,
                max_market_contribution: 0.6,
                max_industry_contribution: 0.6,
                max_single_factor_loss: -0.15,
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_delta_applies_on_top_of_existing_weight() {
        let base = base_portfolio();
        let spec = ScenarioSpec::parse_delta("NVDA:-200bp,V:+200bp").unwrap();
        let (modified, new_tickers) = apply_spec(&base, &spec, &StubReference, "NYSE").unwrap();
        assert!(new_tickers.is_empty());
        assert_eq!(modified.weights[&Ticker::new("NVDA")], dec!(0.38));
        assert_eq!(modified.weights[&Ticker::new("V")], dec!(0.32));
    }

    #[test]
    fn test_new_cash_ticker_gets_fixed_income_proxy() {
        let base = base_portfolio();
        let spec = ScenarioSpec::parse_delta("CUR:USD:-0.01").unwrap();
        let (modified, new_tickers) = apply_spec(&base, &spec, &StubReference, "NYSE").unwrap();
        assert_eq!(new_tickers, vec![Ticker::new("CUR:USD")]);
        let assigned = &modified.proxies[&Ticker::new("CUR:USD")];
        assert_eq!(assigned.asset_class, Some(AssetClass::FixedIncome));
        assert!(assigned.market.is_none());
    }

    #[test]
    fn test_new_equity_ticker_reuses_peer_proxies() {
        let base = base_portfolio();
        let mut new_weights = base.weights.clone();
        new_weights.insert(Ticker::new("MSFT"), dec!(0.1));
        let spec = ScenarioSpec::from_new_weights(new_weights);
        let (modified, new_tickers) = apply_spec(&base, &spec, &StubReference, "NYSE").unwrap();
        assert_eq!(new_tickers, vec![Ticker::new("MSFT")]);
        let assigned = &modified.proxies[&Ticker::new("MSFT")];
        assert_eq!(assigned.market, Some(Ticker::new("SPY")));
    }

    #[test]
    fn test_new_weights_commutes_with_fresh_portfolio() {
        let base = base_portfolio();
        let spec = ScenarioSpec::from_new_weights(base.weights.clone());
        let (modified, new_tickers) = apply_spec(&base, &spec, &StubReference, "NYSE").unwrap();
        assert!(new_tickers.is_empty());
        assert_eq!(modified.weights, base.weights);
        assert_eq!(modified.proxies, base.proxies);
    }
}
