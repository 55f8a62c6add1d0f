//! Reference mappings (§6): read-only lookups with a built-in default
//! table and an optional override source. Missing keys are reported as
//! a typed error — never a silent fallback.

use std::collections::BTreeMap;

use riskcore_core::types::{AssetClass, Portfolio, ProxySet, Ticker};
use riskcore_core::{RiskError, RiskResult};

use crate::error::TraitError;

/// Currency -> cash proxy ticker, industry label -> industry-ETF
/// ticker, exchange -> default factor proxy set.
pub trait ReferenceMappings: Send + Sync {
    /// Resolves a currency code (e.g. `"USD"`) to the short-duration
    /// cash proxy ticker used for that currency's pseudo-ticker.
    ///
    /// # Errors
    ///
    /// `TraitError::UnmappedReference` if the currency has no mapping in
    /// either the built-in table or the override source.
    fn cash_proxy(&self, currency_code: &str) -> Result<Ticker, TraitError>;

    /// Resolves an industry label to its industry-ETF proxy ticker.
    ///
    /// # Errors
    ///
    /// `TraitError::UnmappedReference` if the industry has no mapping.
    fn industry_proxy(&self, industry: &str) -> Result<Ticker, TraitError>;

    /// Resolves an exchange code to its default factor proxy set
    /// (market, momentum, value tickers).
    ///
    /// # Errors
    ///
    /// `TraitError::UnmappedReference` if the exchange has no mapping.
    fn default_factor_proxies(&self, exchange: &str) -> Result<ExchangeProxies, TraitError>;
}

/// An exchange's default market/momentum/value proxy tickers.
#[derive(Debug, Clone)]
pub struct ExchangeProxies {
    /// Market factor proxy.
    pub market: Ticker,
    /// Momentum factor proxy.
    pub momentum: Ticker,
    /// Value factor proxy.
    pub value: Ticker,
}

/// Resolves a cash pseudo-ticker's proxy set: no market/momentum/value/
/// industry proxy of its own — the provider resolves `CUR:<code>` to its
/// currency's short-duration proxy internally — tagged
/// `AssetClass::FixedIncome` so it still picks up the interest-rate
/// factor block in C4. Shared by scenario auto-assignment and base-
/// portfolio cash resolution so both paths map a cash ticker the same
/// way.
///
/// # Errors
///
/// Returns `RiskError::InputInvalid` if `ticker` is not a well-formed
/// cash ticker. Propagates `TraitError` (via `From`) if `reference` has
/// no mapping for the ticker's currency.
pub fn cash_proxy_set(ticker: &Ticker, reference: &dyn ReferenceMappings) -> RiskResult<ProxySet> {
    let currency = ticker.cash_currency().ok_or_else(|| {
        RiskError::input_invalid_for(ticker.as_str(), "cash ticker has an unparseable currency code")
    })?;
    reference.cash_proxy(currency.code())?;
    Ok(ProxySet {
        market: None,
        momentum: None,
        value: None,
        industry: None,
        subindustry_peers: Vec::new(),
        asset_class: Some(AssetClass::FixedIncome),
    })
}

/// Fills in a `ProxySet` for every cash pseudo-ticker present in
/// `portfolio.weights` but absent from `portfolio.proxies`. A base
/// portfolio's `validate()` allows a cash ticker through with no proxy
/// entry (§3); without this, such a ticker reaches factor assembly
/// unproxied and ends up with zero exposure, including zero rate
/// exposure, instead of the fixed-income proxy §4 describes. Non-cash
/// tickers are never touched here — `validate()` already rejects those
/// without a proxy before this runs.
///
/// # Errors
///
/// Propagates `RiskError` from [`cash_proxy_set`].
pub fn resolve_base_portfolio_cash_proxies(
    portfolio: &Portfolio,
    reference: &dyn ReferenceMappings,
) -> RiskResult<Portfolio> {
    let mut resolved = portfolio.clone();
    for ticker in portfolio.weights.keys() {
        if ticker.is_cash() && !resolved.proxies.contains_key(ticker) {
            resolved.proxies.insert(ticker.clone(), cash_proxy_set(ticker, reference)?);
        }
    }
    Ok(resolved)
}

/// A `ReferenceMappings` implementation backed by a built-in default
/// table, optionally overlaid with an override map. Overrides take
/// precedence; a key absent from both is `UnmappedReference`.
#[derive(Debug, Clone, Default)]
pub struct StaticReferenceMappings {
    cash_proxies: BTreeMap<String, Ticker>,
    industry_proxies: BTreeMap<String, Ticker>,
    exchange_proxies: BTreeMap<String, ExchangeProxies>,
}

impl StaticReferenceMappings {
    /// Builds the built-in default table (a minimal seed; production
    /// deployments widen it via `with_override`).
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut cash_proxies = BTreeMap::new();
        cash_proxies.insert("USD".to_string(), Ticker::new("BIL"));
        cash_proxies.insert("EUR".to_string(), Ticker::new("ESTR"));

        let mut exchange_proxies = BTreeMap::new();
        exchange_proxies.insert(
            "NYSE".to_string(),
            ExchangeProxies {
                market: Ticker::new("SPY"),
                momentum: Ticker::new("MTUM"),
                value: Ticker::new("VTV"),
            },
        );

        Self {
            cash_proxies,
            industry_proxies: BTreeMap::new(),
            exchange_proxies,
        }
    }

    /// Inserts or replaces a cash-proxy override.
    pub fn with_cash_proxy(mut self, currency_code: impl Into<String>, proxy: Ticker) -> Self {
        self.cash_proxies.insert(currency_code.into(), proxy);
        self
    }

    /// Inserts or replaces an industry-proxy override.
    pub fn with_industry_proxy(mut self, industry: impl Into<String>, proxy: Ticker) -> Self {
        self.industry_proxies.insert(industry.into(), proxy);
        self
    }

    /// Inserts or replaces an exchange's default proxy set.
    pub fn with_exchange_proxies(
        mut self,
        exchange: impl Into<String>,
        proxies: ExchangeProxies,
    ) -> Self {
        self.exchange_proxies.insert(exchange.into(), proxies);
        self
    }
}

impl ReferenceMappings for StaticReferenceMappings {
    fn cash_proxy(&self, currency_code: &str) -> Result<Ticker, TraitError> {
        self.cash_proxies
            .get(currency_code)
            .cloned()
            .ok_or_else(|| TraitError::UnmappedReference {
                key: format!("cash_proxy:{currency_code}"),
            })
    }

    fn industry_proxy(&self, industry: &str) -> Result<Ticker, TraitError> {
        self.industry_proxies
            .get(industry)
            .cloned()
            .ok_or_else(|| TraitError::UnmappedReference {
                key: format!("industry_proxy:{industry}"),
            })
    }

    fn default_factor_proxies(&self, exchange: &str) -> Result<ExchangeProxies, TraitError> {
        self.exchange_proxies
            .get(exchange)
            .cloned()
            .ok_or_else(|| TraitError::UnmappedReference {
                key: format!("exchange_proxies:{exchange}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cash_proxy_resolves() {
        let mappings = StaticReferenceMappings::with_defaults();
        assert_eq!(mappings.cash_proxy("USD").unwrap(), Ticker::new("BIL"));
    }

    #[test]
    fn test_missing_key_is_unmapped_reference_not_silent_fallback() {
        let mappings = StaticReferenceMappings::with_defaults();
        let err = mappings.cash_proxy("XYZ").unwrap_err();
        assert!(matches!(err, TraitError::UnmappedReference { .. }));
    }

    #[test]
    fn test_override_takes_precedence() {
        let mappings =
            StaticReferenceMappings::with_defaults().with_cash_proxy("USD", Ticker::new("SHV"));
        assert_eq!(mappings.cash_proxy("USD").unwrap(), Ticker::new("SHV"));
    }

    #[test]
    fn test_cash_proxy_set_is_fixed_income_with_no_factor_proxies() {
        let mappings = StaticReferenceMappings::with_defaults();
        let proxies = cash_proxy_set(&Ticker::new("CUR:USD"), &mappings).unwrap();
        assert_eq!(proxies.asset_class, Some(AssetClass::FixedIncome));
        assert!(proxies.market.is_none());
    }

    #[test]
    fn test_cash_proxy_set_propagates_unmapped_currency() {
        let mappings = StaticReferenceMappings::with_defaults();
        let err = cash_proxy_set(&Ticker::new("CUR:XYZ"), &mappings).unwrap_err();
        assert!(matches!(err, RiskError::InputInvalid { .. }));
    }

    #[test]
    fn test_resolve_base_portfolio_cash_proxies_fills_only_missing_cash_tickers() {
        use riskcore_core::types::{Date, DateRange, RiskLimits};
        use rust_decimal::Decimal;

        let range = DateRange::new(Date::from_ymd(2019, 1, 31).unwrap(), Date::from_ymd(2024, 3, 31).unwrap()).unwrap();
        let limits = RiskLimits {
            max_portfolio_volatility: 0.25,
            max_loss: -0.2,
            max_single_stock_weight: 0.5,
            max_factor_contribution: 0.6,
            max_market_contribution: 0.6,
            max_industry_contribution: 0.6,
            max_single_factor_loss: -0.15,
        };
        let portfolio = Portfolio::builder()
            .weight("NVDA", Decimal::ONE)
            .proxy("NVDA", ProxySet::empty())
            .weight("CUR:USD", Decimal::ONE)
            .range(range)
            .risk_limits(limits)
            .build()
            .unwrap();

        let mappings = StaticReferenceMappings::with_defaults();
        let resolved = resolve_base_portfolio_cash_proxies(&portfolio, &mappings).unwrap();

        let cash_proxy = &resolved.proxies[&Ticker::new("CUR:USD")];
        assert_eq!(cash_proxy.asset_class, Some(AssetClass::FixedIncome));
        assert_eq!(resolved.proxies[&Ticker::new("NVDA")], ProxySet::empty());
    }
}
