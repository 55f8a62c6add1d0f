//! Portfolio, `ProxySet`, `RiskLimits`, and the per-ticker asset-class tag.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{DateRange, Ticker};
use crate::error::RiskError;

/// A factor proxy set for one ticker: the tickers standing in for its
/// market, momentum, value, and industry factor exposures, plus an
/// ordered peer list for the subindustry factor.
///
/// Any field may be absent for cash-like tickers, in which case the
/// ticker is treated as having no systematic exposure beyond the
/// risk-free rate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySet {
    /// Market factor proxy ticker.
    pub market: Option<Ticker>,
    /// Momentum factor proxy ticker.
    pub momentum: Option<Ticker>,
    /// Value factor proxy ticker.
    pub value: Option<Ticker>,
    /// Industry factor proxy ticker.
    pub industry: Option<Ticker>,
    /// Ordered subindustry peer tickers, used to build the subindustry
    /// factor after peer validation.
    pub subindustry_peers: Vec<Ticker>,
    /// Per-ticker asset-class tag. Required for worst-case-loss limit
    /// checks (§4.6); its absence fails those specific checks with
    /// `InputInvalid` rather than falling back to a guess.
    pub asset_class: Option<AssetClass>,
}

impl ProxySet {
    /// Creates an empty proxy set (no systematic exposure beyond the
    /// risk-free rate — appropriate for a bare cash ticker).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Per-ticker asset class, used to gate worst-case-loss risk-limit
/// checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetClass {
    /// Common or preferred equity.
    Equity,
    /// A cash or cash-equivalent pseudo-ticker.
    Cash,
    /// Fixed income instrument.
    FixedIncome,
    /// Commodity or commodity-linked instrument.
    Commodity,
    /// Any other asset class, named explicitly.
    Other(String),
}

/// Typed risk limits evaluated by the Risk Limit Checker (C6) and reused
/// as the constraint set for both optimizer programs (C8).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Maximum acceptable annualized portfolio volatility, > 0.
    pub max_portfolio_volatility: f64,
    /// Worst acceptable one-month loss under the worst-case lookback
    /// scenario, a negative decimal.
    pub max_loss: f64,
    /// Maximum acceptable absolute weight for any single ticker, in
    /// (0, 1].
    pub max_single_stock_weight: f64,
    /// Maximum variance share attributable to any one factor, in
    /// (0, 1].
    pub max_factor_contribution: f64,
    /// Maximum variance share attributable to the market factor, in
    /// (0, 1].
    pub max_market_contribution: f64,
    /// Maximum variance share attributable to the industry factor, in
    /// (0, 1].
    pub max_industry_contribution: f64,
    /// Minimum acceptable per-factor worst-case loss, a negative
    /// decimal.
    pub max_single_factor_loss: f64,
}

impl RiskLimits {
    /// Validates that the limit values are in their required ranges.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::InputInvalid` if any bound is outside its
    /// documented range.
    pub fn validate(&self) -> Result<(), RiskError> {
        if self.max_portfolio_volatility <= 0.0 {
            return Err(RiskError::input_invalid(
                "max_portfolio_volatility must be > 0",
            ));
        }
        if self.max_loss >= 0.0 {
            return Err(RiskError::input_invalid("max_loss must be negative"));
        }
        if !(0.0..=1.0).contains(&self.max_single_stock_weight) || self.max_single_stock_weight == 0.0 {
            return Err(RiskError::input_invalid(
                "max_single_stock_weight must be in (0, 1]",
            ));
        }
        for (name, v) in [
            ("max_factor_contribution", self.max_factor_contribution),
            ("max_market_contribution", self.max_market_contribution),
            ("max_industry_contribution", self.max_industry_contribution),
        ] {
            if !(0.0..=1.0).contains(&v) || v == 0.0 {
                return Err(RiskError::input_invalid(format!("{name} must be in (0, 1]")));
            }
        }
        if self.max_single_factor_loss >= 0.0 {
            return Err(RiskError::input_invalid(
                "max_single_factor_loss must be negative",
            ));
        }
        Ok(())
    }
}

/// A portfolio: signed weights over tickers, a date range, per-ticker
/// factor proxies, risk limits, and optional expected returns.
///
/// The engine never mutates an input portfolio; scenarios produce a new
/// value (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    /// Signed weight per ticker. Shorts are allowed; long-only is not
    /// assumed.
    pub weights: BTreeMap<Ticker, Decimal>,
    /// The date range the analysis is computed over.
    pub range: DateRange,
    /// Factor proxy set per non-cash ticker.
    pub proxies: BTreeMap<Ticker, ProxySet>,
    /// Risk limits evaluated against this portfolio.
    pub risk_limits: RiskLimits,
    /// Optional annual expected return per ticker, used by the
    /// max-return optimizer (C8) when present.
    pub expected_returns: BTreeMap<Ticker, Decimal>,
    /// When `false` (the default), weights reflect true economic
    /// exposure and may sum to any finite value. When `true`, weights
    /// are normalized to sum to 1 before risk is computed. The
    /// optimizer normalizes internally regardless of this flag.
    pub normalize_weights: bool,
}

impl Default for Portfolio {
    fn default() -> Self {
        // A Default impl needs *some* range; callers are expected to
        // override it via the builder. `unwrap` is safe: 1970-01-31 is
        // always a valid month-end date.
        let epoch = super::Date::from_ymd(1970, 1, 1).unwrap().end_of_month();
        Self {
            weights: BTreeMap::new(),
            range: DateRange::new(epoch, epoch).unwrap(),
            proxies: BTreeMap::new(),
            risk_limits: RiskLimits {
                max_portfolio_volatility: 1.0,
                max_loss: -1.0,
                max_single_stock_weight: 1.0,
                max_factor_contribution: 1.0,
                max_market_contribution: 1.0,
                max_industry_contribution: 1.0,
                max_single_factor_loss: -1.0,
            },
            expected_returns: BTreeMap::new(),
            normalize_weights: false,
        }
    }
}

impl Portfolio {
    /// Creates a new portfolio builder.
    #[must_use]
    pub fn builder() -> PortfolioBuilder {
        PortfolioBuilder::default()
    }

    /// Validates the invariants from §3: every non-cash ticker in
    /// `weights` has a `proxies` entry, and (when `normalize_weights`)
    /// that weights are normalizable (net weight nonzero).
    ///
    /// # Errors
    ///
    /// Returns `RiskError::InputInvalid` on a missing proxy entry or an
    /// unnormalizable zero net weight.
    pub fn validate(&self) -> Result<(), RiskError> {
        for ticker in self.weights.keys() {
            if !ticker.is_cash() && !self.proxies.contains_key(ticker) {
                return Err(RiskError::input_invalid_for(
                    ticker.as_str(),
                    "ticker has a weight but no proxy set",
                ));
            }
        }
        if self.normalize_weights {
            let net: Decimal = self.weights.values().copied().sum();
            if net.is_zero() {
                return Err(RiskError::input_invalid(
                    "portfolio net weight is zero and normalize_weights=true; cannot normalize",
                ));
            }
        }
        self.risk_limits.validate()
    }

    /// Net (signed) sum of weights.
    #[must_use]
    pub fn net_weight(&self) -> Decimal {
        self.weights.values().copied().sum()
    }

    /// Returns weights normalized to sum to 1, regardless of
    /// `normalize_weights` — used internally by the optimizer (§4.8),
    /// which always normalizes.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::InputInvalid` if the net weight is zero.
    pub fn normalized_weights(&self) -> Result<BTreeMap<Ticker, Decimal>, RiskError> {
        let net = self.net_weight();
        if net.is_zero() {
            return Err(RiskError::input_invalid(
                "cannot normalize a portfolio with zero net weight",
            ));
        }
        Ok(self
            .weights
            .iter()
            .map(|(t, w)| (t.clone(), *w / net))
            .collect())
    }
}

/// Fluent builder for [`Portfolio`].
#[derive(Debug, Clone, Default)]
pub struct PortfolioBuilder {
    weights: BTreeMap<Ticker, Decimal>,
    range: Option<DateRange>,
    proxies: BTreeMap<Ticker, ProxySet>,
    risk_limits: Option<RiskLimits>,
    expected_returns: BTreeMap<Ticker, Decimal>,
    normalize_weights: bool,
}

impl PortfolioBuilder {
    /// Sets a single ticker's weight, replacing any prior value.
    #[must_use]
    pub fn weight(mut self, ticker: impl Into<Ticker>, weight: Decimal) -> Self {
        self.weights.insert(ticker.into(), weight);
        self
    }

    /// Sets the date range.
    #[must_use]
    pub fn range(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Attaches a proxy set to a ticker.
    #[must_use]
    pub fn proxy(mut self, ticker: impl Into<Ticker>, proxies: ProxySet) -> Self {
        self.proxies.insert(ticker.into(), proxies);
        self
    }

    /// Sets the risk limits.
    #[must_use]
    pub fn risk_limits(mut self, limits: RiskLimits) -> Self {
        self.risk_limits = Some(limits);
        self
    }

    /// Sets a ticker's expected annual return.
    #[must_use]
    pub fn expected_return(mut self, ticker: impl Into<Ticker>, value: Decimal) -> Self {
        self.expected_returns.insert(ticker.into(), value);
        self
    }

    /// Sets `normalize_weights` (default `false` per §9).
    #[must_use]
    pub fn normalize_weights(mut self, normalize: bool) -> Self {
        self.normalize_weights = normalize;
        self
    }

    /// Builds and validates the portfolio.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::InputInvalid` if `range` is unset or the
    /// built portfolio fails [`Portfolio::validate`].
    pub fn build(self) -> Result<Portfolio, RiskError> {
        let range = self
            .range
            .ok_or_else(|| RiskError::input_invalid("portfolio date range not set"))?;
        let portfolio = Portfolio {
            weights: self.weights,
            range,
            proxies: self.proxies,
            risk_limits: self
                .risk_limits
                .ok_or_else(|| RiskError::input_invalid("portfolio risk limits not set"))?,
            expected_returns: self.expected_returns,
            normalize_weights: self.normalize_weights,
        };
        portfolio.validate()?;
        Ok(portfolio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Date;
    use rust_decimal_macros::dec;

    fn range() -> DateRange {
        DateRange::new(
            Date::from_ymd(2019, 1, 31).unwrap(),
            Date::from_ymd(2024, 3, 31).unwrap(),
        )
        .unwrap()
    }

    fn limits() -> RiskLimits {
        RiskLimits {
            max_portfolio_volatility: 0.25,
            max_loss: -0.2,
            max_single_stock_weight: 0.5,
            max_factor_contribution: 0.6,
            max_market_contribution: 0.6,
            max_industry_contribution: 0.6,
            max_single_factor_loss: -0.15,
        }
    }

    #[test]
    fn test_missing_proxy_rejected() {
        let result = Portfolio::builder()
            .weight("NVDA", dec!(1.0))
            .range(range())
            .risk_limits(limits())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_cash_ticker_needs_no_proxy() {
        let portfolio = Portfolio::builder()
            .weight("CUR:USD", dec!(1.0))
            .range(range())
            .risk_limits(limits())
            .build()
            .unwrap();
        assert_eq!(portfolio.net_weight(), dec!(1.0));
    }

    #[test]
    fn test_normalized_weights() {
        let portfolio = Portfolio::builder()
            .weight("NVDA", dec!(0.4))
            .proxy("NVDA", ProxySet::empty())
            .weight("CUR:USD", dec!(0.6))
            .range(range())
            .risk_limits(limits())
            .build()
            .unwrap();
        let normalized = portfolio.normalized_weights().unwrap();
        let total: Decimal = normalized.values().copied().sum();
        assert_eq!(total, dec!(1.0));
    }

    #[test]
    fn test_zero_net_weight_with_normalize_flag_rejected() {
        let result = Portfolio::builder()
            .weight("NVDA", dec!(1.0))
            .proxy("NVDA", ProxySet::empty())
            .weight("CUR:USD", dec!(-1.0))
            .range(range())
            .risk_limits(limits())
            .normalize_weights(true)
            .build();
        assert!(result.is_err());
    }
}
