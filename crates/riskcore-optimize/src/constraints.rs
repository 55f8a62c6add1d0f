//! Shared constraint/objective plumbing for MinVar and MaxRet (§4.8):
//! builds the same `(B, Σ_f, σ²_ε)` sensitivity model the Portfolio Risk
//! Engine (C5) uses, but as closures over an arbitrary weight vector `w`
//! rather than one fixed portfolio, so [`riskcore_math::optimize::penalty_minimize`]
//! can search over it.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};

use riskcore_core::decimal::to_f64_lossy;
use riskcore_core::result::LimitId;
use riskcore_core::types::{Portfolio, RiskLimits, Ticker, INDUSTRY, MARKET};
use riskcore_core::{RiskError, RiskResult};
use riskcore_factors::FactorModelOutput;
use riskcore_math::linalg::ridge_in_place;
use riskcore_math::optimize::{equality_penalty, lower_bound_penalty, upper_bound_penalty};
use riskcore_traits::EngineConfig;

/// Per-factor worst monthly return over the full history in
/// `factor_model`'s panel (same convention as C5's worst-case loss).
fn worst_monthly_return(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::min)
}

/// The sensitivity model and limit set an optimizer searches over, built
/// once per run and evaluated repeatedly as `w` varies.
pub struct OptimizationContext {
    tickers: Vec<Ticker>,
    factor_labels: Vec<String>,
    beta_matrix: DMatrix<f64>,
    idio: DVector<f64>,
    sigma_f: DMatrix<f64>,
    worst_monthly_by_factor: Vec<f64>,
    risk_limits: RiskLimits,
}

impl OptimizationContext {
    /// Builds the context from `portfolio`'s tickers (in sorted order)
    /// and the already-assembled factor model.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::InputInvalid` if any ticker has no resolved
    /// `asset_class` — the worst-case-loss constraint below requires one
    /// for every position, the same gate C6 applies.
    pub fn build(
        portfolio: &Portfolio,
        factor_model: &FactorModelOutput,
        config: &EngineConfig,
    ) -> RiskResult<Self> {
        let tickers: Vec<Ticker> = portfolio.weights.keys().cloned().collect();
        for ticker in &tickers {
            let has_asset_class = portfolio.proxies.get(ticker).is_some_and(|p| p.asset_class.is_some());
            if !has_asset_class {
                return Err(RiskError::input_invalid_for(
                    ticker.as_str(),
                    "worst-case-loss constraints require a resolved asset_class",
                ));
            }
        }
        let factor_labels = factor_model.factor_labels.clone();

        let mut beta_matrix = DMatrix::zeros(tickers.len(), factor_labels.len());
        let mut idio = DVector::zeros(tickers.len());
        for (row, ticker) in tickers.iter().enumerate() {
            if let Some(bv) = factor_model.betas.get(ticker) {
                for (col, label) in factor_labels.iter().enumerate() {
                    beta_matrix[(row, col)] = bv.beta(label);
                }
                idio[row] = factor_model.idiosyncratic_variance.get(ticker).copied().unwrap_or(0.0);
            }
        }

        let mut sigma_f = factor_model.factor_covariance.clone();
        ridge_in_place(&mut sigma_f, config.numeric_ridge);

        let worst_monthly_by_factor = factor_labels
            .iter()
            .map(|label| {
                factor_model
                    .factor_panel
                    .get(label)
                    .map(|series| worst_monthly_return(&series.values_vec()))
                    .unwrap_or(0.0)
            })
            .collect();

        Ok(Self {
            tickers,
            factor_labels,
            beta_matrix,
            idio,
            sigma_f,
            worst_monthly_by_factor,
            risk_limits: portfolio.risk_limits,
        })
    }

    /// Tickers in the order `w` is indexed by.
    #[must_use]
    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    /// Number of free weights.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.tickers.len()
    }

    fn exposure(&self, w: &DVector<f64>) -> DVector<f64> {
        self.beta_matrix.transpose() * w
    }

    /// Portfolio variance `wᵀ Σ w` at `w`.
    #[must_use]
    pub fn portfolio_variance(&self, w: &[f64]) -> f64 {
        let w = DVector::from_row_slice(w);
        let exposure = self.exposure(&w);
        let systematic = exposure.dot(&(&self.sigma_f * &exposure));
        let idiosyncratic = w.iter().zip(self.idio.iter()).fold(0.0, |acc, (wi, ii)| acc + wi * wi * ii);
        systematic + idiosyncratic
    }

    /// Per-factor variance share at `w`, keyed by factor label.
    #[must_use]
    pub fn factor_variance_shares(&self, w: &[f64]) -> BTreeMap<String, f64> {
        let wv = DVector::from_row_slice(w);
        let exposure = self.exposure(&wv);
        let sigma_exposure = &self.sigma_f * &exposure;
        let total = self.portfolio_variance(w).max(1e-30);
        self.factor_labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), exposure[i] * sigma_exposure[i] / total))
            .collect()
    }

    /// Per-factor worst-case loss `E_f · q_f` at `w`.
    #[must_use]
    pub fn factor_losses(&self, w: &[f64]) -> BTreeMap<String, f64> {
        let wv = DVector::from_row_slice(w);
        let exposure = self.exposure(&wv);
        self.factor_labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), exposure[i] * self.worst_monthly_by_factor[i]))
            .collect()
    }

    /// Worst-case portfolio loss: the factor losses recombined through
    /// `E`, at `w`.
    #[must_use]
    pub fn worst_case_portfolio_loss(&self, w: &[f64]) -> f64 {
        self.factor_losses(w).values().fold(0.0, |acc, v| acc + v)
    }

    /// Total penalty for violating the portfolio's `RiskLimits` at `w`:
    /// `Σw = 1`, per-ticker weight bound, per-factor variance share
    /// bounds, per-factor worst-case loss bounds, and the aggregate
    /// worst-case portfolio loss bound.
    #[must_use]
    pub fn limit_penalty(&self, w: &[f64]) -> f64 {
        let net: f64 = w.iter().sum();
        let mut total = equality_penalty(net, 1.0);

        for &wi in w {
            total += upper_bound_penalty(wi.abs(), self.risk_limits.max_single_stock_weight);
        }

        for (factor, share) in self.factor_variance_shares(w) {
            let bound = factor_contribution_bound(&factor, &self.risk_limits);
            total += upper_bound_penalty(share, bound);
        }

        for loss in self.factor_losses(w).values() {
            total += lower_bound_penalty(*loss, self.risk_limits.max_single_factor_loss);
        }

        total += lower_bound_penalty(self.worst_case_portfolio_loss(w), self.risk_limits.max_loss);

        total
    }

    /// Labels the constraints active (within `tolerance` of their
    /// bound) at `w` — the "binding constraints" reported alongside an
    /// optimizer's solution.
    #[must_use]
    pub fn binding_constraints(&self, w: &[f64], tolerance: f64) -> Vec<LimitId> {
        let mut binding = Vec::new();

        for (i, ticker) in self.tickers.iter().enumerate() {
            if (w[i].abs() - self.risk_limits.max_single_stock_weight).abs() <= tolerance {
                binding.push(LimitId::SingleStockWeight(ticker.clone()));
            }
        }

        for (factor, share) in self.factor_variance_shares(w) {
            let bound = factor_contribution_bound(&factor, &self.risk_limits);
            if (share - bound).abs() <= tolerance {
                binding.push(factor_contribution_limit_id(&factor));
            }
        }

        for (factor, loss) in self.factor_losses(w) {
            if (loss - self.risk_limits.max_single_factor_loss).abs() <= tolerance {
                binding.push(LimitId::SingleFactorLoss(factor));
            }
        }

        if (self.worst_case_portfolio_loss(w) - self.risk_limits.max_loss).abs() <= tolerance {
            binding.push(LimitId::WorstCaseLoss);
        }

        binding
    }

    /// Names the constraint family whose violation is largest at `w` —
    /// the "tightest binding constraint family" an infeasible solve
    /// reports.
    #[must_use]
    pub fn tightest_violation(&self, w: &[f64]) -> String {
        let mut worst = ("net_weight", equality_penalty(w.iter().sum(), 1.0));

        let single_stock = self
            .tickers
            .iter()
            .enumerate()
            .map(|(i, _)| upper_bound_penalty(w[i].abs(), self.risk_limits.max_single_stock_weight))
            .fold(0.0, f64::max);
        if single_stock > worst.1 {
            worst = ("single_stock_weight", single_stock);
        }

        let factor_share = self
            .factor_variance_shares(w)
            .into_iter()
            .map(|(factor, share)| upper_bound_penalty(share, factor_contribution_bound(&factor, &self.risk_limits)))
            .fold(0.0, f64::max);
        if factor_share > worst.1 {
            worst = ("factor_contribution", factor_share);
        }

        let factor_loss = self
            .factor_losses(w)
            .into_values()
            .map(|loss| lower_bound_penalty(loss, self.risk_limits.max_single_factor_loss))
            .fold(0.0, f64::max);
        if factor_loss > worst.1 {
            worst = ("single_factor_loss", factor_loss);
        }

        let worst_case_loss = lower_bound_penalty(self.worst_case_portfolio_loss(w), self.risk_limits.max_loss);
        if worst_case_loss > worst.1 {
            worst = ("worst_case_loss", worst_case_loss);
        }

        worst.0.to_string()
    }
}

/// Picks the variance-share bound a factor is checked against — the
/// same dedicated-vs-general split as C6.
fn factor_contribution_bound(factor: &str, limits: &RiskLimits) -> f64 {
    if factor == MARKET {
        limits.max_market_contribution
    } else if factor.starts_with(INDUSTRY) {
        limits.max_industry_contribution
    } else {
        limits.max_factor_contribution
    }
}

fn factor_contribution_limit_id(factor: &str) -> LimitId {
    if factor == MARKET {
        LimitId::MarketContribution
    } else if factor.starts_with(INDUSTRY) {
        LimitId::IndustryContribution
    } else {
        LimitId::FactorContribution(factor.to_string())
    }
}

/// Converts a portfolio's current (pre-optimization) weights into the
/// dense vector an optimizer's initial point is seeded from.
#[must_use]
pub fn initial_weights(portfolio: &Portfolio, tickers: &[Ticker]) -> Vec<f64> {
    tickers
        .iter()
        .map(|t| portfolio.weights.get(t).map(|w| to_f64_lossy(*w)).unwrap_or(0.0))
        .collect()
}

/// A starting point is degenerate (all zero) when a portfolio's
/// weights don't cover every ticker the factor model validated; falls
/// back to an equal-weighted start.
#[must_use]
pub fn equal_weighted(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

pub(crate) fn validate_nonempty(tickers: &[Ticker]) -> RiskResult<()> {
    if tickers.is_empty() {
        return Err(RiskError::input_invalid("cannot optimize an empty portfolio"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskcore_core::types::{AssetClass, Date, FactorPanel, ProxySet};
    use riskcore_factors::FactorModelOutput;
    use rust_decimal_macros::dec;

    fn range() -> riskcore_core::types::DateRange {
        riskcore_core::types::DateRange::new(Date::from_ymd(2019, 1, 31).unwrap(), Date::from_ymd(2024, 3, 31).unwrap()).unwrap()
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

    fn empty_factor_model() -> FactorModelOutput {
        FactorModelOutput {
            betas: BTreeMap::new(),
            residuals: BTreeMap::new(),
            idiosyncratic_variance: BTreeMap::new(),
            factor_labels: Vec::new(),
            factor_covariance: DMatrix::zeros(0, 0),
            factor_panel: FactorPanel::new(),
            validated_tickers: Vec::new(),
        }
    }

    #[test]
    fn test_build_rejects_ticker_without_asset_class() {
        let portfolio = Portfolio::builder()
            .weight("CUR:USD", dec!(1.0))
            .range(range())
            .risk_limits(limits())
            .build()
            .unwrap();
        let config = EngineConfig::with_defaults(range());
        let err = OptimizationContext::build(&portfolio, &empty_factor_model(), &config).unwrap_err();
        assert!(matches!(err, RiskError::InputInvalid { .. }));
    }

    #[test]
    fn test_build_accepts_ticker_with_resolved_asset_class() {
        let portfolio = Portfolio::builder()
            .weight("CUR:USD", dec!(1.0))
            .proxy(
                "CUR:USD",
                ProxySet {
                    asset_class: Some(AssetClass::FixedIncome),
                    ..ProxySet::empty()
                },
            )
            .range(range())
            .risk_limits(limits())
            .build()
            .unwrap();
        let config = EngineConfig::with_defaults(range());
        assert!(OptimizationContext::build(&portfolio, &empty_factor_model(), &config).is_ok());
    }
}
