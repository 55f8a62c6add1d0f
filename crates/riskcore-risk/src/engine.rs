//! Portfolio Risk Engine (C5, §4.5): position covariance, Euler risk
//! contributions, factor-variance attribution, concentration, and
//! worst-case factor loss.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};
use riskcore_core::decimal::to_f64_lossy;
use riskcore_core::result::{
    FactorExposure, FiniteF64, RiskContribution, RiskMetricsSummary, VarianceDecomposition,
};
use riskcore_core::types::{Portfolio, Ticker};
use riskcore_core::{RiskError, RiskResult};
use riskcore_math::linalg::ridge_in_place;
use riskcore_traits::EngineConfig;

use riskcore_factors::FactorModelOutput;

/// The raw numeric outputs of the risk engine (§4.5), ahead of the
/// limit checks (C6) that interpret them against `RiskLimits`.
#[derive(Debug, Clone)]
pub struct RiskEngineOutput {
    /// Portfolio volatility (annualized).
    pub portfolio_volatility: f64,
    /// Raw Herfindahl index on raw weights.
    pub herfindahl: f64,
    /// Normalized Herfindahl index.
    pub herfindahl_normalized: f64,
    /// Factor exposure vector `E = Bᵀw`, keyed by factor label.
    pub factor_exposure: BTreeMap<String, f64>,
    /// Per-ticker Euler risk contribution (sums to `portfolio_volatility`).
    pub risk_contributions: BTreeMap<Ticker, f64>,
    /// Per-ticker normalized weight used for this computation.
    pub effective_weights: BTreeMap<Ticker, f64>,
    /// Per-factor variance share `V_f`.
    pub factor_variance: BTreeMap<String, f64>,
    /// Sum of all `V_f`.
    pub systematic_variance: f64,
    /// `wᵀ diag(σ²_ε) w`.
    pub idiosyncratic_variance: f64,
    /// `systematic_variance + idiosyncratic_variance`.
    pub total_variance: f64,
    /// Per-factor worst-case monthly loss, `E_f · q_f`.
    pub worst_case_factor_loss: BTreeMap<String, f64>,
    /// Worst-case portfolio loss, the factor losses re-combined through `E`.
    pub worst_case_portfolio_loss: f64,
}

/// Returns the weights the engine computes risk over: normalized when
/// `portfolio.normalize_weights` is set, raw economic exposure
/// otherwise (§9's resolved default is `false`).
///
/// # Errors
///
/// Propagates `RiskError::InputInvalid` from
/// [`Portfolio::normalized_weights`] when normalization is requested on
/// a zero-net-weight portfolio.
pub fn effective_weights(portfolio: &Portfolio) -> RiskResult<BTreeMap<Ticker, f64>> {
    let decimals = if portfolio.normalize_weights {
        portfolio.normalized_weights()?
    } else {
        portfolio.weights.clone()
    };
    Ok(decimals
        .into_iter()
        .map(|(ticker, w)| (ticker, to_f64_lossy(w)))
        .collect())
}

/// Builds the `n x k` sensitivity matrix `B` and the idiosyncratic
/// variance vector, aligned to `tickers` (rows) and `factor_labels`
/// (columns). A ticker absent from `factor_model.betas` (cash, or a
/// ticker whose own fit failed validation) contributes an all-zero row
/// and zero idiosyncratic variance — no systematic or idiosyncratic
/// risk beyond its raw weight's contribution to concentration.
fn build_beta_matrix(
    tickers: &[Ticker],
    factor_labels: &[String],
    factor_model: &FactorModelOutput,
) -> (DMatrix<f64>, DVector<f64>) {
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
    (beta_matrix, idio)
}

/// Computes the minimum monthly return over a factor's full available
/// history (the lookback is applied by the caller trimming the series
/// before it reaches the factor panel; here we simply take the
/// trailing window directly available).
fn worst_monthly_return(values: &[f64]) -> Option<f64> {
    values.iter().copied().fold(None, |acc, v| match acc {
        None => Some(v),
        Some(min) => Some(min.min(v)),
    })
}

/// Runs the Portfolio Risk Engine (§4.5) over `portfolio` and a
/// previously assembled `FactorModelOutput`.
///
/// # Errors
///
/// Returns `RiskError::NumericalFailure` if any output would be
/// non-finite (a malformed `Σ_f`, a zero-volatility portfolio dividing
/// Euler contributions, etc.), and propagates weight-normalization
/// errors from [`effective_weights`].
pub fn compute(
    portfolio: &Portfolio,
    factor_model: &FactorModelOutput,
    config: &EngineConfig,
) -> RiskResult<RiskEngineOutput> {
    let weights = effective_weights(portfolio)?;
    let tickers: Vec<Ticker> = weights.keys().cloned().collect();
    let factor_labels = factor_model.factor_labels.clone();

    let (beta_matrix, idio) = build_beta_matrix(&tickers, &factor_labels, factor_model);

    let mut sigma_f = factor_model.factor_covariance.clone();
    ridge_in_place(&mut sigma_f, config.numeric_ridge);

    let w = DVector::from_iterator(tickers.len(), tickers.iter().map(|t| weights[t]));

    let sigma_w_systematic = &beta_matrix * &sigma_f * beta_matrix.transpose() * &w;
    let sigma_w = &sigma_w_systematic + idio.component_mul(&w);

    let portfolio_variance = w.dot(&sigma_w);
    if !portfolio_variance.is_finite() || portfolio_variance < 0.0 {
        return Err(RiskError::numerical_failure(
            "portfolio variance is non-finite or negative",
        ));
    }
    let portfolio_volatility = portfolio_variance.sqrt();

    let risk_contributions: BTreeMap<Ticker, f64> = if portfolio_volatility > 1e-15 {
        tickers
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), w[i] * sigma_w[i] / portfolio_volatility))
            .collect()
    } else {
        tickers.iter().map(|t| (t.clone(), 0.0)).collect()
    };

    let exposure_vec = beta_matrix.transpose() * &w;
    let factor_exposure: BTreeMap<String, f64> = factor_labels
        .iter()
        .zip(exposure_vec.iter())
        .map(|(label, e)| (label.clone(), *e))
        .collect();

    let sigma_f_exposure = &sigma_f * &exposure_vec;
    let factor_variance: BTreeMap<String, f64> = factor_labels
        .iter()
        .enumerate()
        .map(|(i, label)| (label.clone(), exposure_vec[i] * sigma_f_exposure[i]))
        .collect();
    let systematic_variance = factor_variance.values().fold(0.0, |acc, v| acc + v);

    let idiosyncratic_variance = tickers
        .iter()
        .enumerate()
        .fold(0.0, |acc, (i, _)| acc + w[i] * w[i] * idio[i]);
    let total_variance = systematic_variance + idiosyncratic_variance;

    let herfindahl = weights.values().fold(0.0, |acc, wv| acc + wv * wv);
    let n = weights.len() as f64;
    let herfindahl_normalized = if n > 1.0 {
        ((herfindahl - 1.0 / n) / (1.0 - 1.0 / n)).max(0.0)
    } else {
        1.0
    };

    let worst_case_factor_loss: BTreeMap<String, f64> = factor_labels
        .iter()
        .map(|label| {
            let q_f = factor_model
                .factor_panel
                .get(label)
                .and_then(|series| worst_monthly_return(&series.values_vec()))
                .unwrap_or(0.0);
            let e_f = factor_exposure.get(label).copied().unwrap_or(0.0);
            (label.clone(), e_f * q_f)
        })
        .collect();
    let worst_case_portfolio_loss = worst_case_factor_loss.values().fold(0.0, |acc, v| acc + v);

    for value in std::iter::once(portfolio_volatility)
        .chain(std::iter::once(herfindahl))
        .chain(factor_exposure.values().copied())
        .chain(risk_contributions.values().copied())
    {
        if !value.is_finite() {
            return Err(RiskError::numerical_failure(
                "risk engine produced a non-finite output",
            ));
        }
    }

    Ok(RiskEngineOutput {
        portfolio_volatility,
        herfindahl,
        herfindahl_normalized,
        factor_exposure,
        risk_contributions,
        effective_weights: weights,
        factor_variance,
        systematic_variance,
        idiosyncratic_variance,
        total_variance,
        worst_case_factor_loss,
        worst_case_portfolio_loss,
    })
}

/// Converts engine output into the API-facing summary/exposure/contribution
/// structures shared by [`riskcore_core::result::RiskAnalysis`].
///
/// # Errors
///
/// Returns `RiskError::NumericalFailure` if any value fails the
/// `FiniteF64` invariant (should not happen given [`compute`]'s own
/// finiteness check, but kept as a boundary guarantee).
pub fn to_result_parts(
    output: &RiskEngineOutput,
) -> RiskResult<(RiskMetricsSummary, Vec<FactorExposure>, Vec<RiskContribution>, VarianceDecomposition)> {
    let metrics = RiskMetricsSummary {
        portfolio_volatility: FiniteF64::new(output.portfolio_volatility)?,
        herfindahl: FiniteF64::new(output.herfindahl)?,
        herfindahl_normalized: FiniteF64::new(output.herfindahl_normalized)?,
    };

    let mut factor_exposures = Vec::with_capacity(output.factor_exposure.len());
    for (factor, exposure) in &output.factor_exposure {
        factor_exposures.push(FactorExposure {
            factor: factor.clone(),
            exposure: FiniteF64::new(*exposure)?,
        });
    }

    let mut risk_contributions = Vec::with_capacity(output.risk_contributions.len());
    for (ticker, contribution) in &output.risk_contributions {
        let weight = output.effective_weights.get(ticker).copied().unwrap_or(0.0);
        let contribution_pct = if output.portfolio_volatility.abs() > 1e-15 {
            contribution / output.portfolio_volatility
        } else {
            0.0
        };
        risk_contributions.push(RiskContribution {
            ticker: ticker.clone(),
            weight: FiniteF64::new(weight)?,
            contribution: FiniteF64::new(*contribution)?,
            contribution_pct: FiniteF64::new(contribution_pct)?,
        });
    }

    let mut factor_variance = BTreeMap::new();
    for (factor, variance) in &output.factor_variance {
        factor_variance.insert(factor.clone(), FiniteF64::new(*variance)?);
    }
    let variance_decomposition = VarianceDecomposition {
        factor_variance,
        systematic_variance: FiniteF64::new(output.systematic_variance)?,
        idiosyncratic_variance: FiniteF64::new(output.idiosyncratic_variance)?,
        total_variance: FiniteF64::new(output.total_variance)?,
    };

    Ok((metrics, factor_exposures, risk_contributions, variance_decomposition))
}
