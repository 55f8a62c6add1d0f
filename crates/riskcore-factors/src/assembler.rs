//! Factor Model Assembler (C4) orchestration: produces the
//! `(B, Σ_f, σ²_ε, validated_ticker_set)` contract every downstream
//! consumer (C5-C9) depends on (§4.4).

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::DMatrix;
use rayon::prelude::*;
use riskcore_core::types::{
    BetaVector, Date, DateRange, FactorPanel, MonthlySeries, Portfolio, Ticker,
};
use riskcore_core::types::{AssetClass, INDUSTRY, INTEREST_RATE};
use riskcore_math::linalg::annualized_sample_covariance;
use riskcore_math::regression::ols_fit;
use riskcore_math::returns::monthly_returns;
use riskcore_traits::market_data::{PriceProvider, TreasuryMaturity};
use riskcore_traits::EngineConfig;

use crate::error::{FactorsError, FactorsResult};
use crate::panel::{align_on_intersection, build_ticker_factor_series};
use crate::peers::build_subindustry_factor;

/// The four key-rate tenors used for the interest-rate factor block.
const TENORS: [(TreasuryMaturity, &str); 4] = [
    (TreasuryMaturity::Y2, "2y"),
    (TreasuryMaturity::Y5, "5y"),
    (TreasuryMaturity::Y10, "10y"),
    (TreasuryMaturity::Y30, "30y"),
];

/// The assembler's output: the factor-model contract shared by every
/// downstream consumer.
#[derive(Debug, Clone)]
pub struct FactorModelOutput {
    /// Per-ticker factor sensitivities and fit diagnostics.
    pub betas: BTreeMap<Ticker, BetaVector>,
    /// Per-ticker residual series (the `ResidualPanel`).
    pub residuals: BTreeMap<Ticker, MonthlySeries<f64>>,
    /// Per-ticker idiosyncratic (residual) variance, annualized.
    pub idiosyncratic_variance: BTreeMap<Ticker, f64>,
    /// The global factor label set, sorted, matching the column order
    /// of `factor_covariance`.
    pub factor_labels: Vec<String>,
    /// Sample covariance of aligned factor returns, annualized (`Σ_f`).
    pub factor_covariance: DMatrix<f64>,
    /// Historical monthly return series per global factor label, used
    /// by the Portfolio Risk Engine (C5) to compute worst-case factor
    /// loss (§4.5).
    pub factor_panel: FactorPanel,
    /// Tickers that produced a usable fit, in portfolio order.
    pub validated_tickers: Vec<Ticker>,
}

struct FetchedTicker {
    ticker: Ticker,
    factor_series: BTreeMap<String, MonthlySeries<f64>>,
    y_series: MonthlySeries<f64>,
}

fn treasury_delta_label(tenor: &str) -> String {
    format!("{INTEREST_RATE}:{tenor}")
}

fn first_differences(series: &MonthlySeries<f64>) -> FactorsResult<MonthlySeries<f64>> {
    let points = series.points();
    let mut deltas = Vec::with_capacity(points.len().saturating_sub(1));
    for window in points.windows(2) {
        let (_, prev) = window[0];
        let (date, curr) = window[1];
        deltas.push((date, (curr - prev) / 100.0));
    }
    MonthlySeries::new(deltas).map_err(|source| FactorsError::Regression {
        ticker: "<portfolio>".to_string(),
        source: riskcore_math::MathError::invalid_input(source.to_string()),
    })
}

async fn fetch_interest_rate_factors(
    provider: &dyn PriceProvider,
    target: &Ticker,
    range: &DateRange,
) -> FactorsResult<BTreeMap<String, MonthlySeries<f64>>> {
    let mut out = BTreeMap::new();
    for (maturity, tenor) in TENORS {
        let yields = provider
            .fetch_monthly_treasury(maturity, range)
            .await
            .map_err(|source| FactorsError::Provider {
                ticker: target.to_string(),
                source,
            })?;
        out.insert(treasury_delta_label(tenor), first_differences(&yields)?);
    }
    Ok(out)
}

async fn fetch_one_ticker(
    provider: &dyn PriceProvider,
    target: &Ticker,
    portfolio: &Portfolio,
    range: &DateRange,
) -> FactorsResult<Option<FetchedTicker>> {
    let Some(proxies) = portfolio.proxies.get(target) else {
        return Ok(None);
    };

    let prices = provider
        .fetch_monthly_total_return(target, range)
        .await
        .map_err(|source| FactorsError::Provider {
            ticker: target.to_string(),
            source,
        })?;
    let y_series = monthly_returns(&prices).map_err(|source| FactorsError::Regression {
        ticker: target.to_string(),
        source,
    })?;

    let mut factor_series = build_ticker_factor_series(provider, target, proxies, range).await?;

    let industry_label = proxies.industry.as_ref().map(|p| format!("{INDUSTRY}:{p}"));
    let industry_series = industry_label.as_ref().and_then(|l| factor_series.get(l)).cloned();
    if let Some((label, series)) = build_subindustry_factor(
        provider,
        target,
        &proxies.subindustry_peers,
        industry_series.as_ref(),
        y_series.len(),
        range,
    )
    .await?
    {
        factor_series.insert(label, series);
    }

    if proxies.asset_class == Some(AssetClass::FixedIncome) {
        for (label, series) in fetch_interest_rate_factors(provider, target, range).await? {
            factor_series.insert(label, series);
        }
    }

    Ok(Some(FetchedTicker {
        ticker: target.clone(),
        factor_series,
        y_series,
    }))
}

/// Builds the factor-model contract `(B, Σ_f, σ²_ε, validated_ticker_set)`
/// for every ticker in `portfolio` that carries a `ProxySet`.
///
/// Per-ticker data fetches run sequentially (in portfolio order) since
/// the provider is an async trait object; the CPU-bound regression fits
/// then run in parallel via `rayon`, collected back into the same
/// order so the result stays deterministic for a fixed portfolio and
/// provider state.
///
/// # Errors
///
/// Fails with the first `FactorsError` encountered while fetching data.
/// A ticker whose own regression fit fails is simply excluded from
/// `validated_tickers` rather than failing the whole assembly — cash
/// pseudo-tickers and any ticker with no `ProxySet` never enter the
/// model at all.
pub async fn assemble(
    portfolio: &Portfolio,
    provider: &dyn PriceProvider,
    config: &EngineConfig,
    range: &DateRange,
) -> FactorsResult<FactorModelOutput> {
    let tickers: Vec<Ticker> = portfolio.weights.keys().cloned().collect();

    let mut fetched = Vec::with_capacity(tickers.len());
    for ticker in &tickers {
        if let Some(data) = fetch_one_ticker(provider, ticker, portfolio, range).await? {
            fetched.push(data);
        }
    }

    let fits: Vec<(Ticker, FactorsResult<(Vec<String>, BetaVector, MonthlySeries<f64>)>)> = fetched
        .into_par_iter()
        .map(|data| {
            let result = align_on_intersection(&data.ticker, &data.y_series, &data.factor_series)
                .and_then(|(labels, x, y)| {
                    let fit = ols_fit(&y, &x, config.max_condition_number).map_err(|source| {
                        FactorsError::Regression {
                            ticker: data.ticker.to_string(),
                            source,
                        }
                    })?;
                    let betas = labels
                        .iter()
                        .zip(fit.beta.iter())
                        .map(|(label, beta)| (label.clone(), *beta))
                        .collect();
                    let beta_vector = BetaVector {
                        betas,
                        alpha: fit.alpha,
                        residual_vol: fit.residual_vol_annual,
                        r_squared: fit.r_squared,
                    };
                    let dates: Vec<Date> = data.y_series.dates().collect();
                    let residual_points: Vec<(Date, f64)> = dates
                        .into_iter()
                        .zip(fit.residuals.iter().copied())
                        .collect();
                    let residual_series =
                        MonthlySeries::new(residual_points).map_err(|_| FactorsError::Regression {
                            ticker: data.ticker.to_string(),
                            source: riskcore_math::MathError::numerical_failure(
                                "residual series construction failed",
                            ),
                        })?;
                    Ok((labels, beta_vector, residual_series))
                });
            (data.ticker, result)
        })
        .collect();

    let mut betas = BTreeMap::new();
    let mut residuals = BTreeMap::new();
    let mut idiosyncratic_variance = BTreeMap::new();
    let mut validated_tickers = Vec::new();
    let mut collected_factor_series: BTreeMap<String, MonthlySeries<f64>> = BTreeMap::new();

    for (ticker, result) in fits {
        let Ok((_labels, beta_vector, residual_series)) = result else {
            continue;
        };
        idiosyncratic_variance.insert(ticker.clone(), beta_vector.residual_vol.powi(2));
        residuals.insert(ticker.clone(), residual_series);
        validated_tickers.push(ticker.clone());
        betas.insert(ticker, beta_vector);
    }

    for data in &fetched {
        for (label, series) in &data.factor_series {
            collected_factor_series.entry(label.clone()).or_insert_with(|| series.clone());
        }
    }

    let factor_labels: Vec<String> = betas
        .values()
        .flat_map(|bv| bv.betas.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let factor_covariance = build_global_factor_covariance(&factor_labels, &collected_factor_series)?;

    let mut factor_panel = FactorPanel::new();
    for label in &factor_labels {
        if let Some(series) = collected_factor_series.get(label) {
            factor_panel.insert(label.clone(), series.clone());
        }
    }

    Ok(FactorModelOutput {
        betas,
        residuals,
        idiosyncratic_variance,
        factor_labels,
        factor_covariance,
        factor_panel,
        validated_tickers,
    })
}

/// Aligns every global factor's series on their common date
/// intersection and computes the annualized sample covariance matrix
/// (`Σ_f`, §4.4 step 4).
fn build_global_factor_covariance(
    labels: &[String],
    factor_series: &BTreeMap<String, MonthlySeries<f64>>,
) -> FactorsResult<DMatrix<f64>> {
    if labels.is_empty() {
        return Ok(DMatrix::zeros(0, 0));
    }

    let mut common_dates: Vec<Date> = factor_series[&labels[0]].dates().collect();
    for label in &labels[1..] {
        let dates: BTreeSet<Date> = factor_series[label].dates().collect();
        common_dates.retain(|d| dates.contains(d));
    }

    if common_dates.len() < 2 {
        return Err(FactorsError::Regression {
            ticker: "<portfolio>".to_string(),
            source: riskcore_math::MathError::insufficient_data(2, common_dates.len()),
        });
    }

    let lookups: Vec<BTreeMap<Date, f64>> = labels
        .iter()
        .map(|label| factor_series[label].points().iter().copied().collect())
        .collect();

    let mut data = DMatrix::zeros(common_dates.len(), labels.len());
    for (row, date) in common_dates.iter().enumerate() {
        for (col, lookup) in lookups.iter().enumerate() {
            data[(row, col)] = lookup[date];
        }
    }

    annualized_sample_covariance(&data).map_err(|source| FactorsError::Regression {
        ticker: "<portfolio>".to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_factor_set_yields_empty_covariance() {
        let result = build_global_factor_covariance(&[], &BTreeMap::new()).unwrap();
        assert_eq!(result.nrows(), 0);
        assert_eq!(result.ncols(), 0);
    }

    #[test]
    fn test_first_differences_divides_by_hundred() {
        let points = vec![
            (Date::from_ymd(2024, 1, 31).unwrap(), 4.0),
            (Date::from_ymd(2024, 2, 29).unwrap(), 4.5),
            (Date::from_ymd(2024, 3, 31).unwrap(), 4.25),
        ];
        let series = MonthlySeries::new(points).unwrap();
        let deltas = first_differences(&series).unwrap();
        let values = deltas.values_vec();
        assert_eq!(values.len(), 2);
        assert!((values[0] - 0.005).abs() < 1e-12);
        assert!((values[1] - (-0.0025)).abs() < 1e-12);
    }
}
