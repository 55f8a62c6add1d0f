//! Per-ticker factor panel construction and date-alignment (§4.4 step 1).
//!
//! Global (shared) factor labels are `market`, `momentum`, `value`, and
//! `interest_rate:<maturity>` — proxies the portfolio is expected to
//! reuse across tickers. The industry factor is per-proxy (labeled
//! `industry:<proxy_ticker>`) since different tickers legitimately use
//! different industry ETFs; the subindustry factor is always per-ticker
//! (`subindustry:<ticker>`). A ticker's [`riskcore_core::BetaVector`] is
//! sparse over whatever labels its own fit used — [`BetaVector::beta`]
//! returns 0.0 for any label the ticker has no exposure to, which is
//! exactly what portfolio-level aggregation over the global label union
//! needs.

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use riskcore_core::types::{Date, DateRange, MonthlySeries, ProxySet, Ticker};
use riskcore_core::types::{INDUSTRY, MARKET, MOMENTUM, VALUE};
use riskcore_math::returns::monthly_returns;
use riskcore_traits::market_data::PriceProvider;
use riskcore_traits::TraitError;

use crate::error::{FactorsError, FactorsResult};

/// Fetches and computes monthly returns for one proxy ticker, wrapping
/// any provider failure with the target ticker's identity for
/// diagnostics.
async fn proxy_returns(
    provider: &dyn PriceProvider,
    target: &Ticker,
    proxy: &Ticker,
    range: &DateRange,
) -> FactorsResult<MonthlySeries<f64>> {
    let prices = provider
        .fetch_monthly_total_return(proxy, range)
        .await
        .map_err(|source| FactorsError::Provider {
            ticker: target.to_string(),
            source,
        })?;
    monthly_returns(&prices).map_err(|source| FactorsError::Regression {
        ticker: target.to_string(),
        source,
    })
}

/// Builds the generic (market/momentum/value) plus per-proxy industry
/// factor series for one ticker's proxy set, keyed by global factor
/// label.
///
/// Absent proxy slots are simply omitted — the regression only fits
/// against the factors the ticker actually has a proxy for.
pub async fn build_ticker_factor_series(
    provider: &dyn PriceProvider,
    target: &Ticker,
    proxies: &ProxySet,
    range: &DateRange,
) -> FactorsResult<BTreeMap<String, MonthlySeries<f64>>> {
    let mut series = BTreeMap::new();
    if let Some(proxy) = &proxies.market {
        series.insert(MARKET.to_string(), proxy_returns(provider, target, proxy, range).await?);
    }
    if let Some(proxy) = &proxies.momentum {
        series.insert(
            MOMENTUM.to_string(),
            proxy_returns(provider, target, proxy, range).await?,
        );
    }
    if let Some(proxy) = &proxies.value {
        series.insert(VALUE.to_string(), proxy_returns(provider, target, proxy, range).await?);
    }
    if let Some(proxy) = &proxies.industry {
        let label = format!("{INDUSTRY}:{proxy}");
        series.insert(label, proxy_returns(provider, target, proxy, range).await?);
    }
    Ok(series)
}

/// Intersects a target series' dates with every factor series' dates,
/// then builds the aligned design matrix `X` (one column per factor,
/// sorted by label) and target vector `y`.
///
/// # Errors
///
/// Returns `FactorsError::Regression` (wrapping
/// `MathError::InsufficientData`) if the intersection has fewer than 2
/// observations.
pub fn align_on_intersection(
    target: &Ticker,
    y_series: &MonthlySeries<f64>,
    factors: &BTreeMap<String, MonthlySeries<f64>>,
) -> FactorsResult<(Vec<String>, DMatrix<f64>, Vec<f64>)> {
    let labels: Vec<String> = factors.keys().cloned().collect();

    let mut common_dates: Vec<Date> = y_series.dates().collect();
    for series in factors.values() {
        let dates: std::collections::BTreeSet<Date> = series.dates().collect();
        common_dates.retain(|d| dates.contains(d));
    }

    if common_dates.len() < 2 {
        return Err(FactorsError::Regression {
            ticker: target.to_string(),
            source: riskcore_math::MathError::insufficient_data(2, common_dates.len()),
        });
    }

    let y_lookup: BTreeMap<Date, f64> = y_series.points().iter().copied().collect();
    let factor_lookups: Vec<BTreeMap<Date, f64>> = labels
        .iter()
        .map(|label| factors[label].points().iter().copied().collect())
        .collect();

    let t = common_dates.len();
    let k = labels.len();
    let mut x = DMatrix::zeros(t, k);
    let mut y = Vec::with_capacity(t);
    for (row, date) in common_dates.iter().enumerate() {
        y.push(y_lookup[date]);
        for (col, lookup) in factor_lookups.iter().enumerate() {
            x[(row, col)] = lookup[date];
        }
    }

    Ok((labels, x, y))
}

/// Converts a `TraitError` into a `FactorsError` for a given ticker
/// (used by callers outside this module's own async fetch helpers,
/// e.g. the interest-rate block).
pub(crate) fn wrap_provider_error(ticker: &Ticker, source: TraitError) -> FactorsError {
    FactorsError::Provider {
        ticker: ticker.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[(i32, u32, f64)]) -> MonthlySeries<f64> {
        let points = values
            .iter()
            .map(|(y, m, v)| (Date::from_ymd(*y, *m, 1).unwrap().end_of_month(), *v))
            .collect();
        MonthlySeries::new(points).unwrap()
    }

    #[test]
    fn test_align_on_intersection_trims_to_overlap() {
        let y = series(&[(2024, 1, 0.01), (2024, 2, 0.02), (2024, 3, 0.03)]);
        let mut factors = BTreeMap::new();
        factors.insert(MARKET.to_string(), series(&[(2024, 1, 0.1), (2024, 2, 0.2), (2024, 3, 0.3)]));
        let (labels, x, y_aligned) =
            align_on_intersection(&Ticker::new("NVDA"), &y, &factors).unwrap();
        assert_eq!(labels, vec![MARKET.to_string()]);
        assert_eq!(x.nrows(), 3);
        assert_eq!(y_aligned.len(), 3);
    }

    #[test]
    fn test_align_on_intersection_insufficient_overlap() {
        let y = series(&[(2024, 1, 0.01)]);
        let factors = BTreeMap::new();
        let result = align_on_intersection(&Ticker::new("NVDA"), &y, &factors);
        assert!(result.is_err());
    }
}
