//! Subindustry factor construction and peer validation (§4.4 step 2).

use std::collections::BTreeMap;

use riskcore_core::types::{Date, DateRange, MonthlySeries, Ticker};
use riskcore_core::types::SUBINDUSTRY_PREFIX;
use riskcore_math::returns::monthly_returns;
use riskcore_traits::market_data::PriceProvider;

use crate::error::{FactorsError, FactorsResult};
use crate::panel::wrap_provider_error;

/// Fetches one peer's monthly return series, tagging failures with the
/// *target* ticker (the peer itself is diagnostic context, not the
/// ticker whose assembly failed).
async fn peer_returns(
    provider: &dyn PriceProvider,
    target: &Ticker,
    peer: &Ticker,
    range: &DateRange,
) -> FactorsResult<MonthlySeries<f64>> {
    let prices = provider
        .fetch_monthly_total_return(peer, range)
        .await
        .map_err(|source| wrap_provider_error(target, source))?;
    monthly_returns(&prices).map_err(|source| FactorsError::Regression {
        ticker: target.to_string(),
        source,
    })
}

/// Builds the `subindustry` factor for `target`: the equal-weighted
/// return of validated peers minus the industry factor return.
///
/// A peer is admitted iff its observation count over `range` is at
/// least `target_obs_count`. If fewer than 2 peers survive pruning, the
/// subindustry factor is dropped (`Ok(None)`) rather than fit on a
/// degenerate peer set.
pub async fn build_subindustry_factor(
    provider: &dyn PriceProvider,
    target: &Ticker,
    peers: &[Ticker],
    industry_series: Option<&MonthlySeries<f64>>,
    target_obs_count: usize,
    range: &DateRange,
) -> FactorsResult<Option<(String, MonthlySeries<f64>)>> {
    let Some(industry_series) = industry_series else {
        return Ok(None);
    };

    let mut validated = Vec::new();
    for peer in peers {
        let series = peer_returns(provider, target, peer, range).await?;
        if series.len() >= target_obs_count {
            validated.push(series);
        }
    }

    if validated.len() < 2 {
        return Ok(None);
    }

    let industry_lookup: BTreeMap<Date, f64> =
        industry_series.points().iter().copied().collect();

    let mut common_dates: Vec<Date> = validated[0].dates().collect();
    for series in &validated[1..] {
        let dates: std::collections::BTreeSet<Date> = series.dates().collect();
        common_dates.retain(|d| dates.contains(d));
    }
    common_dates.retain(|d| industry_lookup.contains_key(d));

    if common_dates.len() < 2 {
        return Ok(None);
    }

    let peer_lookups: Vec<BTreeMap<Date, f64>> = validated
        .iter()
        .map(|series| series.points().iter().copied().collect())
        .collect();

    let n = peer_lookups.len() as f64;
    let mut points = Vec::with_capacity(common_dates.len());
    for date in &common_dates {
        let equal_weighted = peer_lookups
            .iter()
            .fold(0.0, |acc, lookup| acc + lookup[date])
            / n;
        points.push((*date, equal_weighted - industry_lookup[date]));
    }

    let series = MonthlySeries::new(points).map_err(|_| FactorsError::Regression {
        ticker: target.to_string(),
        source: riskcore_math::MathError::insufficient_data(2, common_dates.len()),
    })?;

    Ok(Some((format!("{SUBINDUSTRY_PREFIX}{target}"), series)))
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

    struct StubProvider {
        series: BTreeMap<String, MonthlySeries<f64>>,
    }

    #[async_trait::async_trait]
    impl PriceProvider for StubProvider {
        async fn fetch_monthly_close(
            &self,
            _ticker: &Ticker,
            _range: &DateRange,
        ) -> Result<MonthlySeries<f64>, riskcore_traits::TraitError> {
            unimplemented!()
        }

        async fn fetch_monthly_total_return(
            &self,
            ticker: &Ticker,
            _range: &DateRange,
        ) -> Result<MonthlySeries<f64>, riskcore_traits::TraitError> {
            self.series
                .get(ticker.as_str())
                .cloned()
                .ok_or_else(|| riskcore_traits::TraitError::DataUnavailable {
                    ticker: ticker.to_string(),
                    range: "test".to_string(),
                })
        }

        async fn fetch_monthly_treasury(
            &self,
            _maturity: riskcore_traits::market_data::TreasuryMaturity,
            _range: &DateRange,
        ) -> Result<MonthlySeries<f64>, riskcore_traits::TraitError> {
            unimplemented!()
        }

        async fn fetch_dividend_history(
            &self,
            _ticker: &Ticker,
            _range: &DateRange,
        ) -> Result<Vec<riskcore_traits::market_data::DividendPayment>, riskcore_traits::TraitError>
        {
            unimplemented!()
        }
    }

    fn sample_range() -> DateRange {
        DateRange::new(
            Date::from_ymd(2023, 1, 31).unwrap(),
            Date::from_ymd(2024, 1, 31).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_subindustry_dropped_with_too_few_peers() {
        let mut prices = BTreeMap::new();
        prices.insert(
            "PEER1".to_string(),
            series(&[(2024, 1, 0.01), (2024, 2, 0.02), (2024, 3, 0.03)]),
        );
        let provider = StubProvider { series: prices };
        let industry = series(&[(2024, 1, 0.0), (2024, 2, 0.0), (2024, 3, 0.0)]);
        let result = build_subindustry_factor(
            &provider,
            &Ticker::new("NVDA"),
            &[Ticker::new("PEER1")],
            Some(&industry),
            2,
            &sample_range(),
        )
        .await
        .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_subindustry_built_when_enough_peers_pass() {
        let mut prices = BTreeMap::new();
        prices.insert(
            "PEER1".to_string(),
            series(&[(2024, 1, 0.01), (2024, 2, 0.02), (2024, 3, 0.03)]),
        );
        prices.insert(
            "PEER2".to_string(),
            series(&[(2024, 1, 0.02), (2024, 2, 0.01), (2024, 3, 0.02)]),
        );
        let provider = StubProvider { series: prices };
        let industry = series(&[(2024, 1, 0.0), (2024, 2, 0.0), (2024, 3, 0.0)]);
        let result = build_subindustry_factor(
            &provider,
            &Ticker::new("NVDA"),
            &[Ticker::new("PEER1"), Ticker::new("PEER2")],
            Some(&industry),
            2,
            &sample_range(),
        )
        .await
        .unwrap();
        assert!(result.is_some());
        let (label, series) = result.unwrap();
        assert_eq!(label, "subindustry:NVDA");
        assert_eq!(series.len(), 3);
    }
}
