//! An in-memory, deterministic [`PriceProvider`] fixture for tests and
//! demos: no network, no disk, reproducible across runs — grounded on
//! `convex_ext_file::reference_data::InMemoryBondStore`'s plain-struct,
//! fluent-`with_*`-configured lookup-table shape.
//!
//! Series are synthesized from a splitmix64 stream seeded by the
//! ticker's own bytes, not sampled from any real market data (none is
//! available to this workspace) — every run of the same ticker over the
//! same range reproduces byte-identical output.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use riskcore_core::types::{Date, DateRange, MonthlySeries, Ticker};
use riskcore_traits::error::TraitError;
use riskcore_traits::market_data::{DividendPayment, TreasuryMaturity};
use riskcore_traits::PriceProvider;

/// Deterministic synthetic price/return/treasury data, configurable per
/// ticker to exercise the `DataUnavailable`/`InsufficientData` paths
/// (§4.1) without a real data source.
#[derive(Debug, Clone, Default)]
pub struct FixturePriceProvider {
    missing: BTreeSet<Ticker>,
    short_history_months: BTreeMap<Ticker, usize>,
}

impl FixturePriceProvider {
    /// An unconfigured fixture: every ticker has full synthetic history
    /// over whatever range is requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `ticker` as having no data at all; fetches for it fail
    /// with `TraitError::DataUnavailable`.
    #[must_use]
    pub fn with_missing_ticker(mut self, ticker: impl Into<Ticker>) -> Self {
        self.missing.insert(ticker.into());
        self
    }

    /// Truncates `ticker`'s synthetic series to its first `months`
    /// observations regardless of the requested range, so a caller can
    /// exercise the insufficient-data path deterministically.
    #[must_use]
    pub fn with_short_history(mut self, ticker: impl Into<Ticker>, months: usize) -> Self {
        self.short_history_months.insert(ticker.into(), months);
        self
    }

    fn synthesize(&self, ticker: &Ticker, range: &DateRange, drift: f64, vol: f64) -> Result<MonthlySeries<f64>, TraitError> {
        if self.missing.contains(ticker) {
            return Err(TraitError::DataUnavailable {
                ticker: ticker.to_string(),
                range: range.to_string(),
            });
        }

        let mut month_ends = range.month_ends();
        if let Some(limit) = self.short_history_months.get(ticker) {
            month_ends.truncate(*limit);
        }
        if month_ends.is_empty() {
            return Err(TraitError::DataUnavailable {
                ticker: ticker.to_string(),
                range: range.to_string(),
            });
        }

        let seed = fnv1a(ticker.as_str());
        let mut price = 100.0_f64;
        let mut points = Vec::with_capacity(month_ends.len());
        for (i, date) in month_ends.into_iter().enumerate() {
            let noise = gaussian(seed, i as u64);
            let monthly_return = drift + vol * noise;
            price *= 1.0 + monthly_return;
            points.push((date, price));
        }

        MonthlySeries::new(points).map_err(|_| TraitError::InsufficientData {
            ticker: ticker.to_string(),
            required: 1,
            actual: 0,
        })
    }
}

#[async_trait]
impl PriceProvider for FixturePriceProvider {
    async fn fetch_monthly_close(&self, ticker: &Ticker, range: &DateRange) -> Result<MonthlySeries<f64>, TraitError> {
        self.synthesize(ticker, range, 0.007, 0.045)
    }

    async fn fetch_monthly_total_return(&self, ticker: &Ticker, range: &DateRange) -> Result<MonthlySeries<f64>, TraitError> {
        self.synthesize(ticker, range, 0.008, 0.045)
    }

    async fn fetch_monthly_treasury(&self, maturity: TreasuryMaturity, range: &DateRange) -> Result<MonthlySeries<f64>, TraitError> {
        let label = match maturity {
            TreasuryMaturity::Y2 => "TREASURY:2Y",
            TreasuryMaturity::Y5 => "TREASURY:5Y",
            TreasuryMaturity::Y10 => "TREASURY:10Y",
            TreasuryMaturity::Y30 => "TREASURY:30Y",
        };
        let seed = fnv1a(label);
        let base_yield = match maturity {
            TreasuryMaturity::Y2 => 4.3,
            TreasuryMaturity::Y5 => 4.0,
            TreasuryMaturity::Y10 => 4.1,
            TreasuryMaturity::Y30 => 4.3,
        };
        let mut points = Vec::with_capacity(range.month_count());
        for (i, date) in range.month_ends().into_iter().enumerate() {
            let noise = gaussian(seed, i as u64);
            points.push((date, base_yield + 0.15 * noise));
        }
        MonthlySeries::new(points).map_err(|_| TraitError::DataUnavailable {
            ticker: label.to_string(),
            range: range.to_string(),
        })
    }

    async fn fetch_dividend_history(&self, ticker: &Ticker, _range: &DateRange) -> Result<Vec<DividendPayment>, TraitError> {
        if self.missing.contains(ticker) {
            return Err(TraitError::DataUnavailable {
                ticker: ticker.to_string(),
                range: "n/a".to_string(),
            });
        }
        Ok(Vec::new())
    }
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in s.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// One splitmix64 draw, mapped through a cheap Box-Muller transform to
/// an approximately-standard-normal value.
fn gaussian(seed: u64, index: u64) -> f64 {
    let (u1, state) = splitmix64(seed.wrapping_add(index.wrapping_mul(2)));
    let (u2, _) = splitmix64(state);
    let u1 = ((u1 >> 11) as f64 + 0.5) / (1u64 << 53) as f64;
    let u2 = ((u2 >> 11) as f64 + 0.5) / (1u64 << 53) as f64;
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

fn splitmix64(mut state: u64) -> (u64, u64) {
    state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    (z ^ (z >> 31), state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> DateRange {
        DateRange::new(Date::from_ymd(2014, 1, 31).unwrap(), Date::from_ymd(2024, 1, 31).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_fixture_is_deterministic_across_calls() {
        let provider = FixturePriceProvider::new();
        let ticker = Ticker::new("NVDA");
        let first = provider.fetch_monthly_close(&ticker, &range()).await.unwrap();
        let second = provider.fetch_monthly_close(&ticker, &range()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_fixture_differs_across_tickers() {
        let provider = FixturePriceProvider::new();
        let a = provider.fetch_monthly_close(&Ticker::new("NVDA"), &range()).await.unwrap();
        let b = provider.fetch_monthly_close(&Ticker::new("V"), &range()).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_missing_ticker_is_data_unavailable() {
        let provider = FixturePriceProvider::new().with_missing_ticker("ZZZZ");
        let err = provider.fetch_monthly_close(&Ticker::new("ZZZZ"), &range()).await.unwrap_err();
        assert!(matches!(err, TraitError::DataUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_short_history_truncates_observation_count() {
        let provider = FixturePriceProvider::new().with_short_history("NVDA", 6);
        let series = provider.fetch_monthly_close(&Ticker::new("NVDA"), &range()).await.unwrap();
        assert_eq!(series.len(), 6);
    }

    #[tokio::test]
    async fn test_full_range_has_full_coverage() {
        let provider = FixturePriceProvider::new();
        let series = provider.fetch_monthly_close(&Ticker::new("NVDA"), &range()).await.unwrap();
        assert_eq!(series.len(), range().month_count());
    }
}
