//! Price provider trait (C1).
//!
//! Polymorphic over the capability set the engine actually needs:
//! monthly close, monthly total return, monthly treasury yield, and
//! dividend history. Implementations must be referentially transparent
//! for a fixed `(ticker, range)` — repeated calls return equal series
//! unless the underlying store advances.

use async_trait::async_trait;

use riskcore_core::types::{Date, DateRange, MonthlySeries, Ticker};

use crate::error::TraitError;

/// Treasury maturity tenor for `fetch_monthly_treasury`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreasuryMaturity {
    /// 2-year.
    Y2,
    /// 5-year.
    Y5,
    /// 10-year.
    Y10,
    /// 30-year.
    Y30,
}

/// A single dividend payment record.
#[derive(Debug, Clone, Copy)]
pub struct DividendPayment {
    /// Ex-dividend date.
    pub ex_date: Date,
    /// Cash amount per share.
    pub amount: f64,
}

/// The data source every numerical kernel above C1 consumes.
///
/// Contract (§4.1):
/// - Fails with `TraitError::DataUnavailable` when a ticker has zero
///   observations in range.
/// - Fails with `TraitError::InsufficientData` when fewer than a
///   configurable minimum (default 24) months are present.
/// - No partial series: an internal gap in the requested range is an
///   `InsufficientData` failure, never a silent fill.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Monthly closing price series.
    async fn fetch_monthly_close(
        &self,
        ticker: &Ticker,
        range: &DateRange,
    ) -> Result<MonthlySeries<f64>, TraitError>;

    /// Monthly total-return series (dividends reinvested).
    async fn fetch_monthly_total_return(
        &self,
        ticker: &Ticker,
        range: &DateRange,
    ) -> Result<MonthlySeries<f64>, TraitError>;

    /// Monthly treasury yield series (percent, not decimal) for a given
    /// maturity.
    async fn fetch_monthly_treasury(
        &self,
        maturity: TreasuryMaturity,
        range: &DateRange,
    ) -> Result<MonthlySeries<f64>, TraitError>;

    /// Dividend payment history over the range.
    async fn fetch_dividend_history(
        &self,
        ticker: &Ticker,
        range: &DateRange,
    ) -> Result<Vec<DividendPayment>, TraitError>;
}

/// Validates a fetched series against the provider contract's
/// minimum-observation rule. Kernels call this once after every fetch
/// rather than re-checking lengths ad hoc.
///
/// # Errors
///
/// Returns `TraitError::InsufficientData` if `series.len() <
/// min_observations`.
pub fn require_min_observations(
    ticker: &Ticker,
    series: &MonthlySeries<f64>,
    min_observations: usize,
) -> Result<(), TraitError> {
    if series.len() < min_observations {
        return Err(TraitError::InsufficientData {
            ticker: ticker.to_string(),
            required: min_observations,
            actual: series.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskcore_core::types::Date;

    #[test]
    fn test_require_min_observations_fails_below_threshold() {
        let points = vec![
            (Date::from_ymd(2024, 1, 31).unwrap(), 100.0),
            (Date::from_ymd(2024, 2, 29).unwrap(), 101.0),
        ];
        let series = MonthlySeries::new(points).unwrap();
        let ticker = Ticker::new("AAPL");
        let err = require_min_observations(&ticker, &series, 24).unwrap_err();
        assert!(matches!(err, TraitError::InsufficientData { .. }));
    }
}
