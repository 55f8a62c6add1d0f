//! `DateRange` and `MonthlySeries<T>`: the engine's monthly sampling model.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Date;
use crate::error::RiskError;

/// An inclusive range of month-end dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    /// Creates a date range, requiring `start <= end`. Both bounds are
    /// normalized to month-end.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::InputInvalid` if `start > end`.
    pub fn new(start: Date, end: Date) -> Result<Self, RiskError> {
        let start = start.end_of_month();
        let end = end.end_of_month();
        if start > end {
            return Err(RiskError::input_invalid(format!(
                "date range inverted: start {start} > end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Returns the inclusive start date (month-end).
    #[must_use]
    pub fn start(&self) -> Date {
        self.start
    }

    /// Returns the inclusive end date (month-end).
    #[must_use]
    pub fn end(&self) -> Date {
        self.end
    }

    /// Returns the number of calendar months spanned, inclusive of both
    /// endpoints.
    #[must_use]
    pub fn month_count(&self) -> usize {
        (self.start.months_between(&self.end) + 1).max(0) as usize
    }

    /// Returns every month-end date in the range, ascending.
    #[must_use]
    pub fn month_ends(&self) -> Vec<Date> {
        let mut dates = Vec::with_capacity(self.month_count());
        let mut current = self.start;
        while current <= self.end {
            dates.push(current);
            current = current.next_month_end();
        }
        dates
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// An ordered, gap-free sequence of `(month_end, value)` pairs, one per
/// calendar month, ascending.
///
/// Supports random access and length queries by design: the regression
/// kernel needs aligned slices, which rules out a forward-only stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySeries<T> {
    points: Vec<(Date, T)>,
}

impl<T> MonthlySeries<T> {
    /// Builds a series from points, validating that dates are strictly
    /// ascending month-ends with no gaps.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::InputInvalid` if dates are not strictly
    /// ascending by exactly one month, or are not month-end dates.
    pub fn new(points: Vec<(Date, T)>) -> Result<Self, RiskError> {
        for pair in points.windows(2) {
            let (prev, next) = (pair[0].0, pair[1].0);
            if prev.months_between(&next) != 1 {
                return Err(RiskError::input_invalid(format!(
                    "monthly series has a gap or disorder between {prev} and {next}"
                )));
            }
        }
        if let Some((first, _)) = points.first() {
            if !first.is_end_of_month() {
                return Err(RiskError::input_invalid(format!(
                    "monthly series must be sampled on month-end dates, got {first}"
                )));
            }
        }
        Ok(Self { points })
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the series has no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the underlying points.
    #[must_use]
    pub fn points(&self) -> &[(Date, T)] {
        &self.points
    }

    /// Returns the dates, in ascending order.
    pub fn dates(&self) -> impl Iterator<Item = Date> + '_ {
        self.points.iter().map(|(d, _)| *d)
    }

    /// Returns the values, in date order.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.points.iter().map(|(_, v)| v)
    }
}

impl MonthlySeries<f64> {
    /// Returns the values as a plain `Vec<f64>`, in date order.
    #[must_use]
    pub fn values_vec(&self) -> Vec<f64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32) -> Date {
        Date::from_ymd(y, m, 1).unwrap().end_of_month()
    }

    #[test]
    fn test_date_range_month_count() {
        let r = DateRange::new(d(2024, 1), d(2024, 3)).unwrap();
        assert_eq!(r.month_count(), 3);
        assert_eq!(r.month_ends().len(), 3);
    }

    #[test]
    fn test_date_range_inverted_rejected() {
        assert!(DateRange::new(d(2024, 3), d(2024, 1)).is_err());
    }

    #[test]
    fn test_monthly_series_gap_rejected() {
        let points = vec![(d(2024, 1), 1.0), (d(2024, 3), 2.0)];
        assert!(MonthlySeries::new(points).is_err());
    }

    #[test]
    fn test_monthly_series_ok() {
        let points = vec![(d(2024, 1), 1.0), (d(2024, 2), 2.0), (d(2024, 3), 3.0)];
        let s = MonthlySeries::new(points).unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.values_vec(), vec![1.0, 2.0, 3.0]);
    }
}
