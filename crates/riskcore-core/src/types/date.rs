//! Month-end date type for monthly-sampled risk calculations.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RiskError;

/// A calendar date.
///
/// Newtype wrapper around `chrono::NaiveDate` providing the month-end
/// arithmetic the engine's monthly sampling model depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Date(NaiveDate);

impl Date {
    /// Creates a new date from year, month, and day.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::InputInvalid` if the date is invalid.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, RiskError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Date)
            .ok_or_else(|| RiskError::input_invalid(format!("invalid date {year}-{month:02}-{day:02}")))
    }

    /// Creates a date from an ISO 8601 string (YYYY-MM-DD).
    ///
    /// # Errors
    ///
    /// Returns `RiskError::InputInvalid` if the string cannot be parsed.
    pub fn parse(s: &str) -> Result<Self, RiskError> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Date)
            .map_err(|_| RiskError::input_invalid(format!("cannot parse date: {s}")))
    }

    /// Returns the year component.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Returns the month component (1-12).
    #[must_use]
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Returns the day component (1-31).
    #[must_use]
    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// Checks if the year is a leap year.
    #[must_use]
    pub fn is_leap_year(&self) -> bool {
        self.0.leap_year()
    }

    /// Returns the number of days in the date's month.
    #[must_use]
    pub fn days_in_month(&self) -> u32 {
        match self.month() {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            2 if self.is_leap_year() => 29,
            2 => 28,
            _ => unreachable!(),
        }
    }

    /// Adds a number of calendar months, clamping the day to the last
    /// valid day of the resulting month.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::InputInvalid` if the result is out of range.
    pub fn add_months(&self, months: i32) -> Result<Self, RiskError> {
        let total_months = self.year() * 12 + self.month() as i32 - 1 + months;
        let new_year = total_months.div_euclid(12);
        let new_month = (total_months.rem_euclid(12) + 1) as u32;
        let max_day = days_in_month(new_year, new_month);
        let new_day = self.day().min(max_day);
        Self::from_ymd(new_year, new_month, new_day)
    }

    /// Returns the end-of-month date for the month containing `self`.
    #[must_use]
    pub fn end_of_month(&self) -> Self {
        Date(
            NaiveDate::from_ymd_opt(self.year(), self.month(), self.days_in_month())
                .expect("end of month should always be valid"),
        )
    }

    /// True if `self` is already the last day of its month.
    #[must_use]
    pub fn is_end_of_month(&self) -> bool {
        self.day() == self.days_in_month()
    }

    /// Returns the next month-end date strictly after `self`.
    #[must_use]
    pub fn next_month_end(&self) -> Self {
        self.end_of_month()
            .add_months(1)
            .expect("month-end stepping stays in range")
            .end_of_month()
    }

    /// Returns the number of calendar months between two month-end
    /// dates, positive if `other` is after `self`.
    #[must_use]
    pub fn months_between(&self, other: &Date) -> i32 {
        (other.year() - self.year()) * 12 + other.month() as i32 - self.month() as i32
    }

    /// Returns the underlying `NaiveDate`.
    #[must_use]
    pub fn as_naive_date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl From<NaiveDate> for Date {
    fn from(date: NaiveDate) -> Self {
        Date(date)
    }
}

impl From<Date> for NaiveDate {
    fn from(date: Date) -> Self {
        date.0
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => panic!("invalid month: {month}"),
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_creation() {
        let date = Date::from_ymd(2025, 6, 15).unwrap();
        assert_eq!(date.year(), 2025);
        assert_eq!(date.month(), 6);
    }

    #[test]
    fn test_invalid_date() {
        assert!(Date::from_ymd(2025, 2, 30).is_err());
    }

    #[test]
    fn test_end_of_month() {
        let date = Date::from_ymd(2025, 2, 1).unwrap();
        assert_eq!(date.end_of_month(), Date::from_ymd(2025, 2, 28).unwrap());
        assert!(date.end_of_month().is_end_of_month());
    }

    #[test]
    fn test_next_month_end_across_year() {
        let dec = Date::from_ymd(2024, 12, 31).unwrap();
        assert_eq!(dec.next_month_end(), Date::from_ymd(2025, 1, 31).unwrap());
    }

    #[test]
    fn test_months_between() {
        let a = Date::from_ymd(2019, 1, 31).unwrap();
        let b = Date::from_ymd(2024, 3, 31).unwrap();
        assert_eq!(a.months_between(&b), 62);
    }

    #[test]
    fn test_display_and_serde() {
        let date = Date::from_ymd(2025, 6, 15).unwrap();
        assert_eq!(format!("{date}"), "2025-06-15");
        let json = serde_json::to_string(&date).unwrap();
        let parsed: Date = serde_json::from_str(&json).unwrap();
        assert_eq!(date, parsed);
    }
}
