//! Ticker identifiers, including the `CUR:<ISO4217>` cash pseudo-ticker form.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Currency;

/// An opaque, case-sensitive ticker identifier.
///
/// May be an equity symbol (`"NVDA"`) or a cash pseudo-ticker of the
/// form `CUR:<ISO4217>` (`"CUR:USD"`), which the engine resolves via a
/// reference mapping to a short-duration instrument rather than fetching
/// price history for it directly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    /// Creates a ticker from any string-like value. Comparison is
    /// case-sensitive, so no normalization is performed.
    pub fn new(label: impl Into<String>) -> Self {
        Ticker(label.into())
    }

    /// Returns the underlying label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the `CUR:<ISO4217>` currency out of this ticker, if it is
    /// a cash pseudo-ticker.
    #[must_use]
    pub fn cash_currency(&self) -> Option<Currency> {
        self.0
            .strip_prefix("CUR:")
            .and_then(|code| Currency::parse(code).ok())
    }

    /// True if this ticker is a cash pseudo-ticker.
    #[must_use]
    pub fn is_cash(&self) -> bool {
        self.cash_currency().is_some()
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Ticker(s.to_string())
    }
}

impl From<String> for Ticker {
    fn from(s: String) -> Self {
        Ticker(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cash_ticker() {
        let t = Ticker::new("CUR:USD");
        assert!(t.is_cash());
        assert_eq!(t.cash_currency().unwrap().code(), "USD");
    }

    #[test]
    fn test_equity_ticker() {
        let t = Ticker::new("NVDA");
        assert!(!t.is_cash());
        assert!(t.cash_currency().is_none());
    }

    #[test]
    fn test_malformed_cash_ticker_is_not_cash() {
        let t = Ticker::new("CUR:us");
        assert!(!t.is_cash());
    }

    #[test]
    fn test_case_sensitive_equality() {
        assert_ne!(Ticker::new("nvda"), Ticker::new("NVDA"));
    }
}
