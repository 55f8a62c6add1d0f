//! ISO 4217 currency code, used to resolve cash pseudo-tickers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RiskError;

/// A validated ISO 4217 currency code (e.g. `USD`, `EUR`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency([u8; 3]);

impl Currency {
    /// Parses a currency code, requiring exactly three uppercase ASCII
    /// letters.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::InputInvalid` if `code` is not three uppercase
    /// ASCII letters.
    pub fn parse(code: &str) -> Result<Self, RiskError> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_uppercase) {
            return Err(RiskError::input_invalid(format!(
                "invalid ISO 4217 currency code: {code}"
            )));
        }
        Ok(Currency([bytes[0], bytes[1], bytes[2]]))
    }

    /// Returns the three-letter code.
    #[must_use]
    pub fn code(&self) -> &str {
        std::str::from_utf8(&self.0).expect("ASCII uppercase letters are valid UTF-8")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let usd = Currency::parse("USD").unwrap();
        assert_eq!(usd.code(), "USD");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Currency::parse("us").is_err());
        assert!(Currency::parse("USDD").is_err());
        assert!(Currency::parse("usd").is_err());
    }

    #[test]
    fn test_display() {
        let eur = Currency::parse("EUR").unwrap();
        assert_eq!(format!("{eur}"), "EUR");
    }
}
