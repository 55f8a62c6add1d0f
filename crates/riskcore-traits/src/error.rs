//! Error type for trait operations (providers, stores).

use riskcore_core::RiskError;
use thiserror::Error;

/// Common error type for provider and store operations. Each variant
/// maps onto exactly one `RiskError` kind via `From`.
#[derive(Debug, Error, Clone)]
pub enum TraitError {
    /// No data available for the requested ticker/range.
    #[error("no data available for {ticker} in {range}")]
    DataUnavailable {
        /// Ticker with no data.
        ticker: String,
        /// Range description.
        range: String,
    },

    /// Fewer observations than the configured minimum.
    #[error("insufficient data for {ticker}: need {required}, have {actual}")]
    InsufficientData {
        /// Ticker with insufficient data.
        ticker: String,
        /// Minimum required observation count.
        required: usize,
        /// Actual observation count.
        actual: usize,
    },

    /// A reference-mapping lookup found no entry for the key, and no
    /// override source was configured to fall back to.
    #[error("unmapped reference key: {key}")]
    UnmappedReference {
        /// The key that had no mapping.
        key: String,
    },

    /// The requested portfolio id has no stored portfolio.
    #[error("portfolio not found: {0}")]
    NotFound(String),

    /// Connection to a backing store or external service failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request was cancelled.
    #[error("cancelled")]
    Cancelled,
}

impl From<TraitError> for RiskError {
    fn from(err: TraitError) -> Self {
        match err {
            TraitError::DataUnavailable { ticker, range } => {
                RiskError::data_unavailable(ticker, range)
            }
            TraitError::InsufficientData {
                ticker,
                required,
                actual,
            } => RiskError::insufficient_data(ticker, required, actual),
            TraitError::UnmappedReference { key } => {
                RiskError::input_invalid_for(key, "no reference mapping and no override source")
            }
            TraitError::NotFound(id) => RiskError::input_invalid(format!("not found: {id}")),
            TraitError::ConnectionFailed(reason) => RiskError::numerical_failure(format!(
                "provider connection failed: {reason}"
            )),
            TraitError::Cancelled => RiskError::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmapped_reference_maps_to_input_invalid() {
        let err: RiskError = TraitError::UnmappedReference {
            key: "CUR:XYZ".to_string(),
        }
        .into();
        assert!(matches!(err, RiskError::InputInvalid { .. }));
    }
}
