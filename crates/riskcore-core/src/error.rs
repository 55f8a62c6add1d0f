//! Error types for the riskcore engine.
//!
//! Defines the eight-kind error taxonomy from the engine's error handling
//! design: every component returns a tagged `RiskError`, never an
//! out-of-band exception.

use thiserror::Error;

/// A specialized Result type for riskcore operations.
pub type RiskResult<T> = Result<T, RiskError>;

/// The engine's error taxonomy. One variant per error kind; kinds are
/// not type names, they are the semantic categories every downstream
/// crate maps its own narrower errors onto via `From`.
#[derive(Error, Debug, Clone)]
pub enum RiskError {
    /// Malformed weights, inverted date range, or an unparseable scenario
    /// spec.
    #[error("invalid input: {message}")]
    InputInvalid {
        /// Description of what is invalid.
        message: String,
        /// Ticker the error pertains to, if any.
        offending_ticker: Option<String>,
        /// Suggested corrective action, if any.
        suggested_action: Option<String>,
    },

    /// The provider returned no data for a ticker/range.
    #[error("no data available for {ticker} in range {range}")]
    DataUnavailable {
        /// Ticker with no data.
        ticker: String,
        /// Human-readable date range description.
        range: String,
    },

    /// Fewer observations than required.
    #[error("insufficient data for {ticker}: need {required}, have {actual}")]
    InsufficientData {
        /// Ticker with insufficient data.
        ticker: String,
        /// Minimum required observation count.
        required: usize,
        /// Actual observation count.
        actual: usize,
    },

    /// Design matrix is rank-deficient or ill-conditioned.
    #[error("singular design matrix for {ticker}: {reason}")]
    SingularDesign {
        /// Ticker whose regression failed.
        ticker: String,
        /// Description of the degeneracy (rank deficiency, condition
        /// number threshold exceeded, ...).
        reason: String,
    },

    /// NaN or infinity encountered where forbidden after ridging.
    #[error("numerical failure: {reason}")]
    NumericalFailure {
        /// Description of the failure.
        reason: String,
    },

    /// The optimizer's constraint set has no interior.
    #[error("infeasible: {tightest_binding_family}")]
    Infeasible {
        /// The constraint family diagnosed as tightest-binding.
        tightest_binding_family: String,
    },

    /// Request was cancelled or timed out. Timeouts are modeled as
    /// cancellations per the concurrency design.
    #[error("cancelled")]
    Cancelled,

    /// A cache entry failed self-validation. Treated as a miss; the
    /// entry is quarantined and the computation proceeds.
    #[error("cache entry corrupt: {key}")]
    CacheCorrupt {
        /// Fingerprint of the corrupt entry.
        key: String,
    },
}

impl RiskError {
    /// Creates an `InputInvalid` error.
    #[must_use]
    pub fn input_invalid(message: impl Into<String>) -> Self {
        Self::InputInvalid {
            message: message.into(),
            offending_ticker: None,
            suggested_action: None,
        }
    }

    /// Creates an `InputInvalid` error naming the offending ticker.
    #[must_use]
    pub fn input_invalid_for(ticker: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InputInvalid {
            message: message.into(),
            offending_ticker: Some(ticker.into()),
            suggested_action: None,
        }
    }

    /// Creates a `DataUnavailable` error.
    #[must_use]
    pub fn data_unavailable(ticker: impl Into<String>, range: impl Into<String>) -> Self {
        Self::DataUnavailable {
            ticker: ticker.into(),
            range: range.into(),
        }
    }

    /// Creates an `InsufficientData` error.
    #[must_use]
    pub fn insufficient_data(ticker: impl Into<String>, required: usize, actual: usize) -> Self {
        Self::InsufficientData {
            ticker: ticker.into(),
            required,
            actual,
        }
    }

    /// Creates a `SingularDesign` error.
    #[must_use]
    pub fn singular_design(ticker: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SingularDesign {
            ticker: ticker.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `NumericalFailure` error.
    #[must_use]
    pub fn numerical_failure(reason: impl Into<String>) -> Self {
        Self::NumericalFailure {
            reason: reason.into(),
        }
    }

    /// Creates an `Infeasible` error.
    #[must_use]
    pub fn infeasible(tightest_binding_family: impl Into<String>) -> Self {
        Self::Infeasible {
            tightest_binding_family: tightest_binding_family.into(),
        }
    }

    /// Creates a `CacheCorrupt` error.
    #[must_use]
    pub fn cache_corrupt(key: impl Into<String>) -> Self {
        Self::CacheCorrupt { key: key.into() }
    }
}
