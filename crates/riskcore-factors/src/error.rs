//! Error type for the Factor Model Assembler.

use riskcore_core::RiskError;
use riskcore_math::MathError;
use riskcore_traits::TraitError;
use thiserror::Error;

/// A specialized `Result` type for `riskcore-factors` operations.
pub type FactorsResult<T> = Result<T, FactorsError>;

/// Errors the assembler can raise, each naming the ticker whose
/// assembly step failed.
#[derive(Error, Debug, Clone)]
pub enum FactorsError {
    /// The provider failed for this ticker or one of its proxies.
    #[error("provider error for {ticker}: {source}")]
    Provider {
        /// Ticker being assembled.
        ticker: String,
        /// Underlying provider error.
        #[source]
        source: TraitError,
    },

    /// The per-ticker regression fit failed.
    #[error("regression failed for {ticker}: {source}")]
    Regression {
        /// Ticker whose fit failed.
        ticker: String,
        /// Underlying math error.
        #[source]
        source: MathError,
    },
}

impl From<FactorsError> for RiskError {
    fn from(err: FactorsError) -> Self {
        match err {
            FactorsError::Provider { ticker, source } => match source {
                TraitError::DataUnavailable { range, .. } => {
                    RiskError::data_unavailable(ticker, range)
                }
                TraitError::InsufficientData {
                    required, actual, ..
                } => RiskError::insufficient_data(ticker, required, actual),
                other => RiskError::numerical_failure(format!(
                    "provider error assembling {ticker}: {other}"
                )),
            },
            FactorsError::Regression { ticker, source } => match source {
                MathError::InsufficientData { required, actual } => {
                    RiskError::insufficient_data(ticker, required, actual)
                }
                MathError::SingularDesign { reason } => RiskError::singular_design(ticker, reason),
                other => {
                    RiskError::numerical_failure(format!("regression failed for {ticker}: {other}"))
                }
            },
        }
    }
}
