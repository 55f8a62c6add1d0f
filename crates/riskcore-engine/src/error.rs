//! Engine-construction error type.
//!
//! Narrower than [`riskcore_core::RiskError`] on purpose: everything
//! past construction already has a typed `RiskError` to report, so this
//! enum only needs to cover what can go wrong building a [`crate::RiskEngine`]
//! itself.

use thiserror::Error;

use riskcore_core::RiskError;

/// Error building a [`crate::RiskEngine`] via [`crate::RiskEngineBuilder`].
#[derive(Debug, Error, Clone)]
pub enum EngineError {
    /// A required builder field was never set.
    #[error("engine configuration error: {0}")]
    ConfigError(String),
}

impl From<EngineError> for RiskError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::ConfigError(message) => RiskError::input_invalid(message),
        }
    }
}
