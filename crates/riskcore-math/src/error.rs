//! Error types for the numerical kernels.

use riskcore_core::RiskError;
use thiserror::Error;

/// A specialized `Result` type for `riskcore-math` operations.
pub type MathResult<T> = Result<T, MathError>;

/// Errors a numerical kernel (returns, regression, linear algebra,
/// optimization) can raise.
#[derive(Error, Debug, Clone)]
pub enum MathError {
    /// Fewer observations than the kernel requires.
    #[error("insufficient data: need at least {required}, got {actual}")]
    InsufficientData {
        /// Minimum required points.
        required: usize,
        /// Actual number of points.
        actual: usize,
    },

    /// Design matrix is rank-deficient or ill-conditioned beyond the
    /// configured threshold.
    #[error("singular design matrix: {reason}")]
    SingularDesign {
        /// Why the design failed (rank deficiency, condition number).
        reason: String,
    },

    /// Matrix dimensions are incompatible for the requested operation.
    #[error("incompatible dimensions: ({rows1}x{cols1}) and ({rows2}x{cols2})")]
    DimensionMismatch {
        /// Rows in the first operand.
        rows1: usize,
        /// Columns in the first operand.
        cols1: usize,
        /// Rows in the second operand.
        rows2: usize,
        /// Columns in the second operand.
        cols2: usize,
    },

    /// An iterative solver (optimizer, eigen-solver) failed to converge.
    #[error("convergence failed after {iterations} iterations (residual {residual:.3e})")]
    ConvergenceFailed {
        /// Iterations attempted.
        iterations: u32,
        /// Final residual.
        residual: f64,
    },

    /// An invalid numeric argument (e.g. a window size out of range).
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Description of the invalid input.
        reason: String,
    },

    /// A computation produced NaN or infinity.
    #[error("numerical failure: {reason}")]
    NumericalFailure {
        /// Description of the failure.
        reason: String,
    },

    /// A constrained optimization had no feasible point.
    #[error("infeasible: {tightest_binding_family}")]
    Infeasible {
        /// The constraint family that could not be satisfied.
        tightest_binding_family: String,
    },
}

impl MathError {
    /// Creates an insufficient-data error.
    #[must_use]
    pub fn insufficient_data(required: usize, actual: usize) -> Self {
        Self::InsufficientData { required, actual }
    }

    /// Creates a singular-design error.
    #[must_use]
    pub fn singular_design(reason: impl Into<String>) -> Self {
        Self::SingularDesign {
            reason: reason.into(),
        }
    }

    /// Creates an invalid-input error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Creates a numerical-failure error.
    #[must_use]
    pub fn numerical_failure(reason: impl Into<String>) -> Self {
        Self::NumericalFailure {
            reason: reason.into(),
        }
    }
}

impl From<MathError> for RiskError {
    /// Converts a ticker-agnostic math error into the engine's taxonomy.
    ///
    /// `riskcore-math` kernels don't carry a ticker; callers that fit a
    /// per-ticker regression attach the ticker themselves via
    /// [`RiskError::insufficient_data`]/[`RiskError::singular_design`]
    /// instead of this blanket conversion where one is available.
    fn from(err: MathError) -> Self {
        match err {
            MathError::InsufficientData { required, actual } => {
                RiskError::insufficient_data("<unknown>", required, actual)
            }
            MathError::SingularDesign { reason } => RiskError::singular_design("<unknown>", reason),
            MathError::DimensionMismatch { rows1, cols1, rows2, cols2 } => {
                RiskError::numerical_failure(format!(
                    "incompatible dimensions: ({rows1}x{cols1}) and ({rows2}x{cols2})"
                ))
            }
            MathError::ConvergenceFailed { iterations, residual } => RiskError::numerical_failure(
                format!("convergence failed after {iterations} iterations (residual {residual:.3e})"),
            ),
            MathError::InvalidInput { reason } => RiskError::input_invalid(reason),
            MathError::NumericalFailure { reason } => RiskError::numerical_failure(reason),
            MathError::Infeasible { tightest_binding_family } => {
                RiskError::infeasible(tightest_binding_family)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MathError::singular_design("rank(X) = 2 < k = 3");
        assert!(err.to_string().contains("rank(X)"));
    }
}
