//! # Riskcore Math
//!
//! Numerical kernels for the riskcore engine.
//!
//! This crate provides:
//!
//! - **Returns** (C2): simple monthly returns, annualized and rolling
//!   volatility.
//! - **Regression** (C3): OLS multi-factor fit with HAC (Newey-West)
//!   standard errors, VIF, and condition-number diagnostics.
//! - **Linear algebra**: ridging, sample covariance, rank and
//!   condition-number helpers shared by C3-C5.
//! - **Optimize**: the unconstrained line search and its exterior
//!   penalty-method generalization, the shared substrate for
//!   `riskcore-optimize`'s MinVar and MaxRet programs (C8).
//!
//! ## Design Philosophy
//!
//! - **Deterministic reduction order**: every sum over observations
//!   uses a fixed left-to-right fold, never an unordered iterator
//!   combinator, so results are bit-for-bit reproducible.
//! - **`f64` throughout**: callers at the `riskcore-core` boundary
//!   convert `Decimal` once; every kernel here works in double
//!   precision.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod linalg;
pub mod optimize;
pub mod regression;
pub mod returns;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{MathError, MathResult};
    pub use crate::linalg::{annualized_sample_covariance, design_condition_number, ridge_in_place};
    pub use crate::optimize::{gradient_descent, penalty_minimize, OptimizationConfig, PenaltyConfig};
    pub use crate::regression::{ols_fit, newey_west_lag, RegressionResult};
    pub use crate::returns::{monthly_returns, rolling_volatility, volatility_annual};
}

pub use error::{MathError, MathResult};
