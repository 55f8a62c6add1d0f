//! # Riskcore Core
//!
//! Core types, errors, and the result envelope for the riskcore
//! portfolio risk engine.
//!
//! This crate provides the foundational building blocks shared by every
//! other riskcore crate:
//!
//! - **Types**: `Date`, `DateRange`, `MonthlySeries`, `Ticker`,
//!   `Currency`, `Portfolio`, `FactorPanel`, `BetaVector`
//! - **Error**: the `RiskError` taxonomy and `RiskResult` alias
//! - **Result envelope**: `AnalysisResult`, the tagged output of every
//!   analysis kind (C11)
//!
//! ## Design Philosophy
//!
//! - **Decimal at the boundary, float in the kernel**: caller-facing
//!   quantities (weights, returns, limits) are `Decimal`; every
//!   numerical kernel works in `f64`. See [`decimal`].
//! - **No silent numeric failure**: [`result::FiniteF64`] refuses to
//!   serialize NaN or infinity; a failed computation must be a tagged
//!   error, never a sentinel value.
//!
//! ## Example
//!
//! ```rust
//! use riskcore_core::prelude::*;
//!
//! let ticker = Ticker::new("AAPL");
//! assert!(!ticker.is_cash());
//! assert_eq!(Ticker::new("CUR:USD").cash_currency().unwrap().code(), "USD");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod decimal;
pub mod error;
pub mod result;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::decimal::{from_f64, to_f64_lossy};
    pub use crate::error::{RiskError, RiskResult};
    pub use crate::result::{
        AnalysisResult, AnalysisResultKind, ComponentScore, FactorExposure, FiniteF64, LimitCheck,
        LimitId, OptimizationKind, RiskAnalysis, RiskCategory, RiskContribution,
        RiskMetricsSummary, VarianceDecomposition,
    };
    pub use crate::types::{
        AssetClass, BetaVector, Currency, Date, DateRange, FactorPanel, MonthlySeries, Portfolio,
        PortfolioBuilder, ProxySet, RiskLimits, Ticker,
    };
}

// Re-export commonly used types at the crate root.
pub use error::{RiskError, RiskResult};
pub use result::AnalysisResult;
pub use types::{Date, Portfolio, Ticker};
