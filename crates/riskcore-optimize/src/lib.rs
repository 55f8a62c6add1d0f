//! # Riskcore Optimize
//!
//! Convex optimizer (C8, §4.8): minimum-variance and
//! maximum-expected-return programs over a portfolio's tickers, both
//! reusing the `(B, Σ_f, σ²_ε)` sensitivity model the Factor Model
//! Assembler (C4) produces and `RiskLimits` as the constraint set.
//!
//! Neither program has a closed-form solver in this crate's dependency
//! stack — both are solved via `riskcore-math::optimize::penalty_minimize`,
//! an exterior quadratic-penalty generalization of the teacher's own
//! numerical-gradient steepest descent with Armijo backtracking.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::collections::BTreeMap;

use riskcore_core::result::{LimitId, OptimizationKind};
use riskcore_core::types::Ticker;
use riskcore_math::optimize::PenaltyConfig;
use riskcore_traits::EngineConfig;

pub mod constraints;
pub mod expected_returns;
pub mod maxret;
pub mod minvar;

/// The result of solving either convex program (§4.8): optimal weights,
/// achieved risk and return, and the constraints active at the
/// solution.
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    /// Which program produced this outcome.
    pub kind: OptimizationKind,
    /// Optimal weight per ticker.
    pub weights: BTreeMap<Ticker, f64>,
    /// Annualized portfolio volatility at the optimum.
    pub achieved_risk: f64,
    /// Portfolio expected return at the optimum (informational for
    /// MinVar, the objective value for MaxRet).
    pub achieved_return: f64,
    /// Constraints within tolerance of their bound at the optimum.
    pub binding_constraints: Vec<LimitId>,
}

/// Maps the engine's `SolverTolerances` onto the penalty method's
/// config: the outer loop accepts a solution once constraint violation
/// is within the equality-residual tolerance, and the inner
/// unconstrained solve targets the objective tolerance.
fn penalty_config_from(config: &EngineConfig) -> PenaltyConfig {
    let mut penalty_config = PenaltyConfig::default();
    penalty_config.inner.tolerance = config.solver_tolerances.objective_tolerance;
    penalty_config.violation_tolerance = config.solver_tolerances.equality_residual_tolerance;
    penalty_config
}
