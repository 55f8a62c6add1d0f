//! Constrained optimization primitives shared by `riskcore-optimize`'s
//! MinVar and MaxRet programs (C8).
//!
//! `gradient_descent` is the teacher's own numerical-gradient steepest
//! descent routine, kept verbatim. `penalty_minimize` generalizes it to
//! constrained problems via an exterior quadratic penalty method: each
//! outer round minimizes `objective + penalty_weight * penalty(w)`
//! unconstrained, then grows `penalty_weight` until the constraint
//! violation is within tolerance. The teacher never needed constraints
//! (its curve-fitting use of `gradient_descent` is unconstrained), so
//! this part has no direct precedent and is grounded on the penalty
//! method as the natural extension of the teacher's own line-search
//! loop.

use crate::error::MathResult;

/// Configuration for the unconstrained line-search routine.
#[derive(Debug, Clone, Copy)]
pub struct OptimizationConfig {
    /// Gradient-norm tolerance for declaring convergence.
    pub tolerance: f64,
    /// Maximum iterations of the inner line search.
    pub max_iterations: u32,
    /// Step size for numerical (central-difference) gradients.
    pub step_size: f64,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 200,
            step_size: 1e-8,
        }
    }
}

/// Result of an unconstrained minimization.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Parameters at termination.
    pub parameters: Vec<f64>,
    /// Objective value at `parameters`.
    pub objective_value: f64,
    /// Iterations used.
    pub iterations: u32,
    /// Whether the gradient-norm tolerance was reached.
    pub converged: bool,
}

/// Minimizes `f` via steepest descent with numerical gradients and
/// Armijo backtracking line search.
///
/// # Errors
///
/// This routine does not fail — it reports non-convergence via
/// `OptimizationResult::converged = false` rather than an error, since a
/// best-effort local optimum is still useful to the caller. Kept
/// fallible for symmetry with the rest of the crate and to leave room
/// for future argument validation.
pub fn gradient_descent<F>(
    f: F,
    initial: &[f64],
    config: &OptimizationConfig,
) -> MathResult<OptimizationResult>
where
    F: Fn(&[f64]) -> f64,
{
    let mut params = initial.to_vec();
    let mut best_value = f(&params);
    let n = params.len();

    for iteration in 0..config.max_iterations {
        let mut gradient = vec![0.0; n];
        for i in 0..n {
            let mut params_plus = params.clone();
            let mut params_minus = params.clone();
            params_plus[i] += config.step_size;
            params_minus[i] -= config.step_size;
            gradient[i] = (f(&params_plus) - f(&params_minus)) / (2.0 * config.step_size);
        }

        let grad_mag: f64 = gradient.iter().fold(0.0, |acc, g| acc + g * g).sqrt();
        if grad_mag < config.tolerance {
            return Ok(OptimizationResult {
                parameters: params,
                objective_value: best_value,
                iterations: iteration,
                converged: true,
            });
        }

        let mut step = 1.0;
        let c = 0.5;
        loop {
            let mut new_params = params.clone();
            for i in 0..n {
                new_params[i] -= step * gradient[i];
            }
            let new_value = f(&new_params);
            if new_value < best_value - c * step * grad_mag * grad_mag {
                params = new_params;
                best_value = new_value;
                break;
            }
            step *= 0.5;
            if step < 1e-15 {
                return Ok(OptimizationResult {
                    parameters: params,
                    objective_value: best_value,
                    iterations: iteration,
                    converged: false,
                });
            }
        }
    }

    Ok(OptimizationResult {
        parameters: params,
        objective_value: best_value,
        iterations: config.max_iterations,
        converged: false,
    })
}

/// Configuration for the exterior penalty method.
#[derive(Debug, Clone, Copy)]
pub struct PenaltyConfig {
    /// Inner unconstrained solve configuration.
    pub inner: OptimizationConfig,
    /// Initial penalty weight.
    pub initial_weight: f64,
    /// Multiplicative growth factor applied to the penalty weight each
    /// outer round.
    pub growth_factor: f64,
    /// Maximum outer penalty rounds.
    pub max_rounds: u32,
    /// Constraint violation below which the solution is accepted.
    pub violation_tolerance: f64,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            inner: OptimizationConfig::default(),
            initial_weight: 10.0,
            growth_factor: 10.0,
            max_rounds: 8,
            violation_tolerance: 1e-6,
        }
    }
}

/// Result of a constrained minimization via the penalty method.
#[derive(Debug, Clone)]
pub struct PenaltyResult {
    /// Parameters at termination.
    pub parameters: Vec<f64>,
    /// Objective value (unpenalized) at `parameters`.
    pub objective_value: f64,
    /// Total penalty (constraint violation measure) at `parameters`.
    pub penalty_value: f64,
    /// Outer rounds used.
    pub rounds: u32,
    /// Whether the final round's violation was within tolerance.
    pub feasible: bool,
    /// Whether the outer loop exited early because `cancelled` reported
    /// `true`, rather than by converging or exhausting `max_rounds`.
    pub cancelled: bool,
}

/// Minimizes `objective(w)` subject to the constraints encoded by
/// `penalty(w)` (a non-negative function that is zero iff every
/// constraint is satisfied — equality constraints contribute
/// `(g(w))^2`, inequality constraints contribute `max(0, g(w))^2`).
///
/// Each outer round solves `objective + weight * penalty` via
/// [`gradient_descent`] starting from the previous round's optimum, then
/// grows `weight`. Terminates early once `penalty(w) <
/// config.violation_tolerance`, or if `cancelled()` reports `true` at
/// the start of an outer round — checked once per outer iteration
/// rather than inside the inner line search, so a cancellation signal
/// can only ever cut short a bounded amount of additional work. Kept as
/// a plain closure rather than a concrete cancellation-token type so
/// this crate stays free of any async runtime dependency; callers above
/// it (`riskcore-optimize`) close over a `tokio_util::sync::CancellationToken`.
///
/// # Errors
///
/// Propagates errors from the inner `gradient_descent` solve (currently
/// infallible, but kept `Result` for future argument validation).
pub fn penalty_minimize<O, P, C>(
    objective: O,
    penalty: P,
    initial: &[f64],
    config: &PenaltyConfig,
    cancelled: C,
) -> MathResult<PenaltyResult>
where
    O: Fn(&[f64]) -> f64,
    P: Fn(&[f64]) -> f64,
    C: Fn() -> bool,
{
    let mut params = initial.to_vec();
    let mut weight = config.initial_weight;
    let mut rounds_used = 0;
    let mut final_penalty = penalty(&params);
    let mut was_cancelled = false;

    for round in 0..config.max_rounds {
        if cancelled() {
            was_cancelled = true;
            break;
        }
        rounds_used = round + 1;
        let combined = |w: &[f64]| objective(w) + weight * penalty(w);
        let result = gradient_descent(combined, &params, &config.inner)?;
        params = result.parameters;
        final_penalty = penalty(&params);
        if final_penalty < config.violation_tolerance {
            break;
        }
        weight *= config.growth_factor;
    }

    Ok(PenaltyResult {
        objective_value: objective(&params),
        penalty_value: final_penalty,
        parameters: params,
        rounds: rounds_used,
        feasible: !was_cancelled && final_penalty < config.violation_tolerance,
        cancelled: was_cancelled,
    })
}

/// Quadratic equality-violation penalty: `(achieved - target)^2`.
#[must_use]
pub fn equality_penalty(achieved: f64, target: f64) -> f64 {
    (achieved - target).powi(2)
}

/// Quadratic inequality-violation penalty for `value <= bound`:
/// `max(0, value - bound)^2`.
#[must_use]
pub fn upper_bound_penalty(value: f64, bound: f64) -> f64 {
    (value - bound).max(0.0).powi(2)
}

/// Quadratic inequality-violation penalty for `value >= bound`:
/// `max(0, bound - value)^2`.
#[must_use]
pub fn lower_bound_penalty(value: f64, bound: f64) -> f64 {
    (bound - value).max(0.0).powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gradient_descent_quadratic() {
        let f = |params: &[f64]| {
            let x = params[0];
            let y = params[1];
            (x - 2.0).powi(2) + (y - 3.0).powi(2)
        };
        let result = gradient_descent(f, &[0.0, 0.0], &OptimizationConfig::default()).unwrap();
        assert!(result.converged);
        assert_relative_eq!(result.parameters[0], 2.0, epsilon = 1e-4);
        assert_relative_eq!(result.parameters[1], 3.0, epsilon = 1e-4);
    }

    #[test]
    fn test_penalty_minimize_equality_constraint() {
        // Minimize w0^2 + w1^2 subject to w0 + w1 = 1.
        let objective = |w: &[f64]| w[0] * w[0] + w[1] * w[1];
        let penalty = |w: &[f64]| equality_penalty(w[0] + w[1], 1.0);
        let result =
            penalty_minimize(objective, penalty, &[0.0, 0.0], &PenaltyConfig::default(), || false).unwrap();
        assert!(result.feasible);
        assert!(!result.cancelled);
        assert_relative_eq!(result.parameters[0], 0.5, epsilon = 1e-3);
        assert_relative_eq!(result.parameters[1], 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_penalty_minimize_stops_early_when_cancelled() {
        let objective = |w: &[f64]| w[0] * w[0] + w[1] * w[1];
        let penalty = |w: &[f64]| equality_penalty(w[0] + w[1], 1.0);
        let result =
            penalty_minimize(objective, penalty, &[0.0, 0.0], &PenaltyConfig::default(), || true).unwrap();
        assert!(result.cancelled);
        assert!(!result.feasible);
        assert_eq!(result.rounds, 0);
    }

    #[test]
    fn test_upper_bound_penalty_zero_when_satisfied() {
        assert_relative_eq!(upper_bound_penalty(0.5, 1.0), 0.0, epsilon = 1e-12);
        assert!(upper_bound_penalty(1.5, 1.0) > 0.0);
    }
}
