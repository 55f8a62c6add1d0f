//! Factor regression kernel (C3): OLS fit with HAC (Newey-West)
//! standard errors, VIF, and condition-number diagnostics.

use nalgebra::{DMatrix, DVector};

use crate::error::{MathError, MathResult};
use crate::linalg::{design_condition_number, numerical_rank, ridge_in_place, variance_inflation_factors};

/// Ridge added to `X^T X` before inversion, per §4.5's numeric policy.
const RIDGE: f64 = 1e-10;

/// Output of an OLS multi-factor fit: `y = alpha + X*beta + epsilon`.
#[derive(Debug, Clone)]
pub struct RegressionResult {
    /// Factor sensitivities, aligned to `X`'s columns.
    pub beta: Vec<f64>,
    /// Intercept.
    pub alpha: f64,
    /// Adjusted R-squared.
    pub r_squared: f64,
    /// Annualized residual volatility.
    pub residual_vol_annual: f64,
    /// HAC (Newey-West) standard errors, aligned `[alpha, beta...]`.
    pub hac_standard_errors: Vec<f64>,
    /// Variance inflation factor per regressor (not including the
    /// intercept column).
    pub vif: Vec<f64>,
    /// Condition number of `X^T X`.
    pub condition_number: f64,
    /// Fitted residuals, in observation order.
    pub residuals: Vec<f64>,
}

/// Fits `y = alpha + X*beta + epsilon` by OLS and attaches HAC
/// diagnostics.
///
/// `y` has `t` observations; `x` is `t` rows by `k` factor columns,
/// pre-aligned to `y`'s dates by the caller (the Factor Model Assembler
/// owns alignment, §4.4 step 1).
///
/// # Errors
///
/// - `MathError::InsufficientData` if `t < k + 5`.
/// - `MathError::SingularDesign` if `rank(X) < k` (with the intercept
///   column included) or the condition number of `X^T X` exceeds
///   `max_condition_number`.
pub fn ols_fit(
    y: &[f64],
    x: &DMatrix<f64>,
    max_condition_number: f64,
) -> MathResult<RegressionResult> {
    let t = y.len();
    let k = x.ncols();
    if t != x.nrows() {
        return Err(MathError::invalid_input(format!(
            "y has {t} observations but X has {} rows",
            x.nrows()
        )));
    }
    if t < k + 5 {
        return Err(MathError::insufficient_data(k + 5, t));
    }

    let mut design = DMatrix::zeros(t, k + 1);
    design.view_mut((0, 0), (t, k)).copy_from(x);
    for row in 0..t {
        design[(row, k)] = 1.0;
    }

    let rank = numerical_rank(&design, 1e-9);
    if rank < k + 1 {
        return Err(MathError::singular_design(format!(
            "rank(X) = {rank} < k = {}",
            k + 1
        )));
    }
    let condition_number = design_condition_number(&design);
    if condition_number > max_condition_number {
        return Err(MathError::singular_design(format!(
            "condition number {condition_number:.3e} exceeds threshold {max_condition_number:.3e}"
        )));
    }

    let y_vec = DVector::from_row_slice(y);
    let xt = design.transpose();
    let mut xtx = &xt * &design;
    ridge_in_place(&mut xtx, RIDGE);
    let xty = &xt * &y_vec;
    let coefficients = xtx
        .clone()
        .lu()
        .solve(&xty)
        .ok_or_else(|| MathError::singular_design("X'X not invertible after ridging"))?;

    let beta: Vec<f64> = coefficients.rows(0, k).iter().copied().collect();
    let alpha = coefficients[k];

    let fitted = &design * &coefficients;
    let residuals_vec = &y_vec - &fitted;
    let residuals: Vec<f64> = residuals_vec.iter().copied().collect();

    let mean_y = y.iter().fold(0.0, |acc, v| acc + v) / t as f64;
    let ss_res = residuals.iter().fold(0.0, |acc, r| acc + r * r);
    let ss_tot = y.iter().fold(0.0, |acc, v| acc + (v - mean_y).powi(2));
    let r_squared_raw = if ss_tot.abs() < 1e-15 {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    };
    let df_model = k as f64;
    let df_resid = (t as f64 - df_model - 1.0).max(1.0);
    let r_squared = 1.0 - (1.0 - r_squared_raw) * (t as f64 - 1.0) / df_resid;

    let residual_vol_annual = crate::returns::population_std(&residuals) * 12f64.sqrt();

    let hac_standard_errors = hac_newey_west_se(&design, &xtx, &residuals)?;
    let vif = if k >= 1 {
        variance_inflation_factors(x)?
    } else {
        vec![]
    };

    Ok(RegressionResult {
        beta,
        alpha,
        r_squared,
        residual_vol_annual,
        hac_standard_errors,
        vif,
        condition_number,
        residuals,
    })
}

/// Newey-West lag length, `L = floor(4 * (T/100)^(2/9))`.
#[must_use]
pub fn newey_west_lag(t: usize) -> usize {
    (4.0 * (t as f64 / 100.0).powf(2.0 / 9.0)).floor() as usize
}

/// HAC (Newey-West) standard errors for OLS coefficients, aligned
/// `[beta..., alpha]` to match `design`'s column order (factor columns
/// then the intercept column).
///
/// # Errors
///
/// Returns `MathError::SingularDesign` if the sandwich estimator's
/// bread matrix (`(X'X)^-1`) cannot be formed.
fn hac_newey_west_se(
    design: &DMatrix<f64>,
    xtx_ridged: &DMatrix<f64>,
    residuals: &[f64],
) -> MathResult<Vec<f64>> {
    let t = design.nrows();
    let k1 = design.ncols();
    let bread = xtx_ridged
        .clone()
        .try_inverse()
        .ok_or_else(|| MathError::singular_design("(X'X)^-1 not invertible for HAC sandwich"))?;

    let lag = newey_west_lag(t);

    // Meat matrix: S = Gamma_0 + sum_{l=1}^{L} w_l (Gamma_l + Gamma_l')
    let mut meat = DMatrix::zeros(k1, k1);
    for row in 0..t {
        let x_row = design.row(row).transpose();
        let score = &x_row * residuals[row];
        meat += &score * score.transpose();
    }
    for l in 1..=lag {
        let weight = 1.0 - (l as f64) / (lag as f64 + 1.0);
        let mut gamma_l = DMatrix::zeros(k1, k1);
        for row in l..t {
            let x_t = design.row(row).transpose() * residuals[row];
            let x_tl = design.row(row - l).transpose() * residuals[row - l];
            gamma_l += &x_t * x_tl.transpose();
        }
        meat += (&gamma_l + gamma_l.transpose()) * weight;
    }

    let sandwich = &bread * &meat * &bread * t as f64;
    let standard_errors: Vec<f64> = (0..k1)
        .map(|i| sandwich[(i, i)].max(0.0).sqrt())
        .collect();
    Ok(standard_errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn synthetic(t: usize, true_beta: f64, true_alpha: f64) -> (Vec<f64>, DMatrix<f64>) {
        let mut x = DMatrix::zeros(t, 1);
        let mut y = vec![0.0; t];
        for row in 0..t {
            let factor_return = 0.01 * ((row as f64) - (t as f64) / 2.0) / (t as f64);
            x[(row, 0)] = factor_return;
            y[row] = true_alpha + true_beta * factor_return;
        }
        (y, x)
    }

    #[test]
    fn test_ols_fit_recovers_known_coefficients() {
        let (y, x) = synthetic(40, 1.2, 0.001);
        let result = ols_fit(&y, &x, 1e8).unwrap();
        assert_relative_eq!(result.beta[0], 1.2, epsilon = 1e-6);
        assert_relative_eq!(result.alpha, 0.001, epsilon = 1e-6);
        assert!(result.r_squared > 0.99);
    }

    #[test]
    fn test_ols_fit_insufficient_data() {
        let (y, x) = synthetic(4, 1.0, 0.0);
        assert!(matches!(
            ols_fit(&y, &x, 1e8),
            Err(MathError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_newey_west_lag_formula() {
        assert_eq!(newey_west_lag(100), 4);
        assert_eq!(newey_west_lag(0), 0);
    }

    #[test]
    fn test_ols_fit_singular_design_on_collinear_columns() {
        let t = 40;
        let mut x = DMatrix::zeros(t, 2);
        let mut y = vec![0.0; t];
        for row in 0..t {
            let f = 0.01 * ((row as f64) - (t as f64) / 2.0) / (t as f64);
            x[(row, 0)] = f;
            x[(row, 1)] = 2.0 * f; // exact collinearity
            y[row] = 1.0 * f;
        }
        assert!(matches!(
            ols_fit(&y, &x, 1e8),
            Err(MathError::SingularDesign { .. })
        ));
    }
}
