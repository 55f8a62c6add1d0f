//! Shared linear algebra helpers: ridging, sample covariance, rank and
//! condition-number diagnostics.
//!
//! Built on `nalgebra`, following the same dense `DMatrix`/`DVector`
//! style as the teacher's `linear_algebra` module. The tridiagonal and
//! LU routines that module ships are curve-fitting primitives this
//! engine has no use for; this module's routines are sized to what C3
//! (regression diagnostics), C4 (factor covariance), and C5 (position
//! covariance) actually need.

use nalgebra::{DMatrix, DVector};

use crate::error::{MathError, MathResult};

/// Adds a small ridge `lambda * I` to a square matrix, in place, to
/// guarantee invertibility before inversion (§4.5's numeric policy).
pub fn ridge_in_place(matrix: &mut DMatrix<f64>, lambda: f64) {
    let n = matrix.nrows().min(matrix.ncols());
    for i in 0..n {
        matrix[(i, i)] += lambda;
    }
}

/// Sample covariance matrix of `k` aligned columns (each a factor's
/// monthly return series), annualized by multiplying by 12.
///
/// `data` is `t` rows (months) by `k` columns (factors).
///
/// # Errors
///
/// Returns `MathError::InsufficientData` if `t < 2`.
pub fn annualized_sample_covariance(data: &DMatrix<f64>) -> MathResult<DMatrix<f64>> {
    let t = data.nrows();
    let k = data.ncols();
    if t < 2 {
        return Err(MathError::insufficient_data(2, t));
    }
    let means: Vec<f64> = (0..k)
        .map(|j| data.column(j).iter().fold(0.0, |acc, v| acc + v) / t as f64)
        .collect();

    let mut cov = DMatrix::zeros(k, k);
    for a in 0..k {
        for b in a..k {
            let sum: f64 = (0..t).fold(0.0, |acc, row| {
                acc + (data[(row, a)] - means[a]) * (data[(row, b)] - means[b])
            });
            let value = sum / (t - 1) as f64 * 12.0;
            cov[(a, b)] = value;
            cov[(b, a)] = value;
        }
    }
    Ok(cov)
}

/// Condition number of `X^T X` via singular values of `X`: `(sigma_max /
/// sigma_min)^2`. Returns `f64::INFINITY` if `X` has no columns or its
/// smallest singular value underflows to zero.
#[must_use]
pub fn design_condition_number(x: &DMatrix<f64>) -> f64 {
    let svd = x.clone().svd(false, false);
    let singular_values = svd.singular_values;
    if singular_values.is_empty() {
        return f64::INFINITY;
    }
    let max = singular_values.iter().cloned().fold(f64::MIN, f64::max);
    let min = singular_values.iter().cloned().fold(f64::MAX, f64::min);
    if min <= 0.0 {
        return f64::INFINITY;
    }
    (max / min).powi(2)
}

/// Numerical rank of `X` via the count of singular values above
/// `tolerance` (relative to the largest singular value).
#[must_use]
pub fn numerical_rank(x: &DMatrix<f64>, tolerance: f64) -> usize {
    let svd = x.clone().svd(false, false);
    let singular_values = svd.singular_values;
    let Some(max) = singular_values.iter().cloned().reduce(f64::max) else {
        return 0;
    };
    if max <= 0.0 {
        return 0;
    }
    singular_values.iter().filter(|s| **s / max > tolerance).count()
}

/// Variance inflation factor for each regressor column `j`: `1 / (1 -
/// R^2_j)`, where `R^2_j` comes from regressing column `j` on the
/// remaining columns.
///
/// # Errors
///
/// Returns `MathError::SingularDesign` if a regressor has zero variance
/// (VIF undefined).
pub fn variance_inflation_factors(x: &DMatrix<f64>) -> MathResult<Vec<f64>> {
    let k = x.ncols();
    let t = x.nrows();
    if k < 2 {
        return Ok(vec![1.0; k]);
    }
    let mut vifs = Vec::with_capacity(k);
    for j in 0..k {
        let y = x.column(j).clone_owned();
        let mut other_cols: Vec<usize> = (0..k).filter(|c| *c != j).collect();
        other_cols.sort_unstable();
        let mut design = DMatrix::zeros(t, other_cols.len() + 1);
        for (col_idx, &src_col) in other_cols.iter().enumerate() {
            design.set_column(col_idx, &x.column(src_col));
        }
        for row in 0..t {
            design[(row, other_cols.len())] = 1.0;
        }
        let r2 = ols_r_squared(&design, &y)?;
        if (1.0 - r2).abs() < 1e-12 {
            return Err(MathError::singular_design(format!(
                "regressor {j} is a perfect linear combination of the others"
            )));
        }
        vifs.push(1.0 / (1.0 - r2));
    }
    Ok(vifs)
}

fn ols_r_squared(x: &DMatrix<f64>, y: &DVector<f64>) -> MathResult<f64> {
    let xt = x.transpose();
    let mut xtx = &xt * x;
    ridge_in_place(&mut xtx, 1e-10);
    let xty = &xt * y;
    let beta = xtx
        .clone()
        .lu()
        .solve(&xty)
        .ok_or_else(|| MathError::singular_design("XtX not invertible in VIF auxiliary regression"))?;
    let fitted = x * beta;
    let residuals = y - &fitted;
    let mean_y = y.iter().fold(0.0, |acc, v| acc + v) / y.len() as f64;
    let ss_res = residuals.iter().fold(0.0, |acc, r| acc + r * r);
    let ss_tot = y.iter().fold(0.0, |acc, v| acc + (v - mean_y).powi(2));
    if ss_tot.abs() < 1e-15 {
        return Ok(0.0);
    }
    Ok(1.0 - ss_res / ss_tot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ridge_in_place() {
        let mut m = DMatrix::zeros(2, 2);
        ridge_in_place(&mut m, 1e-10);
        assert_relative_eq!(m[(0, 0)], 1e-10, epsilon = 1e-15);
        assert_relative_eq!(m[(1, 1)], 1e-10, epsilon = 1e-15);
    }

    #[test]
    fn test_annualized_sample_covariance() {
        let data = DMatrix::from_row_slice(3, 1, &[0.01, -0.01, 0.02]);
        let cov = annualized_sample_covariance(&data).unwrap();
        assert_eq!(cov.nrows(), 1);
        assert!(cov[(0, 0)] > 0.0);
    }

    #[test]
    fn test_condition_number_well_conditioned_identity() {
        let x = DMatrix::<f64>::identity(3, 3);
        let cond = design_condition_number(&x);
        assert_relative_eq!(cond, 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_numerical_rank_detects_collinearity() {
        // Column 2 is exactly 2x column 1: rank-deficient.
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0]);
        assert_eq!(numerical_rank(&x, 1e-9), 1);
    }
}
