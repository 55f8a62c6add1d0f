//! Return and volatility kernel (C2).

use riskcore_core::types::{Date, MonthlySeries};

use crate::error::{MathError, MathResult};

/// Computes simple monthly returns `r_t = P_t / P_{t-1} - 1` from a price
/// series. Output length is `len(series) - 1`.
///
/// # Errors
///
/// Returns `MathError::InsufficientData` if `series` has fewer than two
/// points.
pub fn monthly_returns(series: &MonthlySeries<f64>) -> MathResult<MonthlySeries<f64>> {
    let points = series.points();
    if points.len() < 2 {
        return Err(MathError::insufficient_data(2, points.len()));
    }
    let mut out = Vec::with_capacity(points.len() - 1);
    for window in points.windows(2) {
        let (_, prev_price) = window[0];
        let (date, price) = window[1];
        out.push((date, price / prev_price - 1.0));
    }
    MonthlySeries::new(out).map_err(|e| MathError::invalid_input(e.to_string()))
}

/// Population standard deviation of a return slice.
#[must_use]
pub fn population_std(returns: &[f64]) -> f64 {
    let n = returns.len() as f64;
    if returns.is_empty() {
        return 0.0;
    }
    let mean = returns.iter().fold(0.0, |acc, r| acc + r) / n;
    let variance = returns.iter().fold(0.0, |acc, r| acc + (r - mean).powi(2)) / n;
    variance.sqrt()
}

/// Annualized volatility: `std(returns) * sqrt(12)`.
///
/// # Errors
///
/// Returns `MathError::InsufficientData` if `returns` is a single sample
/// (a single observation has no dispersion).
pub fn volatility_annual(returns: &[f64]) -> MathResult<f64> {
    if returns.len() < 2 {
        return Err(MathError::insufficient_data(2, returns.len()));
    }
    Ok(population_std(returns) * 12f64.sqrt())
}

/// Rolling population volatility over a trailing window, aligned to the
/// window's last month.
///
/// # Errors
///
/// Returns `MathError::InvalidInput` if `window < 2` or
/// `window > returns.len()`.
pub fn rolling_volatility(
    returns: &MonthlySeries<f64>,
    window: usize,
) -> MathResult<MonthlySeries<f64>> {
    let points = returns.points();
    if window < 2 || window > points.len() {
        return Err(MathError::invalid_input(format!(
            "window must be in [2, {}], got {window}",
            points.len()
        )));
    }
    let mut out = Vec::with_capacity(points.len() - window + 1);
    for trailing in points.windows(window) {
        let values: Vec<f64> = trailing.iter().map(|(_, v)| *v).collect();
        let (date, _) = trailing[trailing.len() - 1];
        out.push((date, population_std(&values)));
    }
    MonthlySeries::new(out).map_err(|e| MathError::invalid_input(e.to_string()))
}

/// Extracts the raw value slice from a `MonthlySeries<f64>`, in date
/// order, for kernels that only need the numeric vector.
#[must_use]
pub fn values_only(series: &MonthlySeries<f64>) -> Vec<f64> {
    series.points().iter().map(|(_, v)| *v).collect()
}

/// Extracts the date slice from a `MonthlySeries<f64>`.
#[must_use]
pub fn dates_only(series: &MonthlySeries<f64>) -> Vec<Date> {
    series.points().iter().map(|(d, _)| *d).collect()
}

/// Compound annual growth rate between two level observations
/// `years` apart: `(end / start)^(1 / years) - 1`.
///
/// # Errors
///
/// Returns `MathError::InvalidInput` if `start <= 0.0` or `years <= 0.0`.
pub fn cagr(start: f64, end: f64, years: f64) -> MathResult<f64> {
    if start <= 0.0 {
        return Err(MathError::invalid_input(format!("cagr start value must be positive, got {start}")));
    }
    if years <= 0.0 {
        return Err(MathError::invalid_input(format!("cagr years must be positive, got {years}")));
    }
    Ok((end / start).powf(1.0 / years) - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[(i32, u32, u32, f64)]) -> MonthlySeries<f64> {
        let points = values
            .iter()
            .map(|(y, m, d, v)| (Date::from_ymd(*y, *m, *d).unwrap(), *v))
            .collect();
        MonthlySeries::new(points).unwrap()
    }

    #[test]
    fn test_monthly_returns_simple() {
        let prices = series(&[
            (2024, 1, 31, 100.0),
            (2024, 2, 29, 110.0),
            (2024, 3, 31, 99.0),
        ]);
        let returns = monthly_returns(&prices).unwrap();
        assert_eq!(returns.len(), 2);
        let values = values_only(&returns);
        assert!((values[0] - 0.10).abs() < 1e-12);
        assert!((values[1] - (-0.1)).abs() < 1e-12);
    }

    #[test]
    fn test_monthly_returns_single_sample_fails() {
        let prices = series(&[(2024, 1, 31, 100.0)]);
        assert!(monthly_returns(&prices).is_err());
    }

    #[test]
    fn test_volatility_annual() {
        let returns = vec![0.01, -0.01, 0.02, -0.02];
        let vol = volatility_annual(&returns).unwrap();
        let expected = population_std(&returns) * 12f64.sqrt();
        assert!((vol - expected).abs() < 1e-12);
    }

    #[test]
    fn test_cagr_doubles_over_ten_years() {
        let rate = cagr(100.0, 200.0, 10.0).unwrap();
        assert!((rate - (2f64.powf(0.1) - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_cagr_rejects_nonpositive_start() {
        assert!(cagr(0.0, 100.0, 10.0).is_err());
    }

    #[test]
    fn test_rolling_volatility_window_bounds() {
        let returns = series(&[
            (2024, 1, 31, 0.01),
            (2024, 2, 29, -0.01),
            (2024, 3, 31, 0.02),
        ]);
        assert!(rolling_volatility(&returns, 1).is_err());
        assert!(rolling_volatility(&returns, 4).is_err());
        let rolled = rolling_volatility(&returns, 2).unwrap();
        assert_eq!(rolled.len(), 2);
    }
}
