//! Single-pass smoothing filters: Savitzky-Golay, median and moving average.
//!
//! None of these run forward-backward. Savitzky-Golay and the median use a
//! centred window, so they introduce no lag; the moving average follows
//! "same"-length convolution semantics.

use ndarray::{Array1, Array2};

use crate::math::{MatrixHelper, StatsHelper};
use crate::prelude::FilterError;
use crate::processing::StageError;

/// Smoothing coefficients of a centred Savitzky-Golay window.
///
/// Minimum-norm least-squares solution of `A h = e0`, where
/// `A[k][j] = (j - m)^k` for `k` up to `polyorder`.
pub fn savgol_coefficients(window: usize, polyorder: usize) -> Result<Vec<f64>, FilterError> {
    if window == 0 || window % 2 == 0 {
        return Err(FilterError::InvalidParameter(format!(
            "savgol_window must be a positive odd integer, got {}",
            window
        )));
    }
    if polyorder >= window {
        return Err(FilterError::InvalidParameter(format!(
            "polyorder {} must be less than window length {}",
            polyorder, window
        )));
    }

    let half = (window / 2) as f64;
    let terms = polyorder + 1;
    let mut vandermonde = Array2::<f64>::zeros((terms, window));
    for j in 0..window {
        let x = j as f64 - half;
        let mut power = 1.0;
        for k in 0..terms {
            vandermonde[[k, j]] = power;
            power *= x;
        }
    }

    let gram = MatrixHelper::multiply(vandermonde.view(), vandermonde.t());
    let mut unit = Array1::<f64>::zeros(terms);
    unit[0] = 1.0;
    let weights = MatrixHelper::solve(gram.view(), unit.view())
        .ok_or_else(|| FilterError::Design("singular Savitzky-Golay system".into()))?;

    Ok(vandermonde.t().dot(&weights).to_vec())
}

/// Savitzky-Golay smoothing. Samples within half a window of either end are
/// taken from a polynomial fitted to the first/last full window.
pub fn savitzky_golay(
    signal: &[f64],
    window: usize,
    polyorder: usize,
) -> Result<Vec<f64>, StageError> {
    let coeffs = savgol_coefficients(window, polyorder)?;
    let n = signal.len();
    if n <= window {
        return Err(StageError::InsufficientSamples {
            required: window + 1,
            available: n,
        });
    }

    let half = window / 2;
    let mut output = vec![0.0; n];
    for i in half..n - half {
        output[i] = coeffs
            .iter()
            .zip(&signal[i - half..=i + half])
            .map(|(c, x)| c * x)
            .sum();
    }

    let head = fit_window(&signal[..window], polyorder)?;
    for i in 0..half {
        output[i] = evaluate(&head, i as f64 - half as f64);
    }

    let tail = fit_window(&signal[n - window..], polyorder)?;
    for i in 0..half {
        let pos = window - half + i;
        output[n - half + i] = evaluate(&tail, pos as f64 - half as f64);
    }

    Ok(output)
}

/// Polynomial coefficients (ascending powers of `j - m`) fitted to one window.
fn fit_window(samples: &[f64], polyorder: usize) -> Result<Vec<f64>, FilterError> {
    let half = (samples.len() / 2) as f64;
    let terms = polyorder + 1;
    let mut design = Array2::<f64>::zeros((samples.len(), terms));
    for (j, mut row) in design.rows_mut().into_iter().enumerate() {
        let x = j as f64 - half;
        let mut power = 1.0;
        for k in 0..terms {
            row[k] = power;
            power *= x;
        }
    }
    let y = Array1::from(samples.to_vec());
    MatrixHelper::least_squares(design.view(), y.view())
        .map(|c| c.to_vec())
        .ok_or_else(|| FilterError::Design("singular edge polynomial fit".into()))
}

fn evaluate(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Sliding median with zero padding beyond both ends.
pub fn median(signal: &[f64], kernel: usize) -> Result<Vec<f64>, StageError> {
    if kernel == 0 || kernel % 2 == 0 {
        return Err(FilterError::InvalidParameter(format!(
            "median_kernel must be a positive odd integer, got {}",
            kernel
        ))
        .into());
    }

    let half = kernel / 2;
    let n = signal.len();
    let mut window = Vec::with_capacity(kernel);
    let output = (0..n)
        .map(|i| {
            window.clear();
            for offset in 0..kernel {
                let idx = i as isize + offset as isize - half as isize;
                let value = if idx >= 0 && (idx as usize) < n {
                    signal[idx as usize]
                } else {
                    0.0
                };
                window.push(value);
            }
            StatsHelper::median(&window)
        })
        .collect();
    Ok(output)
}

/// Boxcar average with "same" output length, centred at `(window - 1) / 2`.
pub fn moving_average(signal: &[f64], window: usize) -> Result<Vec<f64>, StageError> {
    if window == 0 {
        return Err(
            FilterError::InvalidParameter("moving_avg_window must be at least 1".into()).into(),
        );
    }

    let n = signal.len();
    let offset = (window - 1) / 2;
    let scale = 1.0 / window as f64;
    let output = (0..n)
        .map(|i| {
            // Full convolution index k = i + offset covers signal[k - window + 1..=k].
            let k = i + offset;
            let start = (k + 1).saturating_sub(window);
            let end = k.min(n - 1);
            signal[start..=end].iter().map(|x| x * scale).sum()
        })
        .collect();
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < tol, "{:?} vs {:?}", actual, expected);
        }
    }

    #[test]
    fn savgol_coefficients_match_published_table() {
        let coeffs = savgol_coefficients(5, 2).unwrap();
        let expected: Vec<f64> = [-3.0, 12.0, 17.0, 12.0, -3.0]
            .iter()
            .map(|v| v / 35.0)
            .collect();
        assert_close(&coeffs, &expected, 1e-12);
    }

    #[test]
    fn savgol_reproduces_polynomials_up_to_its_order() {
        let signal: Vec<f64> = (0..30)
            .map(|i| {
                let x = i as f64 * 0.1;
                2.0 * x * x - x + 4.0
            })
            .collect();
        let smoothed = savitzky_golay(&signal, 11, 2).unwrap();
        assert_close(&smoothed, &signal, 1e-9);
    }

    #[test]
    fn savgol_reports_short_signals() {
        let result = savitzky_golay(&[1.0, 2.0, 3.0, 4.0, 5.0], 11, 2);
        assert!(matches!(
            result,
            Err(StageError::InsufficientSamples {
                required: 12,
                available: 5
            })
        ));
        assert!(matches!(
            savitzky_golay(&[0.0; 11], 11, 2),
            Err(StageError::InsufficientSamples { .. })
        ));
    }

    #[test]
    fn median_pads_with_zeros() {
        let filtered = median(&[5.0, 1.0, 9.0, 3.0, 7.0], 3).unwrap();
        assert_eq!(filtered, vec![1.0, 5.0, 3.0, 7.0, 3.0]);
    }

    #[test]
    fn median_rejects_even_kernel() {
        assert!(matches!(
            median(&[1.0, 2.0, 3.0], 4),
            Err(StageError::Filter(FilterError::InvalidParameter(_)))
        ));
    }

    #[test]
    fn moving_average_matches_same_convolution() {
        let filtered = moving_average(&[3.0, 6.0, 9.0, 12.0], 3).unwrap();
        assert_close(&filtered, &[3.0, 6.0, 9.0, 7.0], 1e-12);

        let even = moving_average(&[4.0, 8.0, 12.0, 16.0], 2).unwrap();
        assert_close(&even, &[2.0, 6.0, 10.0, 14.0], 1e-12);
    }
}
