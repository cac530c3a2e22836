//! Numerical differentiation and integration over sampled signals.

pub struct CalculusHelper;

impl CalculusHelper {
    /// Second-order accurate gradient of `values` with respect to `coords`.
    ///
    /// Interior points use central differences that account for uneven
    /// spacing; both ends use one-sided second-order differences. Returns
    /// `None` when fewer than three samples are available or the slices
    /// differ in length.
    pub fn gradient(values: &[f64], coords: &[f64]) -> Option<Vec<f64>> {
        let n = values.len();
        if n < 3 || coords.len() != n {
            return None;
        }

        let mut out = vec![0.0; n];

        for i in 1..n - 1 {
            let dx1 = coords[i] - coords[i - 1];
            let dx2 = coords[i + 1] - coords[i];
            let a = -dx2 / (dx1 * (dx1 + dx2));
            let b = (dx2 - dx1) / (dx1 * dx2);
            let c = dx1 / (dx2 * (dx1 + dx2));
            out[i] = a * values[i - 1] + b * values[i] + c * values[i + 1];
        }

        let dx1 = coords[1] - coords[0];
        let dx2 = coords[2] - coords[1];
        let a = -(2.0 * dx1 + dx2) / (dx1 * (dx1 + dx2));
        let b = (dx1 + dx2) / (dx1 * dx2);
        let c = -dx1 / (dx2 * (dx1 + dx2));
        out[0] = a * values[0] + b * values[1] + c * values[2];

        let dx1 = coords[n - 2] - coords[n - 3];
        let dx2 = coords[n - 1] - coords[n - 2];
        let a = dx2 / (dx1 * (dx1 + dx2));
        let b = -(dx2 + dx1) / (dx1 * dx2);
        let c = (2.0 * dx2 + dx1) / (dx2 * (dx1 + dx2));
        out[n - 1] = a * values[n - 3] + b * values[n - 2] + c * values[n - 1];

        Some(out)
    }

    /// Left-edge rectangular running integral: `sum(values[i] * (t[i] - t[i-1]))`
    /// with the first sample contributing nothing.
    pub fn cumulative_integral(values: &[f64], coords: &[f64]) -> Vec<f64> {
        let mut total = 0.0;
        values
            .iter()
            .zip(coords.iter())
            .enumerate()
            .map(|(i, (&value, &t))| {
                let dt = if i == 0 { 0.0 } else { t - coords[i - 1] };
                total += value * dt;
                total
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline(n: usize, step: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * step).collect()
    }

    #[test]
    fn gradient_is_exact_for_quadratics() {
        let t = timeline(8, 0.05);
        let values: Vec<f64> = t.iter().map(|&x| 3.0 * x * x - 2.0 * x + 1.0).collect();
        let grad = CalculusHelper::gradient(&values, &t).unwrap();
        for (g, &x) in grad.iter().zip(t.iter()) {
            assert!((g - (6.0 * x - 2.0)).abs() < 1e-9, "{} vs {}", g, 6.0 * x - 2.0);
        }
    }

    #[test]
    fn gradient_handles_uneven_spacing() {
        let t = vec![0.0, 0.1, 0.3, 0.35, 0.6];
        let values: Vec<f64> = t.iter().map(|&x| x * x).collect();
        let grad = CalculusHelper::gradient(&values, &t).unwrap();
        for (g, &x) in grad.iter().zip(t.iter()) {
            assert!((g - 2.0 * x).abs() < 1e-9);
        }
    }

    #[test]
    fn gradient_needs_three_samples() {
        assert!(CalculusHelper::gradient(&[1.0, 2.0], &[0.0, 1.0]).is_none());
        assert!(CalculusHelper::gradient(&[1.0, 2.0, 3.0], &[0.0, 1.0]).is_none());
    }

    #[test]
    fn cumulative_integral_skips_first_sample() {
        let t = timeline(4, 0.5);
        let distance = CalculusHelper::cumulative_integral(&[10.0, 2.0, 2.0, 4.0], &t);
        assert_eq!(distance, vec![0.0, 1.0, 2.0, 4.0]);
    }
}
