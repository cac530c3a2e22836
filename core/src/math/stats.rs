pub struct StatsHelper;

impl StatsHelper {
    /// Largest value, or `0.0` for an empty slice.
    pub fn max(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Arithmetic mean, or `0.0` for an empty slice.
    pub fn mean(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f64>() / samples.len() as f64
    }

    /// Last value, or `0.0` for an empty slice.
    pub fn last(samples: &[f64]) -> f64 {
        samples.last().copied().unwrap_or(0.0)
    }

    /// Median of an odd or even window; `0.0` when empty.
    pub fn median(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 1 {
            sorted[mid]
        } else {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        }
    }

    pub fn round_to(value: f64, decimals: i32) -> f64 {
        let scale = 10f64.powi(decimals);
        (value * scale).round() / scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sequences_yield_zero() {
        assert_eq!(StatsHelper::max(&[]), 0.0);
        assert_eq!(StatsHelper::mean(&[]), 0.0);
        assert_eq!(StatsHelper::last(&[]), 0.0);
        assert_eq!(StatsHelper::median(&[]), 0.0);
    }

    #[test]
    fn summary_values_match_hand_computation() {
        let values = [3.0, -1.0, 7.0, 5.0];
        assert_eq!(StatsHelper::max(&values), 7.0);
        assert_eq!(StatsHelper::mean(&values), 3.5);
        assert_eq!(StatsHelper::last(&values), 5.0);
        assert_eq!(StatsHelper::median(&[9.0, 1.0, 4.0]), 4.0);
    }

    #[test]
    fn round_to_two_decimals() {
        assert_eq!(StatsHelper::round_to(12.3456, 2), 12.35);
        assert_eq!(StatsHelper::round_to(-0.004, 2), 0.0);
    }
}
