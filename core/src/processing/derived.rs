use crate::math::CalculusHelper;
use crate::processing::iir::TransferFunction;
use crate::processing::StageError;

/// Order of the fixed low-pass that conditions the differentiated speed.
pub const ACCEL_SMOOTHING_ORDER: usize = 4;
/// Normalized cutoff of the fixed acceleration low-pass.
pub const ACCEL_SMOOTHING_CUTOFF: f64 = 0.1;

/// Time-domain quantities derived from a filtered speed trace.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedQuantities {
    pub acceleration_ms2: Vec<f64>,
    pub jerk_ms3: Vec<f64>,
    pub distance_m: Vec<f64>,
}

impl DerivedQuantities {
    /// Differentiate and integrate `speed_ms` over `time_s`.
    ///
    /// Acceleration always passes through a zero-phase Butterworth
    /// (order 4, cutoff 0.1) regardless of the filter chosen for speed.
    pub fn compute(time_s: &[f64], speed_ms: &[f64]) -> Result<Self, StageError> {
        let smoother = TransferFunction::butterworth(ACCEL_SMOOTHING_ORDER, ACCEL_SMOOTHING_CUTOFF)?;
        let required = Self::min_samples_for(&smoother);
        if speed_ms.len() < required || time_s.len() != speed_ms.len() {
            return Err(StageError::InsufficientSamples {
                required,
                available: speed_ms.len().min(time_s.len()),
            });
        }

        let raw_acceleration =
            CalculusHelper::gradient(speed_ms, time_s).ok_or(StageError::InsufficientSamples {
                required,
                available: speed_ms.len(),
            })?;
        let acceleration_ms2 = smoother.filtfilt(&raw_acceleration)?;
        let jerk_ms3 =
            CalculusHelper::gradient(&acceleration_ms2, time_s).ok_or(StageError::InsufficientSamples {
                required,
                available: speed_ms.len(),
            })?;
        let distance_m = CalculusHelper::cumulative_integral(speed_ms, time_s);

        Ok(Self {
            acceleration_ms2,
            jerk_ms3,
            distance_m,
        })
    }

    /// Shortest speed trace [`Self::compute`] accepts.
    pub fn min_samples() -> usize {
        TransferFunction::butterworth(ACCEL_SMOOTHING_ORDER, ACCEL_SMOOTHING_CUTOFF)
            .map(|tf| Self::min_samples_for(&tf))
            .unwrap_or(3)
    }

    fn min_samples_for(smoother: &TransferFunction) -> usize {
        smoother.min_samples().max(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline(n: usize) -> Vec<f64> {
        (0..n).map(|i| 0.05 * i as f64).collect()
    }

    #[test]
    fn constant_speed_has_no_acceleration() {
        let t = timeline(40);
        let speed = vec![10.0; 40];
        let derived = DerivedQuantities::compute(&t, &speed).unwrap();
        assert!(derived.acceleration_ms2.iter().all(|a| a.abs() < 1e-9));
        assert!(derived.jerk_ms3.iter().all(|j| j.abs() < 1e-6));
        assert_eq!(derived.distance_m[0], 0.0);
        assert!((derived.distance_m[39] - 10.0 * 0.05 * 39.0).abs() < 1e-9);
    }

    #[test]
    fn distance_is_monotonic_for_non_negative_speed() {
        let t = timeline(64);
        let speed: Vec<f64> = (0..64)
            .map(|i| ((i as f64) * 0.3).sin().abs() * 12.0)
            .collect();
        let derived = DerivedQuantities::compute(&t, &speed).unwrap();
        assert_eq!(derived.distance_m[0], 0.0);
        assert!(derived.distance_m.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(derived.acceleration_ms2.len(), 64);
        assert_eq!(derived.jerk_ms3.len(), 64);
    }

    #[test]
    fn short_traces_are_reported_as_insufficient() {
        assert_eq!(DerivedQuantities::min_samples(), 16);
        let t = timeline(10);
        let result = DerivedQuantities::compute(&t, &[1.0; 10]);
        assert!(matches!(
            result,
            Err(StageError::InsufficientSamples {
                required: 16,
                available: 10
            })
        ));
    }
}
