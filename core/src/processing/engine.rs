use std::sync::Arc;

use crate::ingest::RawRun;
use crate::prelude::FilterResult;
use crate::processing::cache::CacheSource;
use crate::processing::config::FilterConfig;
use crate::processing::derived::DerivedQuantities;
use crate::processing::iir::TransferFunction;
use crate::processing::smoothing;
use crate::processing::StageError;

/// km/h → m/s.
pub const KMH_TO_MS: f64 = 5.0 / 18.0;
/// m/s → km/h.
pub const MS_TO_KMH: f64 = 18.0 / 5.0;

/// Filtered signals and derived quantities for one run under one filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredRun {
    pub config: FilterConfig,
    pub rpm_filtered: Vec<f64>,
    pub speed_filtered_ms: Vec<f64>,
    pub speed_filtered_kmh: Vec<f64>,
    pub acceleration_ms2: Vec<f64>,
    pub jerk_ms3: Vec<f64>,
    pub distance_m: Vec<f64>,
}

impl FilteredRun {
    pub fn len(&self) -> usize {
        self.rpm_filtered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rpm_filtered.is_empty()
    }
}

/// Result of a filter request that did not hit a hard error.
#[derive(Debug, Clone)]
pub enum FilterOutcome {
    Ready(Arc<FilteredRun>),
    /// The run is too short for the requested filter; nothing was cached and
    /// callers keep whatever they were showing before.
    InsufficientSamples { required: usize, available: usize },
}

impl FilterOutcome {
    pub fn ready(&self) -> Option<&Arc<FilteredRun>> {
        match self {
            FilterOutcome::Ready(run) => Some(run),
            FilterOutcome::InsufficientSamples { .. } => None,
        }
    }

    pub fn into_ready(self) -> Option<Arc<FilteredRun>> {
        match self {
            FilterOutcome::Ready(run) => Some(run),
            FilterOutcome::InsufficientSamples { .. } => None,
        }
    }
}

/// Filter `run` with `config`, serving repeated requests from the run's cache.
pub fn apply_filter(run: &RawRun, config: &FilterConfig) -> FilterResult<FilterOutcome> {
    let key = config.key();
    let logger = run.logger();
    let result = run
        .cache()
        .get_or_try_insert_with(key.clone(), || {
            run.metrics().record_computation();
            compute_filtered(run, config)
        });

    match result {
        Ok((filtered, CacheSource::Hit)) => {
            run.metrics().record_cache_hit();
            logger.detail(&format!("{}: cache hit for {}", run.name(), key));
            Ok(FilterOutcome::Ready(filtered))
        }
        Ok((filtered, CacheSource::Computed)) => {
            logger.detail(&format!(
                "{}: computed {} over {} samples",
                run.name(),
                key,
                filtered.len()
            ));
            Ok(FilterOutcome::Ready(filtered))
        }
        Err(StageError::InsufficientSamples {
            required,
            available,
        }) => {
            run.metrics().record_skipped();
            logger.detail(&format!(
                "{}: {} needs {} samples, run has {}",
                run.name(),
                key,
                required,
                available
            ));
            Ok(FilterOutcome::InsufficientSamples {
                required,
                available,
            })
        }
        Err(StageError::Filter(err)) => {
            run.metrics().record_error();
            logger.warn(&format!("{}: {} failed: {}", run.name(), key, err));
            Err(err)
        }
    }
}

/// Uncached computation of a [`FilteredRun`].
pub fn compute_filtered(run: &RawRun, config: &FilterConfig) -> Result<FilteredRun, StageError> {
    // Invalid parameters are reported even when the run is too short to filter.
    config.validate()?;
    if run.is_empty() {
        return Err(StageError::InsufficientSamples {
            required: 1,
            available: 0,
        });
    }

    let rpm = run.rpm_raw();
    let speed_ms: Vec<f64> = run.speed_kmh_raw().iter().map(|v| v * KMH_TO_MS).collect();

    let (rpm_filtered, speed_filtered_ms) = match *config {
        FilterConfig::Butterworth { order, cutoff } => {
            zero_phase(&TransferFunction::butterworth(order, cutoff)?, rpm, &speed_ms)?
        }
        FilterConfig::ChebyshevTypeI {
            order,
            ripple_db,
            cutoff,
        } => zero_phase(
            &TransferFunction::chebyshev1(order, ripple_db, cutoff)?,
            rpm,
            &speed_ms,
        )?,
        FilterConfig::Bessel { order, cutoff } => {
            zero_phase(&TransferFunction::bessel(order, cutoff)?, rpm, &speed_ms)?
        }
        FilterConfig::SavitzkyGolay { window, polyorder } => (
            smoothing::savitzky_golay(rpm, window, polyorder)?,
            smoothing::savitzky_golay(&speed_ms, window, polyorder)?,
        ),
        FilterConfig::Median { kernel } => (
            smoothing::median(rpm, kernel)?,
            smoothing::median(&speed_ms, kernel)?,
        ),
        FilterConfig::MovingAverage { window } => (
            smoothing::moving_average(rpm, window)?,
            smoothing::moving_average(&speed_ms, window)?,
        ),
    };

    let speed_filtered_kmh = speed_filtered_ms.iter().map(|v| v * MS_TO_KMH).collect();
    let derived = DerivedQuantities::compute(run.time_s(), &speed_filtered_ms)?;

    Ok(FilteredRun {
        config: config.clone(),
        rpm_filtered,
        speed_filtered_ms,
        speed_filtered_kmh,
        acceleration_ms2: derived.acceleration_ms2,
        jerk_ms3: derived.jerk_ms3,
        distance_m: derived.distance_m,
    })
}

fn zero_phase(
    tf: &TransferFunction,
    rpm: &[f64],
    speed_ms: &[f64],
) -> Result<(Vec<f64>, Vec<f64>), StageError> {
    Ok((tf.filtfilt(rpm)?, tf.filtfilt(speed_ms)?))
}
