use serde::Serialize;

use crate::ingest::RawRun;
use crate::math::StatsHelper;
use crate::processing::{FilterConfig, FilterOutcome, FilteredRun};
use crate::telemetry::LogManager;

/// Decimal places kept in metrics and variations.
pub const REPORT_DECIMALS: i32 = 2;
/// Stand-in for a zero baseline metric.
pub const ZERO_BASELINE: f64 = 1e-9;

/// Column headers of the metrics and variation tables.
pub const METRIC_LABELS: [&str; 6] = [
    "Max speed (km/h)",
    "Mean speed (km/h)",
    "Max RPM",
    "Mean RPM",
    "Max acceleration (m/s²)",
    "Total distance (m)",
];

/// Summary metrics of one filtered run, rounded to [`REPORT_DECIMALS`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatistics {
    pub name: String,
    pub max_speed_kmh: f64,
    pub mean_speed_kmh: f64,
    pub max_rpm: f64,
    pub mean_rpm: f64,
    pub max_acceleration_ms2: f64,
    pub total_distance_m: f64,
}

impl RunStatistics {
    pub fn values(&self) -> [f64; 6] {
        [
            self.max_speed_kmh,
            self.mean_speed_kmh,
            self.max_rpm,
            self.mean_rpm,
            self.max_acceleration_ms2,
            self.total_distance_m,
        ]
    }

    fn from_values(name: String, values: [f64; 6]) -> Self {
        let [max_speed_kmh, mean_speed_kmh, max_rpm, mean_rpm, max_acceleration_ms2, total_distance_m] =
            values;
        Self {
            name,
            max_speed_kmh,
            mean_speed_kmh,
            max_rpm,
            mean_rpm,
            max_acceleration_ms2,
            total_distance_m,
        }
    }
}

/// Percentage change of each metric against the baseline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunVariation {
    pub name: String,
    pub max_speed_pct: f64,
    pub mean_speed_pct: f64,
    pub max_rpm_pct: f64,
    pub mean_rpm_pct: f64,
    pub max_acceleration_pct: f64,
    pub total_distance_pct: f64,
}

impl RunVariation {
    pub fn values(&self) -> [f64; 6] {
        [
            self.max_speed_pct,
            self.mean_speed_pct,
            self.max_rpm_pct,
            self.mean_rpm_pct,
            self.max_acceleration_pct,
            self.total_distance_pct,
        ]
    }
}

/// Per-run metrics; empty series contribute `0`.
pub fn statistics(filtered: &FilteredRun, name: &str) -> RunStatistics {
    let values = [
        StatsHelper::max(&filtered.speed_filtered_kmh),
        StatsHelper::mean(&filtered.speed_filtered_kmh),
        StatsHelper::max(&filtered.rpm_filtered),
        StatsHelper::mean(&filtered.rpm_filtered),
        StatsHelper::max(&filtered.acceleration_ms2),
        StatsHelper::last(&filtered.distance_m),
    ]
    .map(|v| StatsHelper::round_to(v, REPORT_DECIMALS));
    RunStatistics::from_values(name.to_string(), values)
}

/// Variations of every run after the first, relative to the first.
pub fn variations(stats: &[RunStatistics]) -> Vec<RunVariation> {
    let Some((baseline, rest)) = stats.split_first() else {
        return Vec::new();
    };
    let base = baseline
        .values()
        .map(|v| if v == 0.0 { ZERO_BASELINE } else { v });

    rest.iter()
        .map(|run| {
            let current = run.values();
            let pct: [f64; 6] = std::array::from_fn(|i| {
                StatsHelper::round_to((current[i] - base[i]) / base[i] * 100.0, REPORT_DECIMALS)
            });
            RunVariation {
                name: run.name.clone(),
                max_speed_pct: pct[0],
                mean_speed_pct: pct[1],
                max_rpm_pct: pct[2],
                mean_rpm_pct: pct[3],
                max_acceleration_pct: pct[4],
                total_distance_pct: pct[5],
            }
        })
        .collect()
}

/// A run whose filter request failed outright.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunFailure {
    pub name: String,
    pub message: String,
}

/// Metrics and variations for a set of runs under one filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatisticsReport {
    pub metrics: Vec<RunStatistics>,
    pub variations: Vec<RunVariation>,
    /// Runs too short for the filter. Each still holds an all-zero row in
    /// `metrics` so the first run stays the baseline.
    pub skipped: Vec<String>,
    pub errors: Vec<RunFailure>,
}

/// Filter every run with `config` and tabulate the results. A failing run
/// never aborts its siblings.
pub fn generate_statistics(runs: &[RawRun], config: &FilterConfig) -> StatisticsReport {
    let logger = LogManager::new("statistics");
    let mut report = StatisticsReport::default();

    for run in runs {
        match run.apply_filter(config) {
            Ok(FilterOutcome::Ready(filtered)) => {
                report.metrics.push(statistics(&filtered, run.name()));
            }
            Ok(FilterOutcome::InsufficientSamples {
                required,
                available,
            }) => {
                logger.warn(&format!(
                    "{} skipped: {} needs {} samples, run has {}",
                    run.name(),
                    config,
                    required,
                    available
                ));
                report
                    .metrics
                    .push(RunStatistics::from_values(run.name().to_string(), [0.0; 6]));
                report.skipped.push(run.name().to_string());
            }
            Err(err) => {
                logger.warn(&format!("{} failed: {}", run.name(), err));
                report.errors.push(RunFailure {
                    name: run.name().to_string(),
                    message: err.to_string(),
                });
            }
        }
    }

    report.variations = variations(&report.metrics);
    logger.record(&format!(
        "{} runs tabulated with {}, {} of them skipped, {} failed",
        report.metrics.len(),
        config,
        report.skipped.len(),
        report.errors.len()
    ));
    report
}
