use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use crate::ingest::table::RunTable;
use crate::prelude::{DecodeError, DecodeResult, FilterResult};
use crate::processing::{apply_filter, FilterCache, FilterConfig, FilterOutcome};
use crate::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};

/// Logger rows summed into one output sample.
pub const DECIMATION: usize = 10;
/// Spacing of decimated samples in seconds.
pub const SAMPLE_STEP_S: f64 = 0.05;
/// RPM per summed `f2` pulse.
pub const RPM_PER_PULSE: f64 = 1200.0;

/// Wheel geometry used to turn disc-hole pulses into road speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConstants {
    pub wheel_radius_m: f64,
    pub disc_holes: u32,
}

impl Default for VehicleConstants {
    fn default() -> Self {
        Self {
            wheel_radius_m: 0.29,
            disc_holes: 12,
        }
    }
}

impl VehicleConstants {
    /// km/h per summed `f1` pulse.
    pub fn speed_factor(&self) -> f64 {
        (2.0 * self.wheel_radius_m * PI * 20.0 * 3.6) / self.disc_holes as f64
    }

    fn validate(&self) -> DecodeResult<()> {
        if self.disc_holes == 0 || !(self.wheel_radius_m.is_finite() && self.wheel_radius_m > 0.0) {
            return Err(DecodeError::DataFormat(format!(
                "invalid vehicle constants: radius {} m, {} disc holes",
                self.wheel_radius_m, self.disc_holes
            )));
        }
        Ok(())
    }
}

/// Decode a table under a generic display name.
pub fn decode(table: &RunTable, constants: &VehicleConstants) -> DecodeResult<RawRun> {
    RawRun::decode("run", table, constants)
}

/// One decoded logger session plus its filter cache.
///
/// The raw arrays never change after decoding; filtered views are memoized
/// per filter configuration.
#[derive(Debug)]
pub struct RawRun {
    name: String,
    path: Option<PathBuf>,
    time_s: Vec<f64>,
    rpm_raw: Vec<f64>,
    speed_kmh_raw: Vec<f64>,
    table: RunTable,
    cache: FilterCache,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl RawRun {
    /// Read and decode a logger CSV. The display name is the file name.
    pub fn load(path: impl AsRef<Path>, constants: &VehicleConstants) -> DecodeResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DecodeError::FileNotFound(path.to_path_buf()));
        }
        let table = RunTable::from_csv_path(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let mut run = Self::decode(name, &table, constants)?;
        run.path = Some(path.to_path_buf());
        Ok(run)
    }

    /// Sum every [`DECIMATION`] rows of `f1`/`f2` into speed and RPM samples.
    /// Trailing rows that do not fill a group are dropped.
    pub fn decode(
        name: impl Into<String>,
        table: &RunTable,
        constants: &VehicleConstants,
    ) -> DecodeResult<Self> {
        constants.validate()?;
        let f1 = table.require("f1")?;
        let f2 = table.require("f2")?;
        let factor = constants.speed_factor();

        let samples = table.row_count() / DECIMATION;
        let group_sums = |column: &[f64]| -> Vec<f64> {
            column
                .chunks_exact(DECIMATION)
                .take(samples)
                .map(|group| group.iter().sum())
                .collect()
        };

        let time_s = (0..samples).map(|i| i as f64 * SAMPLE_STEP_S).collect();
        let rpm_raw = group_sums(f2).into_iter().map(|s| s * RPM_PER_PULSE).collect();
        let speed_kmh_raw = group_sums(f1).into_iter().map(|s| s * factor).collect();

        let run = Self {
            name: name.into(),
            path: None,
            time_s,
            rpm_raw,
            speed_kmh_raw,
            table: table.clone(),
            cache: FilterCache::new(),
            metrics: MetricsRecorder::new(),
            logger: LogManager::new("decoder"),
        };
        run.logger.detail(&format!(
            "{}: {} rows decoded into {} samples",
            run.name,
            table.row_count(),
            samples
        ));
        Ok(run)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn time_s(&self) -> &[f64] {
        &self.time_s
    }

    pub fn rpm_raw(&self) -> &[f64] {
        &self.rpm_raw
    }

    pub fn speed_kmh_raw(&self) -> &[f64] {
        &self.speed_kmh_raw
    }

    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_s.is_empty()
    }

    /// Pass-through lookup of any column of the source table.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.table.column(name)
    }

    pub fn table(&self) -> &RunTable {
        &self.table
    }

    pub fn cache(&self) -> &FilterCache {
        &self.cache
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Number of filter computations that actually ran for this run.
    pub fn computation_count(&self) -> usize {
        self.metrics.snapshot().computations
    }

    pub fn apply_filter(&self, config: &FilterConfig) -> FilterResult<FilterOutcome> {
        apply_filter(self, config)
    }

    pub(crate) fn logger(&self) -> &LogManager {
        &self.logger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn table(rows: usize) -> RunTable {
        RunTable::from_columns(vec![
            ("f1".into(), (0..rows).map(|i| (i % 3) as f64).collect()),
            ("f2".into(), vec![1.0; rows]),
            ("temp".into(), vec![21.5; rows]),
        ])
    }

    #[test]
    fn decimates_into_uniform_timeline() {
        let run = RawRun::decode("a.csv", &table(50), &VehicleConstants::default()).unwrap();
        assert_eq!(run.len(), 5);
        for (i, t) in run.time_s().iter().enumerate() {
            assert_eq!(*t, 0.05 * i as f64);
        }
        assert!(run.rpm_raw().iter().all(|rpm| *rpm == 12_000.0));

        let factor = VehicleConstants::default().speed_factor();
        let first_group: f64 = (0..10).map(|i| (i % 3) as f64).sum();
        assert!((run.speed_kmh_raw()[0] - first_group * factor).abs() < 1e-12);
    }

    #[test]
    fn trailing_partial_group_is_dropped() {
        let constants = VehicleConstants::default();
        let exact = RawRun::decode("a", &table(30), &constants).unwrap();
        let ragged = RawRun::decode("a", &table(37), &constants).unwrap();
        assert_eq!(exact.time_s(), ragged.time_s());
        assert_eq!(exact.rpm_raw(), ragged.rpm_raw());
        assert_eq!(exact.speed_kmh_raw(), ragged.speed_kmh_raw());
    }

    #[test]
    fn fewer_rows_than_one_group_decode_empty() {
        let run = decode(&table(9), &VehicleConstants::default()).unwrap();
        assert!(run.is_empty());
        assert!(run.rpm_raw().is_empty());
        assert!(run.speed_kmh_raw().is_empty());
    }

    #[test]
    fn missing_counter_column_is_rejected() {
        let table = RunTable::from_columns(vec![("f1".into(), vec![1.0; 20])]);
        let err = decode(&table, &VehicleConstants::default()).unwrap_err();
        assert!(matches!(err, DecodeError::DataFormat(_)));
    }

    #[test]
    fn speed_factor_uses_wheel_geometry() {
        let constants = VehicleConstants {
            wheel_radius_m: 0.3,
            disc_holes: 10,
        };
        let expected = 2.0 * 0.3 * PI * 20.0 * 3.6 / 10.0;
        assert!((constants.speed_factor() - expected).abs() < 1e-12);
    }

    #[test]
    fn load_reports_missing_files_and_keeps_extra_columns() {
        let missing = RawRun::load("/definitely/not/here.csv", &VehicleConstants::default());
        assert!(matches!(missing, Err(DecodeError::FileNotFound(_))));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session_01.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "f1,f2,throttle").unwrap();
        for i in 0..20 {
            writeln!(file, "1,2,{}", i).unwrap();
        }
        drop(file);

        let run = RawRun::load(&path, &VehicleConstants::default()).unwrap();
        assert_eq!(run.name(), "session_01.csv");
        assert_eq!(run.path(), Some(path.as_path()));
        assert_eq!(run.len(), 2);
        assert_eq!(run.rpm_raw(), [24_000.0, 24_000.0]);
        assert_eq!(run.column("throttle").unwrap().len(), 20);
    }
}
