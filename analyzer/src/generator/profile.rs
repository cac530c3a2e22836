use anyhow::Context;
use ilogcore::ingest::DECIMATION;
use ilogcore::VehicleConstants;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Logger rows per second (one decimated sample every 50 ms).
const ROWS_PER_SECOND: f64 = 200.0;

/// Configuration for generating synthetic logger exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub runs: usize,
    pub rows: usize,
    pub seed: u64,
    pub top_speed_kmh: f64,
    /// Time constant of the launch, in seconds.
    pub launch_tau_s: f64,
    pub idle_rpm: f64,
    pub peak_rpm: f64,
    /// Relative jitter applied to pulse rates.
    pub noise: f64,
    pub vehicle: VehicleConstants,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            runs: 3,
            rows: 2000,
            seed: 0,
            top_speed_kmh: 55.0,
            launch_tau_s: 2.5,
            idle_rpm: 2400.0,
            peak_rpm: 3800.0,
            noise: 0.05,
            vehicle: VehicleConstants::default(),
        }
    }
}

/// Emits whole pulses from a fractional rate.
#[derive(Default)]
struct PulseAccumulator {
    pending: f64,
}

impl PulseAccumulator {
    fn step(&mut self, rate: f64) -> u32 {
        self.pending += rate.max(0.0);
        let whole = self.pending.floor();
        self.pending -= whole;
        whole as u32
    }
}

/// `(f1, f2)` pulse counts per logger row for one launch.
pub fn build_pulse_rows(config: &GeneratorConfig, run_index: usize) -> Vec<(u32, u32)> {
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(run_index as u64));
    let spread = 1.0 + 0.04 * run_index as f64;
    let tau = config.launch_tau_s.max(f64::EPSILON);

    // km/h per f1 pulse once a group of DECIMATION rows is summed.
    let kmh_per_pulse = config.vehicle.speed_factor();
    let rpm_per_pulse = ilogcore::ingest::RPM_PER_PULSE;

    let mut wheel = PulseAccumulator::default();
    let mut engine = PulseAccumulator::default();

    (0..config.rows)
        .map(|row| {
            let t = row as f64 / ROWS_PER_SECOND;
            let progress = 1.0 - (-t / tau).exp();
            let speed = config.top_speed_kmh * spread * progress;
            let rpm = config.idle_rpm + (config.peak_rpm - config.idle_rpm) * progress;

            let jitter = if config.noise > 0.0 {
                1.0 + rng.gen_range(-config.noise..config.noise)
            } else {
                1.0
            };
            let f1 = wheel.step(speed / kmh_per_pulse / DECIMATION as f64 * jitter);
            let f2 = engine.step(rpm / rpm_per_pulse / DECIMATION as f64 * jitter);
            (f1, f2)
        })
        .collect()
}

/// Write `config.runs` logger CSVs into `dir`, returning their paths in order.
pub fn write_runs(dir: &Path, config: &GeneratorConfig) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    (0..config.runs)
        .map(|index| {
            let path = dir.join(format!("run_{:02}.csv", index + 1));
            let mut writer = csv::Writer::from_path(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            writer.write_record(["time_ms", "f1", "f2"])?;
            for (row, (f1, f2)) in build_pulse_rows(config, index).into_iter().enumerate() {
                let time_ms = row as f64 * 1000.0 / ROWS_PER_SECOND;
                writer.write_record(&[time_ms.to_string(), f1.to_string(), f2.to_string()])?;
            }
            writer
                .flush()
                .with_context(|| format!("writing {}", path.display()))?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ilogcore::RawRun;

    #[test]
    fn generator_builds_expected_row_count() {
        let config = GeneratorConfig {
            rows: 500,
            ..Default::default()
        };
        let rows = build_pulse_rows(&config, 0);
        assert_eq!(rows.len(), 500);
        assert_eq!(rows, build_pulse_rows(&config, 0));
    }

    #[test]
    fn generated_files_decode_into_a_launch() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig {
            runs: 2,
            rows: 4000,
            noise: 0.0,
            ..Default::default()
        };
        let paths = write_runs(dir.path(), &config).unwrap();
        assert_eq!(paths.len(), 2);

        let run = RawRun::load(&paths[0], &config.vehicle).unwrap();
        assert_eq!(run.len(), 400);
        assert!(run.column("time_ms").is_some());

        let speed = run.speed_kmh_raw();
        let tail = &speed[speed.len() - 40..];
        let mean: f64 = tail.iter().sum::<f64>() / tail.len() as f64;
        assert!((mean - config.top_speed_kmh).abs() < 3.0, "{}", mean);
        assert!(speed[0] < 5.0);
    }
}
