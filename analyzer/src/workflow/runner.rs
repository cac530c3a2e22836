use crate::workflow::config::AnalysisConfig;
use anyhow::Context;
use ilogcore::analysis::{
    generate_statistics, load_batch, BatchError, ProcessedTable, StatisticsReport, METRIC_LABELS,
};
use ilogcore::processing::{FilterConfig, FilterOutcome};
use ilogcore::RawRun;
use log::info;
use serde::Serialize;
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub filter: FilterConfig,
    pub loaded: Vec<String>,
    pub load_errors: Vec<BatchError>,
    pub statistics: StatisticsReport,
    pub exported: Vec<PathBuf>,
}

#[derive(Clone)]
pub struct Runner {
    config: AnalysisConfig,
}

impl Runner {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub async fn execute(&self) -> anyhow::Result<AnalysisReport> {
        let batch = load_batch(&self.config.files, &self.config.vehicle).await;
        let statistics = generate_statistics(&batch.runs, &self.config.filter);

        let exported = match &self.config.export_dir {
            Some(dir) => export_processed(&batch.runs, &self.config.filter, dir)?,
            None => Vec::new(),
        };

        Ok(AnalysisReport {
            filter: self.config.filter.clone(),
            loaded: batch.runs.iter().map(|r| r.name().to_string()).collect(),
            load_errors: batch.errors,
            statistics,
            exported,
        })
    }
}

/// Write `<stem>_processed.csv` for every run that produced a filtered view.
fn export_processed(
    runs: &[RawRun],
    filter: &FilterConfig,
    dir: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating export directory {}", dir.display()))?;

    let mut exported = Vec::new();
    for run in runs {
        let Ok(FilterOutcome::Ready(filtered)) = run.apply_filter(filter) else {
            continue;
        };
        let stem = Path::new(run.name())
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| run.name().to_string());
        let path = dir.join(format!("{}_processed.csv", stem));
        let file =
            File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        ProcessedTable::build(run, &filtered)
            .write_csv(file)
            .with_context(|| format!("writing {}", path.display()))?;
        exported.push(path);
    }
    info!("exported {} processed tables to {}", exported.len(), dir.display());
    Ok(exported)
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Filter: {}", self.filter)?;
        writeln!(f, "Runs loaded: {}", self.loaded.len())?;
        for error in &self.load_errors {
            writeln!(f, "  load error {}: {}", error.path.display(), error.message)?;
        }

        let name_width = self
            .statistics
            .metrics
            .iter()
            .map(|m| m.name.len())
            .chain(std::iter::once(4))
            .max()
            .unwrap_or(4);

        writeln!(f, "\nMetrics")?;
        write_header(f, name_width)?;
        for run in &self.statistics.metrics {
            write_row(f, name_width, &run.name, &run.values(), "")?;
        }

        if !self.statistics.variations.is_empty() {
            writeln!(f, "\nVariation vs {}", self.statistics.metrics[0].name)?;
            write_header(f, name_width)?;
            for run in &self.statistics.variations {
                write_row(f, name_width, &run.name, &run.values(), "%")?;
            }
        }

        if !self.statistics.skipped.is_empty() {
            writeln!(
                f,
                "\nSkipped (too few samples): {}",
                self.statistics.skipped.join(", ")
            )?;
        }
        for failure in &self.statistics.errors {
            writeln!(f, "Filter error {}: {}", failure.name, failure.message)?;
        }
        for path in &self.exported {
            writeln!(f, "Exported {}", path.display())?;
        }
        Ok(())
    }
}

fn write_header(f: &mut fmt::Formatter<'_>, name_width: usize) -> fmt::Result {
    write!(f, "{:<width$}", "Run", width = name_width)?;
    for label in METRIC_LABELS {
        write!(f, " | {:>24}", label)?;
    }
    writeln!(f)
}

fn write_row(
    f: &mut fmt::Formatter<'_>,
    name_width: usize,
    name: &str,
    values: &[f64],
    suffix: &str,
) -> fmt::Result {
    write!(f, "{:<width$}", name, width = name_width)?;
    for value in values {
        write!(f, " | {:>24}", format!("{:.2}{}", value, suffix))?;
    }
    writeln!(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{write_runs, GeneratorConfig};

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .build()
            .unwrap()
            .block_on(future)
    }

    #[test]
    fn runner_executes_workflow() {
        let dir = tempfile::tempdir().unwrap();
        let generator = GeneratorConfig {
            runs: 3,
            rows: 1200,
            seed: 7,
            ..Default::default()
        };
        let mut files = write_runs(dir.path(), &generator).unwrap();
        files.insert(1, dir.path().join("missing.csv"));

        let export_dir = dir.path().join("export");
        let config = AnalysisConfig {
            files,
            export_dir: Some(export_dir.clone()),
            ..Default::default()
        };
        let report = block_on(Runner::new(config).execute()).unwrap();

        assert_eq!(report.loaded.len(), 3);
        assert_eq!(report.load_errors.len(), 1);
        assert_eq!(report.statistics.metrics.len(), 3);
        assert_eq!(report.statistics.variations.len(), 2);
        assert_eq!(report.exported.len(), 3);
        assert!(report.exported.iter().all(|p| p.starts_with(&export_dir)));

        let rendered = report.to_string();
        assert!(rendered.contains("Metrics"));
        assert!(rendered.contains("missing.csv"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["filter"]["type"], "butterworth");
    }
}
