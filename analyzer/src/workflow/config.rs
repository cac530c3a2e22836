use anyhow::Context;
use ilogcore::processing::{FilterConfig, FilterSettings};
use ilogcore::VehicleConstants;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One offline analysis: which runs, which filter, and where exports go.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub files: Vec<PathBuf>,
    pub filter: FilterConfig,
    pub vehicle: VehicleConstants,
    pub export_dir: Option<PathBuf>,
}

impl AnalysisConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let mut config: AnalysisConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;

        // Run files listed in the workflow are relative to the workflow itself.
        if let Some(base) = path_ref.parent() {
            for file in config.files.iter_mut().filter(|f| f.is_relative()) {
                *file = base.join(&*file);
            }
        }
        Ok(config)
    }

    pub fn from_args(
        files: Vec<PathBuf>,
        filter_json: Option<&str>,
        export_dir: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let mut config = Self {
            files,
            export_dir,
            ..Default::default()
        };
        if let Some(json) = filter_json {
            config.filter = parse_filter(json)?;
        }
        Ok(config)
    }

    /// Command-line values take precedence over the workflow file.
    pub fn override_with(
        mut self,
        files: Vec<PathBuf>,
        filter_json: Option<&str>,
        export_dir: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        if !files.is_empty() {
            self.files = files;
        }
        if let Some(json) = filter_json {
            self.filter = parse_filter(json)?;
        }
        if export_dir.is_some() {
            self.export_dir = export_dir;
        }
        Ok(self)
    }
}

fn parse_filter(json: &str) -> anyhow::Result<FilterConfig> {
    let settings: FilterSettings =
        serde_json::from_str(json).context("parsing --filter settings as a JSON object")?;
    FilterConfig::from_settings(&settings).context("interpreting filter settings")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_parses_filter_json() {
        let cfg = AnalysisConfig::from_args(
            vec![PathBuf::from("a.csv")],
            Some(r#"{"type": "median", "median_kernel": 7}"#),
            None,
        )
        .unwrap();
        assert_eq!(cfg.filter, FilterConfig::Median { kernel: 7 });
        assert_eq!(cfg.vehicle, VehicleConstants::default());
    }

    #[test]
    fn config_from_args_rejects_bad_filter() {
        let result = AnalysisConfig::from_args(
            Vec::new(),
            Some(r#"{"type": "savitzky_golay", "savgol_window": 4.5}"#),
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"files:\n  - run_a.csv\n  - /data/run_b.csv\nfilter:\n  type: chebyshev_type_i\n  cheby1_order: 3\nvehicle:\n  wheel_radius_m: 0.31\nexport_dir: out\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = AnalysisConfig::load(&path).unwrap();

        let base = path.parent().unwrap();
        assert_eq!(cfg.files, vec![base.join("run_a.csv"), PathBuf::from("/data/run_b.csv")]);
        assert_eq!(
            cfg.filter,
            FilterConfig::ChebyshevTypeI {
                order: 3,
                ripple_db: 1.0,
                cutoff: 0.1
            }
        );
        assert_eq!(cfg.vehicle.wheel_radius_m, 0.31);
        assert_eq!(cfg.vehicle.disc_holes, 12);
        assert_eq!(cfg.export_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn command_line_overrides_workflow() {
        let cfg = AnalysisConfig {
            files: vec![PathBuf::from("x.csv")],
            ..Default::default()
        }
        .override_with(Vec::new(), Some(r#"{"type": "bessel"}"#), None)
        .unwrap();
        assert_eq!(cfg.files, vec![PathBuf::from("x.csv")]);
        assert_eq!(cfg.filter.kind().as_str(), "bessel");
    }
}
