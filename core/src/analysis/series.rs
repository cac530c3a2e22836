use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

use crate::ingest::RawRun;
use crate::prelude::DecodeResult;
use crate::processing::FilteredRun;

/// Named series a plot or export can request from a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Time,
    RpmRaw,
    SpeedRaw,
    RpmFiltered,
    SpeedFiltered,
    AccelerationFiltered,
    Distance,
    Jerk,
}

impl Quantity {
    pub const ALL: [Quantity; 8] = [
        Quantity::Time,
        Quantity::RpmFiltered,
        Quantity::SpeedFiltered,
        Quantity::AccelerationFiltered,
        Quantity::Distance,
        Quantity::RpmRaw,
        Quantity::SpeedRaw,
        Quantity::Jerk,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Quantity::Time => "Time (s)",
            Quantity::RpmRaw => "RPM (raw)",
            Quantity::SpeedRaw => "Speed raw (km/h)",
            Quantity::RpmFiltered => "RPM (filtered)",
            Quantity::SpeedFiltered => "Speed filtered (km/h)",
            Quantity::AccelerationFiltered => "Acceleration filtered (m/s²)",
            Quantity::Distance => "Distance (m)",
            Quantity::Jerk => "Jerk (m/s³)",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|q| q.label() == label)
    }

    /// Whether the series only exists once a filter has been applied.
    pub fn needs_filter(&self) -> bool {
        !matches!(self, Quantity::Time | Quantity::RpmRaw | Quantity::SpeedRaw)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Look up one series. Filtered quantities are empty when `filtered` is absent.
pub fn series<'a>(
    raw: &'a RawRun,
    filtered: Option<&'a FilteredRun>,
    quantity: Quantity,
) -> &'a [f64] {
    match quantity {
        Quantity::Time => raw.time_s(),
        Quantity::RpmRaw => raw.rpm_raw(),
        Quantity::SpeedRaw => raw.speed_kmh_raw(),
        _ => filtered
            .map(|run| match quantity {
                Quantity::RpmFiltered => run.rpm_filtered.as_slice(),
                Quantity::SpeedFiltered => run.speed_filtered_kmh.as_slice(),
                Quantity::AccelerationFiltered => run.acceleration_ms2.as_slice(),
                Quantity::Distance => run.distance_m.as_slice(),
                Quantity::Jerk => run.jerk_ms3.as_slice(),
                Quantity::Time | Quantity::RpmRaw | Quantity::SpeedRaw => &[],
            })
            .unwrap_or(&[]),
    }
}

/// Column order of the processed export.
pub const PROCESSED_COLUMNS: [Quantity; 7] = [
    Quantity::Time,
    Quantity::RpmRaw,
    Quantity::SpeedRaw,
    Quantity::RpmFiltered,
    Quantity::SpeedFiltered,
    Quantity::AccelerationFiltered,
    Quantity::Distance,
];

/// Per-run processed table: raw and filtered series side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedTable {
    pub name: String,
    pub columns: Vec<(Quantity, Vec<f64>)>,
}

impl ProcessedTable {
    pub fn build(raw: &RawRun, filtered: &FilteredRun) -> Self {
        let columns = PROCESSED_COLUMNS
            .iter()
            .map(|q| (*q, series(raw, Some(filtered), *q).to_vec()))
            .collect();
        Self {
            name: raw.name().to_string(),
            columns,
        }
    }

    pub fn row_count(&self) -> usize {
        self.columns.iter().map(|(_, c)| c.len()).max().unwrap_or(0)
    }

    /// Write as CSV with a label header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> DecodeResult<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(self.columns.iter().map(|(q, _)| q.label()))?;
        for row in 0..self.row_count() {
            csv_writer.write_record(self.columns.iter().map(|(_, values)| {
                values
                    .get(row)
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            }))?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{RunTable, VehicleConstants};
    use crate::processing::FilterConfig;

    fn run() -> RawRun {
        let table = RunTable::from_columns(vec![
            ("f1".into(), (0..300).map(|i| (i % 5) as f64).collect()),
            ("f2".into(), (0..300).map(|i| (i % 3) as f64).collect()),
        ]);
        RawRun::decode("export.csv", &table, &VehicleConstants::default()).unwrap()
    }

    #[test]
    fn filtered_series_are_empty_without_a_filter() {
        let raw = run();
        assert_eq!(series(&raw, None, Quantity::Time).len(), 30);
        assert_eq!(series(&raw, None, Quantity::RpmRaw), raw.rpm_raw());
        for quantity in Quantity::ALL.iter().filter(|q| q.needs_filter()) {
            assert!(series(&raw, None, *quantity).is_empty());
        }
    }

    #[test]
    fn labels_round_trip() {
        for quantity in Quantity::ALL {
            assert_eq!(Quantity::from_label(quantity.label()), Some(quantity));
        }
        assert_eq!(Quantity::from_label("Voltage"), None);
    }

    #[test]
    fn processed_table_exports_every_sample() {
        let raw = run();
        let filtered = raw
            .apply_filter(&FilterConfig::MovingAverage { window: 3 })
            .unwrap()
            .into_ready()
            .unwrap();
        let table = ProcessedTable::build(&raw, &filtered);
        assert_eq!(table.row_count(), 30);
        assert_eq!(table.columns.len(), PROCESSED_COLUMNS.len());

        let mut buffer = Vec::new();
        table.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap().split(',').count(), 7);
        assert!(lines.next().unwrap().starts_with("0,"));
        assert_eq!(text.lines().count(), 31);
    }
}
