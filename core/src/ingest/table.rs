use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::prelude::{DecodeError, DecodeResult};

/// Column-oriented numeric table parsed from a logger export.
///
/// Every cell is coerced to `f64`; empty, unparseable, `NaN` or missing cells
/// read as `0.0`, so all columns share the same length. Infinities are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTable {
    headers: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl RunTable {
    /// Build a table from named columns. Shorter columns are zero-padded to
    /// the longest one.
    pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> Self {
        let rows = columns.iter().map(|(_, c)| c.len()).max().unwrap_or(0);
        let (headers, columns) = columns
            .into_iter()
            .map(|(name, mut values)| {
                values.resize(rows, 0.0);
                (name, values)
            })
            .unzip();
        Self { headers, columns }
    }

    /// Parse CSV with a header row. Rows may be ragged.
    pub fn from_reader<R: Read>(reader: R) -> DecodeResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(DecodeError::DataFormat("missing header row".into()));
        }

        let mut columns = vec![Vec::new(); headers.len()];
        for record in csv_reader.records() {
            let record = record?;
            for (idx, column) in columns.iter_mut().enumerate() {
                column.push(coerce(record.get(idx)));
            }
        }

        Ok(Self { headers, columns })
    }

    pub fn from_csv_path(path: &Path) -> DecodeResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.headers
            .iter()
            .position(|h| h == name)
            .map(|idx| self.columns[idx].as_slice())
    }

    /// Like [`Self::column`] but a missing column is a format error.
    pub fn require(&self, name: &str) -> DecodeResult<&[f64]> {
        self.column(name).ok_or_else(|| {
            DecodeError::DataFormat(format!("required column `{}` is missing", name))
        })
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }
}

fn coerce(cell: Option<&str>) -> f64 {
    cell.and_then(|raw| raw.parse::<f64>().ok())
        .filter(|value| !value.is_nan())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn coerces_bad_and_missing_cells_to_zero() {
        let csv = "time,f1,f2\n0,1,2\n1,x,3\n2,4\n3,NaN,5\n";
        let table = RunTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.headers(), ["time", "f1", "f2"]);
        assert_eq!(table.row_count(), 4);
        assert_eq!(table.column("f1").unwrap(), [1.0, 0.0, 4.0, 0.0]);
        assert_eq!(table.column("f2").unwrap(), [2.0, 3.0, 0.0, 5.0]);
    }

    #[test]
    fn infinite_cells_are_kept() {
        let csv = "f1,f2\ninf,-inf\n-Infinity,nan\n";
        let table = RunTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.column("f1").unwrap(), [f64::INFINITY, f64::NEG_INFINITY]);
        assert_eq!(table.column("f2").unwrap(), [f64::NEG_INFINITY, 0.0]);
    }

    #[test]
    fn missing_column_is_a_format_error() {
        let table = RunTable::from_reader("f1,speed\n1,2\n".as_bytes()).unwrap();
        assert!(table.column("f2").is_none());
        assert!(matches!(
            table.require("f2"),
            Err(DecodeError::DataFormat(_))
        ));
    }

    #[test]
    fn reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "f1,f2").unwrap();
        writeln!(file, " 3 , 4 ").unwrap();
        let table = RunTable::from_csv_path(file.path()).unwrap();
        assert_eq!(table.column("f1").unwrap(), [3.0]);
        assert_eq!(table.column("f2").unwrap(), [4.0]);
    }

    #[test]
    fn from_columns_pads_short_columns() {
        let table = RunTable::from_columns(vec![
            ("f1".into(), vec![1.0, 2.0, 3.0]),
            ("f2".into(), vec![1.0]),
        ]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column("f2").unwrap(), [1.0, 0.0, 0.0]);
    }
}
