//! Flat-file sink: one CSV snapshot, overwritten on every load.
//!
//! Columns are taken from the first record's field set; later records that
//! lack a column get an empty cell, and fields the first record lacks are
//! not written. Writes are atomic (write to `.tmp`, rename into place).

use super::{LoadOutcome, SinkError, TickerSink};
use crate::domain::TickerRecord;
use std::fs;
use std::path::{Path, PathBuf};

/// Default output file, relative to the working directory.
pub const DEFAULT_CSV_PATH: &str = "tickers.csv";

pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn io_err(path: &Path, e: impl std::fmt::Display) -> SinkError {
        SinkError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    }
}

impl Default for CsvFileSink {
    fn default() -> Self {
        Self::new(DEFAULT_CSV_PATH)
    }
}

/// Encode `records` as CSV with a header derived from the first record.
pub fn write_records<W: std::io::Write>(
    writer: W,
    records: &[TickerRecord],
) -> Result<usize, SinkError> {
    let Some(first) = records.first() else {
        return Ok(0);
    };
    let columns = first.field_names();

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&columns)?;
    for record in records {
        wtr.write_record(
            columns
                .iter()
                .map(|c| record.field(c).unwrap_or_default()),
        )?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(records.len())
}

impl TickerSink for CsvFileSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn load(&self, records: &[TickerRecord]) -> Result<LoadOutcome, SinkError> {
        if records.is_empty() {
            tracing::info!(path = %self.path.display(), "no tickers retrieved to write to CSV");
            return Ok(LoadOutcome::Skipped);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Self::io_err(parent, e))?;
        }

        let tmp_path = self.tmp_path();
        let file = fs::File::create(&tmp_path).map_err(|e| Self::io_err(&tmp_path, e))?;
        let rows = match write_records(std::io::BufWriter::new(file), records) {
            Ok(rows) => rows,
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                return Err(e);
            }
        };

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            Self::io_err(&self.path, format!("atomic rename failed: {e}"))
        })?;

        tracing::info!(rows, path = %self.path.display(), "wrote ticker snapshot");
        Ok(LoadOutcome::Written { rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(ticker: &str, name: Option<&str>) -> TickerRecord {
        let mut r = TickerRecord::new(ticker);
        r.name = name.map(String::from);
        r.market = Some("stocks".into());
        r.active = Some(true);
        r
    }

    fn encode(records: &[TickerRecord]) -> String {
        let mut buf = Vec::new();
        write_records(&mut buf, records).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn header_comes_from_first_record() {
        let out = encode(&[rec("A", Some("Alpha")), rec("B", Some("Beta"))]);
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("ticker,name,market,active"));
        assert_eq!(lines.next(), Some("A,Alpha,stocks,true"));
        assert_eq!(lines.next(), Some("B,Beta,stocks,true"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn missing_fields_render_empty() {
        let out = encode(&[rec("A", Some("Alpha")), rec("B", None)]);
        assert_eq!(out.lines().nth(2), Some("B,,stocks,true"));
    }

    #[test]
    fn fields_absent_from_first_record_are_dropped() {
        let mut second = rec("B", Some("Beta"));
        second.cik = Some("0000001".into());
        let out = encode(&[rec("A", Some("Alpha")), second]);
        assert!(!out.contains("0000001"));
    }

    #[test]
    fn values_with_commas_are_quoted() {
        let out = encode(&[rec("BRK.A", Some("Berkshire Hathaway, Inc."))]);
        assert_eq!(
            out.lines().nth(1),
            Some("BRK.A,\"Berkshire Hathaway, Inc.\",stocks,true")
        );
    }

    #[test]
    fn capture_date_column_when_stamped() {
        let mut r = rec("A", Some("Alpha"));
        r.capture_date = NaiveDate::from_ymd_opt(2024, 2, 29);
        let out = encode(&[r]);
        assert_eq!(out.lines().next(), Some("ticker,name,market,active,ds"));
        assert_eq!(out.lines().nth(1), Some("A,Alpha,stocks,true,2024-02-29"));
    }
}
