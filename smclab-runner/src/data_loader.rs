//! Bar loading from CSV files.
//!
//! Each file holds one timeframe with a header row
//! `time,open,high,low,close[,volume]`. The `time` column accepts:
//! 1. Unix epoch seconds (`1735689600`)
//! 2. RFC 3339 (`2025-01-01T00:00:00Z`)
//! 3. `%Y-%m-%d %H:%M:%S` in UTC
//! 4. `%Y-%m-%d %H:%M` in UTC
//!
//! Rows are sorted by time. Duplicate timestamps keep the first row and rows
//! with a broken OHLC envelope are dropped; both are logged at `warn`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use smclab_core::data::{FrameError, MultiTimeframeFrame};
use smclab_core::domain::{Bar, BarError, BarSeries};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: row {row}: {source}")]
    Row {
        path: PathBuf,
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: row {row}: unrecognized timestamp '{value}'")]
    Timestamp {
        path: PathBuf,
        row: usize,
        value: String,
    },

    #[error("{path}: no usable bars")]
    NoBars { path: PathBuf },

    #[error("invalid series: {0}")]
    Series(#[from] BarError),

    #[error("alignment failed: {0}")]
    Frame(#[from] FrameError),
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

/// Parse one `time` cell in any of the accepted formats.
pub fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0);
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Some(t.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Load one timeframe from a CSV file.
pub fn load_series(path: &Path) -> Result<BarSeries, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let mut bars = Vec::new();
    for (i, result) in reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1.
        let row = i + 2;
        let record = result.map_err(|source| LoadError::Row {
            path: path.to_path_buf(),
            row,
            source,
        })?;
        let time = parse_time(&record.time).ok_or_else(|| LoadError::Timestamp {
            path: path.to_path_buf(),
            row,
            value: record.time.clone(),
        })?;
        bars.push(Bar {
            time,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume.unwrap_or(0.0),
        });
    }

    let bars = clean_bars(bars, path);
    if bars.is_empty() {
        return Err(LoadError::NoBars {
            path: path.to_path_buf(),
        });
    }
    tracing::debug!(path = %path.display(), bars = bars.len(), "loaded series");
    Ok(BarSeries::new(bars)?)
}

/// Sort by time, drop duplicates and bars with a broken envelope.
fn clean_bars(mut bars: Vec<Bar>, path: &Path) -> Vec<Bar> {
    bars.sort_by_key(|b| b.time);
    let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
    let mut duplicates = 0usize;
    let mut insane = 0usize;
    for bar in bars {
        if out.last().is_some_and(|prev| prev.time == bar.time) {
            duplicates += 1;
            continue;
        }
        if !bar.is_sane() {
            insane += 1;
            continue;
        }
        out.push(bar);
    }
    if duplicates > 0 {
        tracing::warn!(path = %path.display(), duplicates, "dropped duplicate timestamps");
    }
    if insane > 0 {
        tracing::warn!(path = %path.display(), dropped = insane, "dropped bars with invalid OHLC");
    }
    out
}

/// Load several timeframes and align them on `reference`.
pub fn load_frame(
    reference: &str,
    paths: &BTreeMap<String, PathBuf>,
) -> Result<MultiTimeframeFrame, LoadError> {
    let mut inputs = BTreeMap::new();
    for (label, path) in paths {
        inputs.insert(label.clone(), load_series(path)?);
    }
    Ok(MultiTimeframeFrame::align(reference, inputs)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_all_time_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        for value in [
            "1735689600",
            "2025-01-01T00:00:00Z",
            "2025-01-01T01:00:00+01:00",
            "2025-01-01 00:00:00",
            "2025-01-01 00:00",
        ] {
            assert_eq!(parse_time(value), Some(expected), "{value}");
        }
        assert_eq!(parse_time("01/01/2025"), None);
    }

    #[test]
    fn sorts_and_drops_duplicates() {
        let file = write_csv(
            "time,open,high,low,close\n\
             2025-01-01 02:00,1.0,2.0,0.5,1.5\n\
             2025-01-01 00:00,1.0,2.0,0.5,1.5\n\
             2025-01-01 00:00,9.0,9.0,9.0,9.0\n\
             2025-01-01 01:00,1.0,2.0,0.5,1.5\n",
        );
        let series = load_series(file.path()).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.as_slice()[0].open, 1.0);
        assert!(series.as_slice().windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn volume_column_is_optional() {
        let file = write_csv(
            "time,open,high,low,close,volume\n\
             1735689600,1.0,2.0,0.5,1.5,120\n\
             1735693200,1.5,2.5,1.0,2.0,\n",
        );
        let series = load_series(file.path()).unwrap();
        assert_eq!(series.as_slice()[0].volume, 120.0);
        assert_eq!(series.as_slice()[1].volume, 0.0);
    }

    #[test]
    fn drops_insane_bars() {
        let file = write_csv(
            "time,open,high,low,close\n\
             2025-01-01 00:00,1.0,2.0,0.5,1.5\n\
             2025-01-01 01:00,1.0,0.8,0.5,1.5\n",
        );
        assert_eq!(load_series(file.path()).unwrap().len(), 1);
    }

    #[test]
    fn bad_timestamp_reports_row() {
        let file = write_csv("time,open,high,low,close\nyesterday,1,2,0.5,1.5\n");
        let err = load_series(file.path()).unwrap_err();
        assert!(matches!(err, LoadError::Timestamp { row: 2, .. }));
    }

    #[test]
    fn empty_file_has_no_bars() {
        let file = write_csv("time,open,high,low,close\n");
        assert!(matches!(load_series(file.path()), Err(LoadError::NoBars { .. })));
    }
}
