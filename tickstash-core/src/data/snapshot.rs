//! Flat-file CSV snapshots.
//!
//! Layout: `{data_dir}/{SYMBOL}_{YYYYMMDD}.csv` for live data and
//! `{data_dir}/{SYMBOL}_sample_{YYYYMMDD}.csv` for synthetic data.
//! Columns: `Date,Open,High,Low,Close,Volume`, prices to 2 decimals.
//! A second save for the same symbol and day overwrites the first.

use crate::domain::{DataSource, PriceBar, PriceSeries};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CSV_HEADER: [&str; 6] = ["Date", "Open", "High", "Low", "Close", "Volume"];

/// Marker inserted into file names of synthetic snapshots.
const SAMPLE_MARKER: &str = "_sample_";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed snapshot {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("symbol '{symbol}' cannot be used in a snapshot file name")]
    InvalidSymbol { symbol: String },
}

/// Reject symbols that would escape the data directory or produce an
/// unusable file name.
pub fn check_symbol(symbol: &str) -> Result<(), SnapshotError> {
    let bad = symbol.trim().is_empty()
        || symbol == "."
        || symbol == ".."
        || symbol
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '\0' || std::path::is_separator(c));
    if bad {
        return Err(SnapshotError::InvalidSymbol {
            symbol: symbol.to_string(),
        });
    }
    Ok(())
}

/// Writes and reads per-symbol CSV snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    data_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Snapshot path for a symbol, source and day.
    pub fn path_for(&self, symbol: &str, source: DataSource, as_of: NaiveDate) -> PathBuf {
        let stamp = as_of.format("%Y%m%d");
        let name = match source {
            DataSource::Real => format!("{symbol}_{stamp}.csv"),
            DataSource::Synthetic => format!("{symbol}{SAMPLE_MARKER}{stamp}.csv"),
        };
        self.data_dir.join(name)
    }

    /// Write `series` as the `as_of` snapshot for `symbol`. Returns the path.
    pub fn save(
        &self,
        symbol: &str,
        series: &PriceSeries,
        as_of: NaiveDate,
    ) -> Result<PathBuf, SnapshotError> {
        check_symbol(symbol)?;
        fs::create_dir_all(&self.data_dir).map_err(|source| SnapshotError::Io {
            path: self.data_dir.clone(),
            source,
        })?;

        let path = self.path_for(symbol, series.source, as_of);
        let file = fs::File::create(&path).map_err(|source| SnapshotError::Io {
            path: path.clone(),
            source,
        })?;
        let mut wtr = csv::Writer::from_writer(file);
        wtr.write_record(CSV_HEADER)?;
        for b in series.bars() {
            wtr.write_record([
                &b.date.format("%Y-%m-%d").to_string(),
                &format!("{:.2}", b.open),
                &format!("{:.2}", b.high),
                &format!("{:.2}", b.low),
                &format!("{:.2}", b.close),
                &b.volume.to_string(),
            ])?;
        }
        wtr.flush().map_err(|source| SnapshotError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::info!(symbol, path = %path.display(), bars = series.len(), "snapshot saved");
        Ok(path)
    }

    /// Read a snapshot back. The source is inferred from the file name and
    /// the symbol from its prefix.
    pub fn load(path: &Path) -> Result<PriceSeries, SnapshotError> {
        let parse_err = |reason: String| SnapshotError::Parse {
            path: path.to_path_buf(),
            reason,
        };

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| parse_err("file name is not valid UTF-8".into()))?;
        let (symbol, source) = match stem.find(SAMPLE_MARKER) {
            Some(idx) => (&stem[..idx], DataSource::Synthetic),
            None => match stem.rfind('_') {
                Some(idx) => (&stem[..idx], DataSource::Real),
                None => (stem, DataSource::Real),
            },
        };

        let mut rdr = csv::Reader::from_path(path)?;
        let mut bars = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record?;
            let field = |i: usize| record.get(i).unwrap_or("").trim();
            let num = |i: usize| {
                field(i).parse::<f64>().map_err(|e| {
                    parse_err(format!("row {}: column {}: {e}", line + 1, CSV_HEADER[i]))
                })
            };

            let date = NaiveDate::parse_from_str(field(0), "%Y-%m-%d")
                .map_err(|e| parse_err(format!("row {}: date: {e}", line + 1)))?;
            let volume = field(5)
                .parse::<u64>()
                .map_err(|e| parse_err(format!("row {}: volume: {e}", line + 1)))?;

            bars.push(PriceBar {
                date,
                open: num(1)?,
                high: num(2)?,
                low: num(3)?,
                close: num(4)?,
                volume,
            });
        }

        Ok(PriceSeries::new(symbol, source, bars))
    }
}
