//! CSV ingest for upstream price history files.
//!
//! The core never fetches data itself: an upstream provider drops one
//! `SYMBOL.csv` per symbol into a directory, and a run loads that directory
//! into an immutable [`PriceStore`] snapshot.
//!
//! Expected header: `date,open,high,low,close,volume` with ISO dates.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::domain::PriceBar;

use super::series::{PriceSeries, PriceStore};

/// Errors raised while ingesting price history.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("no price files found under {0}")]
    EmptyDirectory(String),
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

/// Read one symbol's bars from a CSV file.
pub fn read_bars_csv(path: &Path) -> Result<Vec<PriceBar>, IngestError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| IngestError::Csv {
        path: path.display().to_string(),
        source,
    })?;

    let mut bars = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        let row = row.map_err(|source| IngestError::Csv {
            path: path.display().to_string(),
            source,
        })?;
        bars.push(PriceBar {
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }
    Ok(bars)
}

/// Load every `*.csv` in `dir` into a [`PriceStore`], keyed by file stem.
pub fn load_price_store(dir: &Path) -> Result<PriceStore, IngestError> {
    let entries = fs::read_dir(dir).map_err(|source| IngestError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    let mut store = PriceStore::new();
    for entry in entries {
        let entry = entry.map_err(|source| IngestError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let symbol = match path.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s.to_uppercase(),
            None => continue,
        };
        let bars = read_bars_csv(&path)?;
        debug!(symbol = %symbol, bars = bars.len(), "loaded price history");
        store.insert(PriceSeries::new(symbol, bars));
    }

    if store.is_empty() {
        return Err(IngestError::EmptyDirectory(dir.display().to_string()));
    }
    Ok(store)
}
