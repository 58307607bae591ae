//! Daily OHLCV bar.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily bar of price history for a symbol.
///
/// Bars are immutable once loaded; the engine only ever reads them through
/// point-in-time slices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    /// A bar with all prices set to `close` — convenient for fixtures where
    /// only the close matters.
    pub fn flat(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
        }
    }
}
