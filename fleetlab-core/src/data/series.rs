//! Immutable price series and the point-in-time slicer.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::PriceBar;

/// A date-sorted, deduplicated series of daily bars for one symbol.
///
/// Construction sorts and drops duplicate dates (last wins), so every
/// downstream binary search and slice operation can assume strict ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by(|later, earlier| {
            if later.date == earlier.date {
                // keep the later entry's values
                *earlier = later.clone();
                true
            } else {
                false
            }
        });
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Index of the bar at `date`, or of the most recent earlier bar.
    ///
    /// `None` when every bar is dated after `date`.
    pub fn index_at_or_before(&self, date: NaiveDate) -> Option<usize> {
        match self.bars.binary_search_by_key(&date, |b| b.date) {
            Ok(i) => Some(i),
            Err(0) => None,
            Err(i) => Some(i - 1),
        }
    }

    /// The point-in-time view: bars with `date <= asof`, truncated to at
    /// most `lookback` rows from the end.
    ///
    /// Invariant: the returned slice never contains a bar dated after
    /// `asof`. This is the no-lookahead guarantee the whole evaluation
    /// depends on.
    pub fn slice_asof(&self, asof: NaiveDate, lookback: usize) -> &[PriceBar] {
        let end = match self.index_at_or_before(asof) {
            Some(i) => i + 1,
            None => return &[],
        };
        let start = end.saturating_sub(lookback);
        &self.bars[start..end]
    }

    /// Close at bar index `i + horizon`, if the series extends that far.
    pub fn close_ahead(&self, i: usize, horizon: usize) -> Option<f64> {
        self.bars.get(i + horizon).map(|b| b.close)
    }
}

/// Read-only snapshot of every symbol's history for a run.
///
/// Shared across all steps of a replay (and across parallel per-agent runs)
/// without mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceStore {
    series: BTreeMap<String, PriceSeries>,
}

impl PriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.symbol().to_string(), series);
    }

    pub fn get(&self, symbol: &str) -> Option<&PriceSeries> {
        self.series.get(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Content hash of the snapshot: symbols, dates, and closes.
    ///
    /// Two runs over byte-identical data carry the same dataset hash in
    /// their fingerprints, which is what makes replays auditable.
    pub fn dataset_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (symbol, series) in &self.series {
            hasher.update(symbol.as_bytes());
            for bar in series.bars() {
                hasher.update(bar.date.to_string().as_bytes());
                hasher.update(&bar.close.to_bits().to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}
