//! Forward-return metrics — pure functions from signal events + price
//! history to performance statistics.
//!
//! For each signal with a known symbol and each configured horizon `h`, the
//! signal is anchored at its trading day's close (falling back to the most
//! recent earlier trading day) and the forward return is
//! `close[t+h] / close[t] - 1`. An observation with no anchor, no series,
//! or fewer than `h` bars ahead is excluded from the sample — never treated
//! as zero. Empty input yields a well-formed empty result, never an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::PriceStore;
use crate::domain::{Severity, SignalEvent};

/// Default forward horizons, in trading days.
pub const DEFAULT_HORIZONS: [usize; 4] = [1, 5, 20, 60];

/// Confidence partition bounds: [0,0.5), [0.5,0.7), [0.7,0.85), [0.85,1.0].
const CONFIDENCE_BANDS: [(f64, f64); 4] = [(0.0, 0.5), (0.5, 0.7), (0.7, 0.85), (0.85, 1.01)];

/// Per-horizon sample statistics. All-`None` when the sample is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonStats {
    pub n: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Fraction of sampled returns strictly greater than zero.
    pub hit_rate: Option<f64>,
}

impl HorizonStats {
    pub fn empty() -> Self {
        Self {
            n: 0,
            mean: None,
            median: None,
            hit_rate: None,
        }
    }

    fn from_returns(mut returns: Vec<f64>) -> Self {
        if returns.is_empty() {
            return Self::empty();
        }
        let n = returns.len();
        let mean = returns.iter().sum::<f64>() / n as f64;
        returns.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median = if n % 2 == 0 {
            (returns[n / 2 - 1] + returns[n / 2]) / 2.0
        } else {
            returns[n / 2]
        };
        let hits = returns.iter().filter(|&&r| r > 0.0).count();
        Self {
            n,
            mean: Some(mean),
            median: Some(median),
            hit_rate: Some(hits as f64 / n as f64),
        }
    }
}

/// Forward-return statistics for one agent's signal stream.
///
/// Derived and recomputable; only its JSON snapshot is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardReturnMetrics {
    pub signal_count: usize,
    /// Keyed `"{h}d"` per configured horizon.
    pub forward: BTreeMap<String, HorizonStats>,
    pub by_severity: BTreeMap<String, usize>,
    /// Keyed `"{lo:.2}-{hi:.2}"` per confidence band.
    pub by_confidence_bucket: BTreeMap<String, usize>,
}

impl ForwardReturnMetrics {
    /// The well-defined empty result for a signal-free run.
    pub fn empty(horizons: &[usize]) -> Self {
        let mut forward = BTreeMap::new();
        for &h in horizons {
            forward.insert(format!("{h}d"), HorizonStats::empty());
        }
        Self {
            signal_count: 0,
            forward,
            by_severity: severity_counts(&[]),
            by_confidence_bucket: confidence_counts(&[]),
        }
    }
}

/// One signal's realized forward return at a single horizon. Input to the
/// redundancy clusterer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReturn {
    pub agent: String,
    pub ts: chrono::NaiveDate,
    pub symbol: String,
    pub horizon: usize,
    pub forward_return: f64,
}

/// Compute forward-return statistics for a signal stream.
pub fn compute_forward_returns(
    signals: &[SignalEvent],
    store: &PriceStore,
    horizons: &[usize],
) -> ForwardReturnMetrics {
    if signals.is_empty() {
        return ForwardReturnMetrics::empty(horizons);
    }

    let mut forward = BTreeMap::new();
    for &h in horizons {
        let returns: Vec<f64> = signals
            .iter()
            .filter_map(|s| forward_return(s, store, h))
            .collect();
        forward.insert(format!("{h}d"), HorizonStats::from_returns(returns));
    }

    ForwardReturnMetrics {
        signal_count: signals.len(),
        forward,
        by_severity: severity_counts(signals),
        by_confidence_bucket: confidence_counts(signals),
    }
}

/// Per-signal forward returns at one horizon, excluded observations
/// dropped. This is the clusterer's raw material.
pub fn per_signal_returns(
    signals: &[SignalEvent],
    store: &PriceStore,
    horizon: usize,
) -> Vec<SignalReturn> {
    signals
        .iter()
        .filter_map(|s| {
            let ret = forward_return(s, store, horizon)?;
            Some(SignalReturn {
                agent: s.agent.clone(),
                ts: s.ts,
                symbol: s.symbol.clone()?,
                horizon,
                forward_return: ret,
            })
        })
        .collect()
}

/// Forward return for one signal, or `None` when the observation must be
/// excluded (unknown symbol, no anchor bar, not enough forward bars, or a
/// non-positive anchor price).
fn forward_return(signal: &SignalEvent, store: &PriceStore, horizon: usize) -> Option<f64> {
    let symbol = signal.symbol.as_deref()?;
    let series = store.get(symbol)?;
    let i = series.index_at_or_before(signal.ts)?;
    let p0 = series.bars()[i].close;
    if p0 <= 0.0 {
        return None;
    }
    let p1 = series.close_ahead(i, horizon)?;
    Some(p1 / p0 - 1.0)
}

fn severity_counts(signals: &[SignalEvent]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = Severity::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    for signal in signals {
        *counts
            .entry(signal.severity.as_str().to_string())
            .or_insert(0) += 1;
    }
    counts
}

fn confidence_counts(signals: &[SignalEvent]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for (lo, hi) in CONFIDENCE_BANDS {
        let key = format!("{lo:.2}-{hi:.2}");
        let n = signals
            .iter()
            .filter(|s| s.confidence >= lo && s.confidence < hi)
            .count();
        counts.insert(key, n);
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PriceSeries;
    use crate::domain::{Finding, PriceBar};
    use chrono::NaiveDate;

    fn d(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset)
    }

    fn store_with_closes(closes: &[f64]) -> PriceStore {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::flat(d(i as i64), c))
            .collect();
        let mut store = PriceStore::new();
        store.insert(PriceSeries::new("SPY", bars));
        store
    }

    fn signal(ts: NaiveDate, severity: Severity, confidence: f64) -> SignalEvent {
        SignalEvent::from_finding(
            "a1",
            ts,
            Finding::new(severity, confidence, "t").with_symbol("SPY"),
        )
    }

    // ── Forward-return arithmetic ──

    #[test]
    fn forward_return_horizon_one() {
        // prices [100, 102, 101, 105], horizon 1 at t0 → 0.02
        let store = store_with_closes(&[100.0, 102.0, 101.0, 105.0]);
        let metrics =
            compute_forward_returns(&[signal(d(0), Severity::Low, 0.4)], &store, &[1]);
        let stats = &metrics.forward["1d"];
        assert_eq!(stats.n, 1);
        assert!((stats.mean.unwrap() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn anchor_falls_back_to_prior_trading_day() {
        // Bars at offsets 0, 3, 4, 5 — a signal dated at offset 1 has no
        // exact bar and must anchor at offset 0.
        let bars = vec![
            PriceBar::flat(d(0), 102.0),
            PriceBar::flat(d(3), 101.0),
            PriceBar::flat(d(4), 105.0),
            PriceBar::flat(d(5), 107.0),
        ];
        let mut store = PriceStore::new();
        store.insert(PriceSeries::new("SPY", bars));

        let metrics =
            compute_forward_returns(&[signal(d(1), Severity::Low, 0.4)], &store, &[2]);
        // anchored at close 102, two bars ahead → 105/102 - 1
        let stats = &metrics.forward["2d"];
        assert_eq!(stats.n, 1);
        assert!((stats.mean.unwrap() - (105.0 / 102.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn insufficient_forward_bars_excluded_not_zero() {
        let store = store_with_closes(&[100.0, 102.0]);
        let metrics =
            compute_forward_returns(&[signal(d(1), Severity::Low, 0.4)], &store, &[5]);
        let stats = &metrics.forward["5d"];
        assert_eq!(stats.n, 0);
        assert_eq!(stats.mean, None);
        assert_eq!(stats.hit_rate, None);
    }

    #[test]
    fn unknown_symbol_excluded() {
        let store = store_with_closes(&[100.0, 102.0, 104.0]);
        let mut s = signal(d(0), Severity::Low, 0.4);
        s.symbol = Some("QQQ".into());
        let metrics = compute_forward_returns(&[s], &store, &[1]);
        assert_eq!(metrics.forward["1d"].n, 0);
        assert_eq!(metrics.signal_count, 1);
    }

    #[test]
    fn symbolless_signal_excluded() {
        let store = store_with_closes(&[100.0, 102.0]);
        let mut s = signal(d(0), Severity::Low, 0.4);
        s.symbol = None;
        let metrics = compute_forward_returns(&[s], &store, &[1]);
        assert_eq!(metrics.forward["1d"].n, 0);
    }

    // ── Hit rate ──

    #[test]
    fn hit_rate_two_of_three() {
        // returns: +2%, -1.96%, +3.96% → hit rate 2/3
        let store = store_with_closes(&[100.0, 102.0, 100.0, 103.96]);
        let signals = vec![
            signal(d(0), Severity::Low, 0.4),
            signal(d(1), Severity::Low, 0.4),
            signal(d(2), Severity::Low, 0.4),
        ];
        let metrics = compute_forward_returns(&signals, &store, &[1]);
        let stats = &metrics.forward["1d"];
        assert_eq!(stats.n, 3);
        assert!((stats.hit_rate.unwrap() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn median_even_sample() {
        let store = store_with_closes(&[100.0, 110.0, 110.0, 121.0, 121.0]);
        let signals = vec![
            signal(d(0), Severity::Low, 0.4), // 110/100-1 = 0.10
            signal(d(1), Severity::Low, 0.4), // 110/110-1 = 0.00
        ];
        let metrics = compute_forward_returns(&signals, &store, &[1]);
        assert!((metrics.forward["1d"].median.unwrap() - 0.05).abs() < 1e-12);
    }

    // ── Partitions ──

    #[test]
    fn severity_partition_counts() {
        let store = store_with_closes(&[100.0, 101.0]);
        let signals = vec![
            signal(d(0), Severity::Low, 0.1),
            signal(d(0), Severity::High, 0.6),
            signal(d(0), Severity::High, 0.8),
        ];
        let metrics = compute_forward_returns(&signals, &store, &[1]);
        assert_eq!(metrics.by_severity["low"], 1);
        assert_eq!(metrics.by_severity["medium"], 0);
        assert_eq!(metrics.by_severity["high"], 2);
        assert_eq!(metrics.by_severity["critical"], 0);
    }

    #[test]
    fn confidence_bands_cover_unit_interval() {
        let store = store_with_closes(&[100.0, 101.0]);
        let signals = vec![
            signal(d(0), Severity::Low, 0.0),
            signal(d(0), Severity::Low, 0.49),
            signal(d(0), Severity::Low, 0.5),
            signal(d(0), Severity::Low, 0.7),
            signal(d(0), Severity::Low, 0.84),
            signal(d(0), Severity::Low, 0.85),
            signal(d(0), Severity::Low, 1.0),
        ];
        let metrics = compute_forward_returns(&signals, &store, &[1]);
        assert_eq!(metrics.by_confidence_bucket["0.00-0.50"], 2);
        assert_eq!(metrics.by_confidence_bucket["0.50-0.70"], 1);
        assert_eq!(metrics.by_confidence_bucket["0.70-0.85"], 2);
        assert_eq!(metrics.by_confidence_bucket["0.85-1.01"], 2);
    }

    // ── Empty input ──

    #[test]
    fn empty_input_yields_well_formed_result() {
        let store = store_with_closes(&[100.0]);
        let metrics = compute_forward_returns(&[], &store, &DEFAULT_HORIZONS);
        assert_eq!(metrics.signal_count, 0);
        assert_eq!(metrics.forward.len(), DEFAULT_HORIZONS.len());
        assert!(metrics.forward.values().all(|s| s.n == 0 && s.mean.is_none()));
        assert_eq!(metrics.by_severity.len(), 4);
    }

    // ── Per-signal returns ──

    #[test]
    fn per_signal_returns_drop_excluded() {
        let store = store_with_closes(&[100.0, 102.0, 101.0]);
        let signals = vec![
            signal(d(0), Severity::Low, 0.4),
            signal(d(2), Severity::Low, 0.4), // no bar ahead → excluded
        ];
        let returns = per_signal_returns(&signals, &store, 1);
        assert_eq!(returns.len(), 1);
        assert_eq!(returns[0].agent, "a1");
        assert!((returns[0].forward_return - 0.02).abs() < 1e-12);
    }
}
