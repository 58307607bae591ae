//! Rolling per-agent metrics over the most recent telemetry window.
//!
//! Recomputed fresh from the event log on each evaluation pass; no
//! incremental state survives between processes.

use serde::{Deserialize, Serialize};

use crate::telemetry::TelemetryRecord;

/// Default rolling window length, in records.
pub const DEFAULT_WINDOW: usize = 50;

/// Windowed metrics for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRollingMetrics {
    /// Sum of realized PnL over the window, bps.
    pub rolling_pnl_bps: f64,
    /// Fraction of window records flagged as errors.
    pub error_rate: f64,
    pub median_latency_ms: u64,
    /// PnL sum over the last 5 records (all records when fewer).
    pub last_5_runs_pnl_bps: f64,
    pub run_count: usize,
    pub signal_count: usize,
}

/// Compute rolling metrics from an agent's records, newest last.
///
/// Returns `None` when there are no records at all — the caller surfaces
/// that as an explicit no-data outcome, never as an error.
pub fn compute_rolling(records: &[TelemetryRecord], window: usize) -> Option<AgentRollingMetrics> {
    if records.is_empty() {
        return None;
    }
    let start = records.len().saturating_sub(window);
    let window_records = &records[start..];

    let pnls: Vec<f64> = window_records.iter().map(|r| r.realized_pnl_bps).collect();
    let rolling_pnl_bps = round2(pnls.iter().sum());

    let errors = window_records.iter().filter(|r| r.error).count();
    let error_rate = round3(errors as f64 / window_records.len() as f64);

    let mut latencies: Vec<u64> = window_records
        .iter()
        .map(|r| r.latency_ms)
        .filter(|&l| l > 0)
        .collect();
    latencies.sort_unstable();
    let median_latency_ms = if latencies.is_empty() {
        0
    } else {
        latencies[latencies.len() / 2]
    };

    let last_5_start = pnls.len().saturating_sub(5);
    let last_5_runs_pnl_bps = round2(pnls[last_5_start..].iter().sum());

    Some(AgentRollingMetrics {
        rolling_pnl_bps,
        error_rate,
        median_latency_ms,
        last_5_runs_pnl_bps,
        run_count: window_records.len(),
        signal_count: window_records.len(),
    })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
