//! Backtest replay engine.
//!
//! Drives the calendar, data slicer, and agent adapter in a strictly
//! sequential replay: date N+1 is only processed after date N completes.
//! Determinism here is a correctness requirement, not an optimization —
//! replay output feeds governance decisions that must be auditable and
//! repeatable.
//!
//! Failure semantics:
//! - An error raised while processing one timestamp is caught, recorded as
//!   a [`StepError`], and replay continues with the next timestamp.
//! - Only a missing/unregistered agent aborts a run, and it does so before
//!   replay starts (see [`crate::agent::registry`]).

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agent::{AgentAdapter, AgentContext};
use crate::data::PriceStore;
use crate::domain::{SignalEvent, StepError};
use crate::fingerprint::RunFingerprint;

/// Replay settings for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Bars of history handed to the agent each step.
    pub lookback: usize,
    /// Bar frequency label recorded on results.
    pub bars_freq: String,
}

impl EngineConfig {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            lookback: 252,
            bars_freq: "1d".to_string(),
        }
    }
}

/// Immutable outcome of one replay. Created once per invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestRunResult {
    pub agent: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub bars_freq: String,
    /// Ordered by replay timestamp (non-decreasing).
    pub signals: Vec<SignalEvent>,
    pub errors: Vec<StepError>,
    pub fingerprint: RunFingerprint,
}

/// The replay engine: a calendar plus a shared read-only price snapshot.
pub struct BacktestEngine {
    calendar: Vec<NaiveDate>,
    store: Arc<PriceStore>,
}

impl BacktestEngine {
    pub fn new(calendar: Vec<NaiveDate>, store: Arc<PriceStore>) -> Self {
        Self { calendar, store }
    }

    /// Replay one agent over the configured window.
    ///
    /// Identical inputs always produce identical ordered signal and error
    /// lists.
    pub fn run_agent(
        &self,
        agent_name: &str,
        adapter: &mut AgentAdapter,
        config: &EngineConfig,
    ) -> BacktestRunResult {
        let mut signals: Vec<SignalEvent> = Vec::new();
        let mut errors: Vec<StepError> = Vec::new();

        for &ts in &self.calendar {
            if ts < config.start || ts > config.end {
                continue;
            }

            let ctx = AgentContext::new(ts, config.lookback, Arc::clone(&self.store))
                .with_meta("bars_freq", config.bars_freq.clone());

            match adapter.produce_findings(&ctx) {
                Ok(findings) => {
                    for finding in findings {
                        signals.push(SignalEvent::from_finding(agent_name, ts, finding));
                    }
                }
                Err(e) => {
                    warn!(agent = agent_name, %ts, error = %e, "replay step failed");
                    errors.push(StepError {
                        agent: agent_name.to_string(),
                        ts,
                        error: e.to_string(),
                        trace: error_trace(&e),
                    });
                }
            }
        }

        debug!(
            agent = agent_name,
            signals = signals.len(),
            errors = errors.len(),
            "replay complete"
        );

        let fingerprint = RunFingerprint::compute(
            agent_name,
            config.start,
            config.end,
            &config.bars_freq,
            config.lookback,
            &self.store.dataset_hash(),
        );

        BacktestRunResult {
            agent: agent_name.to_string(),
            start: config.start,
            end: config.end,
            bars_freq: config.bars_freq.clone(),
            signals,
            errors,
            fingerprint,
        }
    }
}

/// Abbreviated context chain of an error, outermost first, capped at 20
/// entries.
fn error_trace(err: &dyn std::error::Error) -> Vec<String> {
    let mut trace = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        if trace.len() >= 20 {
            break;
        }
        trace.push(cause.to_string());
        source = cause.source();
    }
    trace
}
