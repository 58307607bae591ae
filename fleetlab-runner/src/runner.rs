//! Fleet runner — wires manifest, registry, engine, and metrics together.
//!
//! One agent's replay is strictly sequential; different agents' runs share
//! no mutable state and fan out across threads with rayon. Only the
//! governance aggregation step (see [`crate::report`]) requires a
//! consistent single-threaded read of all results.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use fleetlab_core::agent::{AgentRegistry, ConfigError, Manifest};
use fleetlab_core::calendar::business_days;
use fleetlab_core::data::PriceStore;
use fleetlab_core::engine::{BacktestEngine, BacktestRunResult, EngineConfig};
use fleetlab_core::metrics::{
    compute_forward_returns, per_signal_returns, ForwardReturnMetrics, SignalReturn,
};

/// Errors from the runner. Only configuration-level problems surface here;
/// per-step agent failures live inside the run result.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("result write failed for {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Replay window and metric settings for a fleet pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetRunConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub lookback: usize,
    pub horizons: Vec<usize>,
    /// Horizon used for the clusterer's forward-return vectors.
    pub cluster_horizon: usize,
}

impl FleetRunConfig {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            lookback: 252,
            horizons: fleetlab_core::metrics::DEFAULT_HORIZONS.to_vec(),
            cluster_horizon: 20,
        }
    }
}

/// Everything one agent's run produced.
#[derive(Debug, Clone)]
pub struct AgentRunArtifacts {
    pub result: BacktestRunResult,
    pub metrics: ForwardReturnMetrics,
    pub signal_returns: Vec<SignalReturn>,
}

/// Run one agent end to end: manifest lookup (fatal if absent), replay,
/// forward-return metrics.
pub fn run_one(
    name: &str,
    manifest: &Manifest,
    registry: &AgentRegistry,
    store: &Arc<PriceStore>,
    config: &FleetRunConfig,
) -> Result<AgentRunArtifacts, RunError> {
    let entry = manifest.entry(name)?;
    let mut adapter = registry.create(entry)?;

    let calendar = business_days(config.start, config.end);
    let engine = BacktestEngine::new(calendar, Arc::clone(store));
    let mut engine_config = EngineConfig::new(config.start, config.end);
    engine_config.lookback = config.lookback;

    let result = engine.run_agent(name, &mut adapter, &engine_config);
    let metrics = compute_forward_returns(&result.signals, store, &config.horizons);
    let signal_returns = per_signal_returns(&result.signals, store, config.cluster_horizon);

    info!(
        agent = name,
        signals = result.signals.len(),
        errors = result.errors.len(),
        "agent run complete"
    );

    Ok(AgentRunArtifacts {
        result,
        metrics,
        signal_returns,
    })
}

/// Run every manifest agent, in parallel across agents.
///
/// Per-agent configuration errors are reported per agent rather than
/// aborting the whole fleet pass; a caller that wants fail-fast semantics
/// validates the manifest against the registry first.
pub fn run_fleet(
    manifest: &Manifest,
    registry: &AgentRegistry,
    store: &Arc<PriceStore>,
    config: &FleetRunConfig,
) -> Vec<(String, Result<AgentRunArtifacts, RunError>)> {
    let names: Vec<String> = manifest.names().map(str::to_string).collect();
    names
        .into_par_iter()
        .map(|name| {
            let outcome = run_one(&name, manifest, registry, store, config);
            if let Err(e) = &outcome {
                error!(agent = %name, error = %e, "agent run failed");
            }
            (name, outcome)
        })
        .collect()
}

// ─── Result files ────────────────────────────────────────────────────

/// Persisted per-agent result payload.
#[derive(Debug, Serialize)]
struct ResultFile<'a> {
    agent: &'a str,
    period: Period<'a>,
    signals: &'a ForwardReturnMetrics,
    errors: ErrorSummary<'a>,
    run_id: &'a str,
}

#[derive(Debug, Serialize)]
struct Period<'a> {
    start: &'a NaiveDate,
    end: &'a NaiveDate,
}

#[derive(Debug, Serialize)]
struct ErrorSummary<'a> {
    count: usize,
    sample: Vec<&'a fleetlab_core::domain::StepError>,
}

/// Write one agent's backtest result file:
/// `{agent, period, signals, errors: {count, sample of first 5}}`.
pub fn write_result_file(
    dir: &Path,
    artifacts: &AgentRunArtifacts,
) -> Result<PathBuf, RunError> {
    let result = &artifacts.result;
    let payload = ResultFile {
        agent: &result.agent,
        period: Period {
            start: &result.start,
            end: &result.end,
        },
        signals: &artifacts.metrics,
        errors: ErrorSummary {
            count: result.errors.len(),
            sample: result.errors.iter().take(5).collect(),
        },
        run_id: &result.fingerprint.run_id,
    };

    let path = dir.join(format!("{}.json", result.agent));
    let write = || -> std::io::Result<()> {
        fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(&payload)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&path, json)
    };
    write().map_err(|source| RunError::Write {
        path: path.display().to_string(),
        source,
    })?;
    Ok(path)
}
