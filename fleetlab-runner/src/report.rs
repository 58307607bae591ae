//! Meta report aggregator — one consistent evaluation pass over the whole
//! fleet.
//!
//! Assembles, from a single read of the latest telemetry and backtest
//! outputs: per-agent rolling metrics + gate decision + advisory health,
//! redundancy clusters + cluster ensemble votes, capital weights, and a
//! fleet summary. The report is persisted as one JSON document and consumed
//! verbatim by external renderers (dashboard, email, PR comments) — this
//! core never calls them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use fleetlab_core::domain::{Severity, SignalEvent};
use fleetlab_core::metrics::SignalReturn;

use crate::allocator::{
    compute_weights, sim_log_entry, simulate_deployment, AgentStanding, CapitalWeights,
    DeploymentLine, SimLogEntry, DEFAULT_MIN_WEIGHT,
};
use crate::cluster::{
    build_agent_vectors, cluster_agents, select_representatives, RedundancyOutcome,
    DEFAULT_CORR_THRESHOLD,
};
use crate::ensemble::{cluster_decisions, ClusterVote, Vote};
use crate::gates::{evaluate, GateOutcome, GateThresholds, LifecycleDecision};
use crate::health::{health_label, health_score, HealthInputs, HealthLabel};
use crate::rolling::compute_rolling;
use crate::telemetry::TelemetryRecord;

/// Report file name within a state directory.
pub const REPORT_FILE: &str = "meta_report.json";

/// Tunables for one evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub thresholds: GateThresholds,
    pub corr_threshold: f64,
    pub min_weight: f64,
    pub total_capital: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            thresholds: GateThresholds::default(),
            corr_threshold: DEFAULT_CORR_THRESHOLD,
            min_weight: DEFAULT_MIN_WEIGHT,
            total_capital: 100_000.0,
        }
    }
}

/// Everything the aggregator reads. A consistent, non-concurrent snapshot:
/// gather it once, then build the report from it.
#[derive(Debug, Clone, Default)]
pub struct ReportInputs {
    pub telemetry: Vec<TelemetryRecord>,
    /// Per-signal forward returns at the clustering horizon.
    pub signal_returns: Vec<SignalReturn>,
    /// Real per-agent votes (see [`votes_from_signals`]).
    pub votes: BTreeMap<String, Vote>,
    /// Agents already on the killed list; permanently excluded from
    /// clustering input and allocation.
    pub killed: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Per-agent section of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReport {
    #[serde(flatten)]
    pub gate: GateOutcome,
    pub health_score: u32,
    pub health_label: HealthLabel,
}

/// Fleet-wide rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSummary {
    pub agent_count: usize,
    pub promotable: usize,
    pub killable: usize,
    pub hold: usize,
    pub no_data: usize,
    pub total_pnl_bps: f64,
}

/// Allocation section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationReport {
    pub weights: CapitalWeights,
    pub deployment: Vec<DeploymentLine>,
    pub sim_entry: SimLogEntry,
}

/// The persisted meta report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaReport {
    pub generated_at: DateTime<Utc>,
    /// "high" when the fleet is losing money, else "low".
    pub severity: String,
    pub agents: BTreeMap<String, AgentReport>,
    pub clusters: RedundancyOutcome,
    pub ensemble: BTreeMap<String, ClusterVote>,
    pub allocation: AllocationReport,
    pub fleet: FleetSummary,
}

/// Derive a categorical vote per agent from its real signal stream.
///
/// ACT on any high-severity signal with confidence >= 0.7; WATCH when the
/// agent emitted anything at all; IGNORE otherwise. (Agents absent from
/// `signals` get no vote.)
pub fn votes_from_signals(signals: &[SignalEvent]) -> BTreeMap<String, Vote> {
    let mut votes: BTreeMap<String, Vote> = BTreeMap::new();
    for signal in signals {
        let vote = if signal.severity >= Severity::High && signal.confidence >= 0.7 {
            Vote::Act
        } else {
            Vote::Watch
        };
        votes
            .entry(signal.agent.clone())
            .and_modify(|v| {
                if vote > *v {
                    *v = vote;
                }
            })
            .or_insert(vote);
    }
    votes
}

/// Build the meta report from one input snapshot.
pub fn build_meta_report(inputs: &ReportInputs, config: &ReportConfig) -> MetaReport {
    // group telemetry per agent, preserving append order
    let mut by_agent: BTreeMap<String, Vec<&TelemetryRecord>> = BTreeMap::new();
    for record in &inputs.telemetry {
        by_agent.entry(record.agent.clone()).or_default().push(record);
    }

    let mut agents = BTreeMap::new();
    let mut standings = BTreeMap::new();
    let mut scores = BTreeMap::new();
    let mut fleet = FleetSummary {
        agent_count: 0,
        promotable: 0,
        killable: 0,
        hold: 0,
        no_data: 0,
        total_pnl_bps: 0.0,
    };

    for (agent, records) in &by_agent {
        fleet.agent_count += 1;
        let owned: Vec<TelemetryRecord> = records.iter().map(|r| (*r).clone()).collect();
        let rolling = compute_rolling(&owned, config.thresholds.window);

        let mut gate = evaluate(rolling.as_ref(), &config.thresholds);
        // the killed list is sticky: once killed, always killed
        if inputs.killed.iter().any(|k| k == agent) {
            if let GateOutcome::Decided {
                decision, reasons, ..
            } = &mut gate
            {
                *decision = LifecycleDecision::Kill;
                reasons.insert(0, "agent is on the killed list".to_string());
            }
        }

        match gate.decision() {
            Some(LifecycleDecision::Promote) => fleet.promotable += 1,
            Some(LifecycleDecision::Kill) | Some(LifecycleDecision::Retire) => {
                fleet.killable += 1
            }
            Some(LifecycleDecision::Hold) => fleet.hold += 1,
            None => fleet.no_data += 1,
        }

        if let Some(m) = &rolling {
            fleet.total_pnl_bps += m.rolling_pnl_bps;
            standings.insert(
                agent.clone(),
                AgentStanding {
                    pnl_sum_bps: m.rolling_pnl_bps,
                    decision: gate.decision().unwrap_or(LifecycleDecision::Hold),
                },
            );
            scores.insert(agent.clone(), m.rolling_pnl_bps);
        }

        let signal_count = inputs
            .signal_returns
            .iter()
            .filter(|r| &r.agent == agent)
            .count();
        let latencies: Vec<u64> = owned.iter().map(|r| r.latency_ms).filter(|&l| l > 0).collect();
        let avg_latency = if latencies.is_empty() {
            0
        } else {
            latencies.iter().sum::<u64>() / latencies.len() as u64
        };
        let health_inputs = HealthInputs {
            signal_count,
            run_count: owned.len(),
            avg_latency_ms: avg_latency,
            error_rate: rolling.as_ref().map(|m| m.error_rate).unwrap_or(0.0),
            pnl_sum_bps: rolling.as_ref().map(|m| m.rolling_pnl_bps).unwrap_or(0.0),
        };
        let score = health_score(&health_inputs);

        agents.insert(
            agent.clone(),
            AgentReport {
                gate,
                health_score: score,
                health_label: health_label(score),
            },
        );
    }

    // ── Redundancy clustering over surviving agents ──
    let surviving_returns: Vec<SignalReturn> = inputs
        .signal_returns
        .iter()
        .filter(|r| {
            !inputs.killed.iter().any(|k| k == &r.agent)
                && standings
                    .get(&r.agent)
                    .map_or(true, |s| !s.decision.is_terminal())
        })
        .cloned()
        .collect();

    let vectors = build_agent_vectors(&surviving_returns);
    let clusters = if vectors.is_empty() {
        let mut singleton_agents: Vec<String> =
            surviving_returns.iter().map(|r| r.agent.clone()).collect();
        singleton_agents.sort();
        singleton_agents.dedup();
        if singleton_agents.is_empty() {
            RedundancyOutcome::skipped("fewer than 2 forward-return observations per agent")
        } else {
            let singletons: Vec<Vec<String>> =
                singleton_agents.into_iter().map(|a| vec![a]).collect();
            select_representatives(&singletons, &scores)
        }
    } else {
        let grouped = cluster_agents(&vectors, config.corr_threshold);
        select_representatives(&grouped, &scores)
    };

    let member_lists: Vec<Vec<String>> =
        clusters.clusters.iter().map(|c| c.members.clone()).collect();
    let weights_for_votes: BTreeMap<String, f64> = scores
        .iter()
        .map(|(agent, pnl)| (agent.clone(), pnl.max(0.0)))
        .collect();
    let ensemble = cluster_decisions(&member_lists, &inputs.votes, &weights_for_votes);

    // ── Allocation ──
    let weight_map = compute_weights(&standings, config.min_weight);
    let deployment = simulate_deployment(&weight_map, config.total_capital);
    let sim_entry = sim_log_entry(&deployment, inputs.generated_at);
    let allocation = AllocationReport {
        weights: CapitalWeights {
            generated_at: inputs.generated_at,
            weights: weight_map,
        },
        deployment,
        sim_entry,
    };

    let severity = if fleet.total_pnl_bps < 0.0 { "high" } else { "low" };

    info!(
        agents = fleet.agent_count,
        promotable = fleet.promotable,
        killable = fleet.killable,
        "meta report assembled"
    );

    MetaReport {
        generated_at: inputs.generated_at,
        severity: severity.to_string(),
        agents,
        clusters,
        ensemble,
        allocation,
        fleet,
    }
}
