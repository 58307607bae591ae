//! Capital allocator — PnL-proportional weights over surviving agents,
//! plus a deployment simulation with a capped rolling log.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gates::LifecycleDecision;

/// Default per-agent weight floor.
pub const DEFAULT_MIN_WEIGHT: f64 = 0.02;

/// Maximum retained simulation-log entries.
pub const SIM_LOG_CAP: usize = 100;

/// One agent's standing going into allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStanding {
    pub pnl_sum_bps: f64,
    pub decision: LifecycleDecision,
}

/// Persisted weights file payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalWeights {
    pub generated_at: DateTime<Utc>,
    pub weights: BTreeMap<String, f64>,
}

/// Compute normalized capital weights.
///
/// Excluded up front: agents whose decision is KILL or RETIRE, and agents
/// with non-positive PnL. Raw weight is the agent's share of the included
/// positive PnL; a per-agent floor is applied, then a final renormalization
/// makes the weights sum to 1.0 (each rounded to 4 decimals). When no
/// included agent has positive PnL the map is empty — no capital deployed.
pub fn compute_weights(
    standings: &BTreeMap<String, AgentStanding>,
    min_weight: f64,
) -> BTreeMap<String, f64> {
    let included: Vec<(&String, f64)> = standings
        .iter()
        .filter(|(_, s)| !s.decision.is_terminal() && s.pnl_sum_bps > 0.0)
        .map(|(name, s)| (name, s.pnl_sum_bps))
        .collect();

    let total_alpha: f64 = included.iter().map(|(_, pnl)| pnl).sum();
    if total_alpha <= 0.0 {
        return BTreeMap::new();
    }

    let mut weights: BTreeMap<String, f64> = included
        .into_iter()
        .map(|(name, pnl)| (name.clone(), round4(pnl / total_alpha).max(min_weight)))
        .collect();

    let total: f64 = weights.values().sum();
    if total > 0.0 {
        for w in weights.values_mut() {
            *w = round4(*w / total);
        }
    }
    weights
}

/// One line of the deployment simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentLine {
    pub agent: String,
    pub weight: f64,
    pub allocation_usd: f64,
    pub pct: f64,
}

/// Convert weights into dollar allocations, largest first.
pub fn simulate_deployment(
    weights: &BTreeMap<String, f64>,
    total_capital: f64,
) -> Vec<DeploymentLine> {
    let mut lines: Vec<DeploymentLine> = weights
        .iter()
        .map(|(agent, &weight)| DeploymentLine {
            agent: agent.clone(),
            weight,
            allocation_usd: round2(total_capital * weight),
            pct: round2(weight * 100.0),
        })
        .collect();
    lines.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.agent.cmp(&b.agent))
    });
    lines
}

/// One rolling-history entry of the simulation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimLogEntry {
    pub ts: DateTime<Utc>,
    pub agents: usize,
    pub top_3: Vec<String>,
    /// Combined weight of the top three agents.
    pub concentration: f64,
}

/// Build a log entry from a deployment, already sorted largest first.
pub fn sim_log_entry(deployment: &[DeploymentLine], ts: DateTime<Utc>) -> SimLogEntry {
    let top: Vec<&DeploymentLine> = deployment.iter().take(3).collect();
    SimLogEntry {
        ts,
        agents: deployment.len(),
        top_3: top.iter().map(|l| l.agent.clone()).collect(),
        concentration: round4(top.iter().map(|l| l.weight).sum()),
    }
}

/// Append an entry, retaining only the most recent [`SIM_LOG_CAP`].
pub fn push_capped(log: &mut Vec<SimLogEntry>, entry: SimLogEntry) {
    log.push(entry);
    if log.len() > SIM_LOG_CAP {
        let drop = log.len() - SIM_LOG_CAP;
        log.drain(..drop);
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(pnl: f64, decision: LifecycleDecision) -> AgentStanding {
        AgentStanding {
            pnl_sum_bps: pnl,
            decision,
        }
    }

    fn now() -> DateTime<Utc> {
        "2024-06-01T00:00:00Z".parse().unwrap()
    }

    // ── compute_weights ──

    #[test]
    fn weights_sum_to_one() {
        let standings = BTreeMap::from([
            ("a".to_string(), standing(300.0, LifecycleDecision::Hold)),
            ("b".to_string(), standing(100.0, LifecycleDecision::Promote)),
            ("c".to_string(), standing(50.0, LifecycleDecision::Hold)),
        ]);
        let weights = compute_weights(&standings, DEFAULT_MIN_WEIGHT);
        let total: f64 = weights.values().sum();
        assert!((total - 1.0).abs() < 1e-3, "sum {total}");
        assert!(weights["a"] > weights["b"]);
        assert!(weights["b"] > weights["c"]);
    }

    #[test]
    fn killed_and_retired_excluded() {
        let standings = BTreeMap::from([
            ("alive".to_string(), standing(100.0, LifecycleDecision::Hold)),
            ("dead".to_string(), standing(900.0, LifecycleDecision::Kill)),
            ("done".to_string(), standing(400.0, LifecycleDecision::Retire)),
        ]);
        let weights = compute_weights(&standings, DEFAULT_MIN_WEIGHT);
        assert_eq!(weights.len(), 1);
        assert!((weights["alive"] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn non_positive_pnl_excluded() {
        let standings = BTreeMap::from([
            ("winner".to_string(), standing(100.0, LifecycleDecision::Hold)),
            ("loser".to_string(), standing(-40.0, LifecycleDecision::Hold)),
            ("flat".to_string(), standing(0.0, LifecycleDecision::Hold)),
        ]);
        let weights = compute_weights(&standings, DEFAULT_MIN_WEIGHT);
        assert_eq!(weights.len(), 1);
    }

    #[test]
    fn no_positive_alpha_empty_map() {
        let standings = BTreeMap::from([
            ("a".to_string(), standing(-10.0, LifecycleDecision::Hold)),
            ("b".to_string(), standing(0.0, LifecycleDecision::Hold)),
        ]);
        assert!(compute_weights(&standings, DEFAULT_MIN_WEIGHT).is_empty());
    }

    #[test]
    fn floor_lifts_small_weights_before_renormalization() {
        let standings = BTreeMap::from([
            ("whale".to_string(), standing(10_000.0, LifecycleDecision::Hold)),
            ("shrimp".to_string(), standing(10.0, LifecycleDecision::Hold)),
        ]);
        let weights = compute_weights(&standings, DEFAULT_MIN_WEIGHT);
        // raw shrimp weight ~0.001 is floored to 0.02 pre-normalization
        assert!(weights["shrimp"] >= 0.019, "shrimp got {}", weights["shrimp"]);
        let total: f64 = weights.values().sum();
        assert!((total - 1.0).abs() < 1e-3);
    }

    #[test]
    fn empty_standings_empty_weights() {
        assert!(compute_weights(&BTreeMap::new(), DEFAULT_MIN_WEIGHT).is_empty());
    }

    // ── simulate_deployment ──

    #[test]
    fn deployment_sorted_and_scaled() {
        let weights = BTreeMap::from([
            ("a".to_string(), 0.25),
            ("b".to_string(), 0.75),
        ]);
        let deployment = simulate_deployment(&weights, 100_000.0);
        assert_eq!(deployment[0].agent, "b");
        assert!((deployment[0].allocation_usd - 75_000.0).abs() < 1e-9);
        assert!((deployment[1].pct - 25.0).abs() < 1e-9);
    }

    // ── sim log ──

    #[test]
    fn log_entry_top_3_concentration() {
        let weights = BTreeMap::from([
            ("a".to_string(), 0.40),
            ("b".to_string(), 0.30),
            ("c".to_string(), 0.20),
            ("d".to_string(), 0.10),
        ]);
        let deployment = simulate_deployment(&weights, 50_000.0);
        let entry = sim_log_entry(&deployment, now());
        assert_eq!(entry.agents, 4);
        assert_eq!(entry.top_3, vec!["a".to_string(), "b".into(), "c".into()]);
        assert!((entry.concentration - 0.90).abs() < 1e-9);
    }

    #[test]
    fn log_capped_at_100() {
        let mut log = Vec::new();
        for i in 0..120 {
            push_capped(
                &mut log,
                SimLogEntry {
                    ts: now(),
                    agents: i,
                    top_3: Vec::new(),
                    concentration: 0.0,
                },
            );
        }
        assert_eq!(log.len(), SIM_LOG_CAP);
        assert_eq!(log[0].agents, 20, "oldest entries dropped");
        assert_eq!(log.last().unwrap().agents, 119);
    }

    #[test]
    fn fewer_than_three_agents_in_log_entry() {
        let weights = BTreeMap::from([("only".to_string(), 1.0)]);
        let deployment = simulate_deployment(&weights, 10_000.0);
        let entry = sim_log_entry(&deployment, now());
        assert_eq!(entry.top_3.len(), 1);
        assert!((entry.concentration - 1.0).abs() < 1e-9);
    }
}
