//! Promotion/kill gate — rolling-window thresholds to lifecycle decisions.
//!
//! The kill check runs first and takes precedence: an agent satisfying a
//! kill condition is classified killable even if it also clears every
//! promotion threshold. An agent with no telemetry yields an explicit
//! no-data outcome and is eligible for neither classification.
//!
//! This gate is the single authoritative lifecycle path; the advisory
//! health score (see [`crate::health`]) never overrides it.

use serde::{Deserialize, Serialize};

use crate::rolling::AgentRollingMetrics;

/// Lifecycle decision for one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LifecycleDecision {
    Hold,
    Promote,
    Kill,
    Retire,
}

impl LifecycleDecision {
    /// True for decisions that permanently exclude an agent from
    /// allocation and clustering input.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleDecision::Kill | LifecycleDecision::Retire)
    }
}

/// Gate thresholds. Defaults mirror the production values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateThresholds {
    /// Rolling window length, records.
    pub window: usize,
    /// Kill when last-5-run PnL falls below this, bps.
    pub kill_last5_pnl_bps: f64,
    /// Kill when the error rate exceeds this fraction.
    pub kill_error_rate: f64,
    /// Promote only when rolling PnL exceeds this, bps.
    pub promote_min_pnl_bps: f64,
    /// Promote only when median latency is below this, ms.
    pub promote_max_latency_ms: u64,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            window: crate::rolling::DEFAULT_WINDOW,
            kill_last5_pnl_bps: -100.0,
            kill_error_rate: 0.20,
            promote_min_pnl_bps: 150.0,
            promote_max_latency_ms: 700,
        }
    }
}

/// A single gate check: eligibility plus human-readable reasons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateCheck {
    pub eligible: bool,
    pub reasons: Vec<String>,
}

/// Outcome of evaluating both gates for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GateOutcome {
    /// No telemetry for this agent: not eligible for any classification.
    NoData { reason: String },
    Decided {
        decision: LifecycleDecision,
        reasons: Vec<String>,
        metrics: AgentRollingMetrics,
    },
}

impl GateOutcome {
    pub fn decision(&self) -> Option<LifecycleDecision> {
        match self {
            GateOutcome::NoData { .. } => None,
            GateOutcome::Decided { decision, .. } => Some(*decision),
        }
    }
}

/// Promotion check: rolling PnL, zero errors, latency bound.
pub fn check_promotion(metrics: &AgentRollingMetrics, t: &GateThresholds) -> GateCheck {
    let eligible = metrics.rolling_pnl_bps > t.promote_min_pnl_bps
        && metrics.error_rate == 0.0
        && metrics.median_latency_ms < t.promote_max_latency_ms;

    let mut reasons = Vec::new();
    if metrics.rolling_pnl_bps <= t.promote_min_pnl_bps {
        reasons.push(format!(
            "rolling PnL {} bps <= {} bps threshold",
            metrics.rolling_pnl_bps, t.promote_min_pnl_bps
        ));
    }
    if metrics.error_rate > 0.0 {
        reasons.push(format!("error rate {} > 0", metrics.error_rate));
    }
    if metrics.median_latency_ms >= t.promote_max_latency_ms {
        reasons.push(format!(
            "median latency {}ms >= {}ms threshold",
            metrics.median_latency_ms, t.promote_max_latency_ms
        ));
    }
    if reasons.is_empty() {
        reasons.push("all promotion gates passed".to_string());
    }
    GateCheck { eligible, reasons }
}

/// Kill check: last-5 PnL floor and error-rate ceiling.
pub fn check_kill(metrics: &AgentRollingMetrics, t: &GateThresholds) -> GateCheck {
    let eligible = metrics.last_5_runs_pnl_bps < t.kill_last5_pnl_bps
        || metrics.error_rate > t.kill_error_rate;

    let mut reasons = Vec::new();
    if metrics.last_5_runs_pnl_bps < t.kill_last5_pnl_bps {
        reasons.push(format!(
            "last-5-run PnL {} bps < {} bps threshold",
            metrics.last_5_runs_pnl_bps, t.kill_last5_pnl_bps
        ));
    }
    if metrics.error_rate > t.kill_error_rate {
        reasons.push(format!(
            "error rate {} > {:.0}%",
            metrics.error_rate,
            t.kill_error_rate * 100.0
        ));
    }
    if reasons.is_empty() {
        reasons.push("no kill conditions met".to_string());
    }
    GateCheck { eligible, reasons }
}

/// Evaluate both gates with kill precedence.
pub fn evaluate(metrics: Option<&AgentRollingMetrics>, t: &GateThresholds) -> GateOutcome {
    let metrics = match metrics {
        Some(m) => m,
        None => {
            return GateOutcome::NoData {
                reason: "no telemetry records found".to_string(),
            }
        }
    };

    let kill = check_kill(metrics, t);
    if kill.eligible {
        return GateOutcome::Decided {
            decision: LifecycleDecision::Kill,
            reasons: kill.reasons,
            metrics: metrics.clone(),
        };
    }

    let promo = check_promotion(metrics, t);
    if promo.eligible {
        return GateOutcome::Decided {
            decision: LifecycleDecision::Promote,
            reasons: promo.reasons,
            metrics: metrics.clone(),
        };
    }

    GateOutcome::Decided {
        decision: LifecycleDecision::Hold,
        reasons: promo.reasons,
        metrics: metrics.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(
        rolling_pnl: f64,
        error_rate: f64,
        latency: u64,
        last_5: f64,
    ) -> AgentRollingMetrics {
        AgentRollingMetrics {
            rolling_pnl_bps: rolling_pnl,
            error_rate,
            median_latency_ms: latency,
            last_5_runs_pnl_bps: last_5,
            run_count: 50,
            signal_count: 50,
        }
    }

    // ── Promotion ──

    #[test]
    fn promotion_all_gates_pass() {
        let m = metrics(200.0, 0.0, 500, 20.0);
        let check = check_promotion(&m, &GateThresholds::default());
        assert!(check.eligible);
        assert_eq!(check.reasons, vec!["all promotion gates passed"]);
    }

    #[test]
    fn promotion_blocked_by_error_rate_with_reason() {
        let m = metrics(200.0, 0.3, 500, 20.0);
        let check = check_promotion(&m, &GateThresholds::default());
        assert!(!check.eligible);
        assert!(check.reasons.iter().any(|r| r.contains("error rate")));
    }

    #[test]
    fn promotion_blocked_by_pnl() {
        let m = metrics(150.0, 0.0, 500, 20.0); // exactly at threshold → fail
        let check = check_promotion(&m, &GateThresholds::default());
        assert!(!check.eligible);
        assert!(check.reasons.iter().any(|r| r.contains("rolling PnL")));
    }

    #[test]
    fn promotion_blocked_by_latency() {
        let m = metrics(200.0, 0.0, 700, 20.0); // exactly at threshold → fail
        let check = check_promotion(&m, &GateThresholds::default());
        assert!(!check.eligible);
        assert!(check.reasons.iter().any(|r| r.contains("latency")));
    }

    // ── Kill ──

    #[test]
    fn kill_on_last_5_pnl() {
        let m = metrics(50.0, 0.0, 500, -150.0);
        let check = check_kill(&m, &GateThresholds::default());
        assert!(check.eligible);
        assert!(check.reasons.iter().any(|r| r.contains("last-5-run")));
    }

    #[test]
    fn kill_on_error_rate() {
        let m = metrics(50.0, 0.25, 500, 10.0);
        let check = check_kill(&m, &GateThresholds::default());
        assert!(check.eligible);
    }

    #[test]
    fn no_kill_at_boundaries() {
        // -100 exactly and 0.20 exactly both survive (strict comparisons)
        let m = metrics(50.0, 0.20, 500, -100.0);
        let check = check_kill(&m, &GateThresholds::default());
        assert!(!check.eligible);
    }

    // ── Evaluate ──

    #[test]
    fn kill_takes_precedence_over_promotion() {
        // Clears every promotion threshold but also trips the kill gate.
        let m = metrics(500.0, 0.0, 100, -200.0);
        let outcome = evaluate(Some(&m), &GateThresholds::default());
        assert_eq!(outcome.decision(), Some(LifecycleDecision::Kill));
    }

    #[test]
    fn evaluate_promote() {
        let m = metrics(200.0, 0.0, 500, 20.0);
        let outcome = evaluate(Some(&m), &GateThresholds::default());
        assert_eq!(outcome.decision(), Some(LifecycleDecision::Promote));
    }

    #[test]
    fn evaluate_hold_with_reasons() {
        let m = metrics(100.0, 0.0, 500, 20.0);
        match evaluate(Some(&m), &GateThresholds::default()) {
            GateOutcome::Decided {
                decision, reasons, ..
            } => {
                assert_eq!(decision, LifecycleDecision::Hold);
                assert!(!reasons.is_empty());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn no_data_outcome() {
        let outcome = evaluate(None, &GateThresholds::default());
        assert_eq!(outcome.decision(), None);
        assert!(matches!(outcome, GateOutcome::NoData { .. }));
    }

    #[test]
    fn terminal_decisions() {
        assert!(LifecycleDecision::Kill.is_terminal());
        assert!(LifecycleDecision::Retire.is_terminal());
        assert!(!LifecycleDecision::Hold.is_terminal());
        assert!(!LifecycleDecision::Promote.is_terminal());
    }

    #[test]
    fn decision_serde_uppercase() {
        assert_eq!(
            serde_json::to_string(&LifecycleDecision::Promote).unwrap(),
            "\"PROMOTE\""
        );
        let back: LifecycleDecision = serde_json::from_str("\"KILL\"").unwrap();
        assert_eq!(back, LifecycleDecision::Kill);
    }
}
