//! Advisory agent health score.
//!
//! An additive 0–100 score built from signal drought, latency, error rate,
//! and negative PnL. Higher is worse. This is reporting context only: the
//! promotion/kill gate remains the authoritative lifecycle path and the
//! health score never overrides it.

use serde::{Deserialize, Serialize};

/// Inputs to the health score, taken from an agent's recent activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthInputs {
    pub signal_count: usize,
    pub run_count: usize,
    pub avg_latency_ms: u64,
    pub error_rate: f64,
    pub pnl_sum_bps: f64,
}

/// Health label derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthLabel {
    Healthy,
    Watch,
    Deprecate,
    Retire,
}

/// Compute the additive health score, capped at 100.
pub fn health_score(inputs: &HealthInputs) -> u32 {
    let mut score = 0u32;

    if inputs.signal_count == 0 && inputs.run_count > 10 {
        score += 25;
    }
    if inputs.avg_latency_ms > 5000 {
        score += 20;
    }
    if inputs.run_count > 50 && inputs.signal_count < 3 {
        score += 40;
    }
    if inputs.error_rate > 0.05 {
        score += 15;
    }
    if inputs.pnl_sum_bps < 0.0 {
        score += 20;
    }

    score.min(100)
}

/// Map a score to its label.
pub fn health_label(score: u32) -> HealthLabel {
    match score {
        80.. => HealthLabel::Retire,
        50..=79 => HealthLabel::Deprecate,
        30..=49 => HealthLabel::Watch,
        _ => HealthLabel::Healthy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_productive_agent_is_healthy() {
        let inputs = HealthInputs {
            signal_count: 12,
            run_count: 40,
            avg_latency_ms: 300,
            error_rate: 0.0,
            pnl_sum_bps: 85.0,
        };
        let score = health_score(&inputs);
        assert_eq!(score, 0);
        assert_eq!(health_label(score), HealthLabel::Healthy);
    }

    #[test]
    fn silent_agent_accumulates_drought_penalties() {
        let inputs = HealthInputs {
            signal_count: 0,
            run_count: 60,
            avg_latency_ms: 200,
            error_rate: 0.0,
            pnl_sum_bps: 0.0,
        };
        // drought (25) + long-run drought (40)
        assert_eq!(health_score(&inputs), 65);
        assert_eq!(health_label(65), HealthLabel::Deprecate);
    }

    #[test]
    fn everything_wrong_caps_at_100() {
        let inputs = HealthInputs {
            signal_count: 0,
            run_count: 100,
            avg_latency_ms: 9000,
            error_rate: 0.5,
            pnl_sum_bps: -300.0,
        };
        let score = health_score(&inputs);
        assert_eq!(score, 100);
        assert_eq!(health_label(score), HealthLabel::Retire);
    }

    #[test]
    fn label_boundaries() {
        assert_eq!(health_label(0), HealthLabel::Healthy);
        assert_eq!(health_label(29), HealthLabel::Healthy);
        assert_eq!(health_label(30), HealthLabel::Watch);
        assert_eq!(health_label(49), HealthLabel::Watch);
        assert_eq!(health_label(50), HealthLabel::Deprecate);
        assert_eq!(health_label(79), HealthLabel::Deprecate);
        assert_eq!(health_label(80), HealthLabel::Retire);
        assert_eq!(health_label(100), HealthLabel::Retire);
    }
}
