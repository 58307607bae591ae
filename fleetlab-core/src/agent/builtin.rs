//! Built-in demo agents.
//!
//! These give the CLI and tests real strategies to drive. Two expose the
//! one-shot analyze shape; the drawdown watcher deliberately exposes the
//! two-step plan/act shape so both adapter variants stay exercised.

use std::collections::BTreeMap;

use crate::domain::{Finding, PriceBar, Severity};

use super::{
    AgentAdapter, AgentContext, AgentError, AgentPlan, AnalysisAgent, PlanActAgent,
};

fn param(params: &BTreeMap<String, f64>, name: &str, default: f64) -> f64 {
    params.get(name).copied().unwrap_or(default)
}

// ─── Momentum breakout ───────────────────────────────────────────────

/// Fires when the latest close exceeds the prior `lookback`-bar high.
pub struct MomentumBreakoutAgent {
    lookback: usize,
}

impl MomentumBreakoutAgent {
    pub fn new(lookback: usize) -> Self {
        Self { lookback }
    }
}

impl AnalysisAgent for MomentumBreakoutAgent {
    fn analyze(&mut self, ctx: &AgentContext) -> Result<Vec<Finding>, AgentError> {
        let mut findings = Vec::new();
        for symbol in ctx.symbols() {
            let frame = match ctx.frame(symbol) {
                Some(f) if f.len() > self.lookback => f,
                _ => continue,
            };
            let (history, last) = frame.split_at(frame.len() - 1);
            let window = &history[history.len().saturating_sub(self.lookback)..];
            let prior_high = window.iter().map(|b| b.close).fold(f64::MIN, f64::max);
            let close = last[0].close;
            if close > prior_high {
                let margin = (close - prior_high) / prior_high;
                let severity = if margin > 0.02 {
                    Severity::High
                } else {
                    Severity::Medium
                };
                findings.push(
                    Finding::new(severity, (0.5 + margin * 10.0).clamp(0.0, 0.95), "momentum breakout")
                        .with_symbol(symbol)
                        .with_market_type("equity")
                        .with_description(format!(
                            "close {close:.2} above prior {}-bar high {prior_high:.2}",
                            self.lookback
                        ))
                        .with_metadata("margin", serde_json::json!(margin)),
                );
            }
        }
        Ok(findings)
    }
}

/// Factory for the registry.
pub fn momentum_breakout(params: &BTreeMap<String, f64>) -> AgentAdapter {
    AgentAdapter::analyze(MomentumBreakoutAgent::new(
        param(params, "lookback", 50.0) as usize
    ))
}

// ─── Volatility spike ────────────────────────────────────────────────

/// Fires when the latest daily return is a `z_threshold` outlier against
/// the trailing return distribution.
pub struct VolatilitySpikeAgent {
    z_threshold: f64,
}

impl VolatilitySpikeAgent {
    pub fn new(z_threshold: f64) -> Self {
        Self { z_threshold }
    }

    fn daily_returns(frame: &[PriceBar]) -> Vec<f64> {
        frame
            .windows(2)
            .map(|w| {
                if w[0].close > 0.0 {
                    (w[1].close - w[0].close) / w[0].close
                } else {
                    0.0
                }
            })
            .collect()
    }
}

impl AnalysisAgent for VolatilitySpikeAgent {
    fn analyze(&mut self, ctx: &AgentContext) -> Result<Vec<Finding>, AgentError> {
        let mut findings = Vec::new();
        for symbol in ctx.symbols() {
            let frame = match ctx.frame(symbol) {
                Some(f) if f.len() >= 20 => f,
                _ => continue,
            };
            let returns = Self::daily_returns(frame);
            let (history, last) = returns.split_at(returns.len() - 1);
            let mean = history.iter().sum::<f64>() / history.len() as f64;
            let var = history.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
                / (history.len().saturating_sub(1).max(1)) as f64;
            let std = var.sqrt();
            if std < 1e-12 {
                continue;
            }
            let z = (last[0] - mean).abs() / std;
            if z >= self.z_threshold {
                let severity = if z >= self.z_threshold * 2.0 {
                    Severity::Critical
                } else {
                    Severity::High
                };
                findings.push(
                    Finding::new(severity, (z / (z + 2.0)).clamp(0.0, 1.0), "volatility spike")
                        .with_symbol(symbol)
                        .with_market_type("equity")
                        .with_description(format!("daily move {z:.1} sigma vs trailing window"))
                        .with_metadata("z_score", serde_json::json!(z)),
                );
            }
        }
        Ok(findings)
    }
}

pub fn volatility_spike(params: &BTreeMap<String, f64>) -> AgentAdapter {
    AgentAdapter::analyze(VolatilitySpikeAgent::new(param(params, "z_threshold", 3.0)))
}

// ─── Drawdown watcher (plan/act shape) ───────────────────────────────

/// Plans the symbol list, then flags symbols trading below their running
/// peak by more than `max_drawdown`.
pub struct DrawdownWatcherAgent {
    max_drawdown: f64,
}

impl DrawdownWatcherAgent {
    pub fn new(max_drawdown: f64) -> Self {
        Self { max_drawdown }
    }
}

impl PlanActAgent for DrawdownWatcherAgent {
    fn plan(&mut self, ctx: &AgentContext) -> AgentPlan {
        AgentPlan {
            targets: ctx.symbols().iter().map(|s| s.to_string()).collect(),
            notes: BTreeMap::from([(
                "threshold".to_string(),
                format!("{:.3}", self.max_drawdown),
            )]),
        }
    }

    fn act(&mut self, ctx: &AgentContext, plan: AgentPlan) -> Result<Vec<Finding>, AgentError> {
        let mut findings = Vec::new();
        for symbol in &plan.targets {
            let frame = match ctx.frame(symbol) {
                Some(f) if f.len() >= 2 => f,
                _ => continue,
            };
            let peak = frame.iter().map(|b| b.close).fold(f64::MIN, f64::max);
            let last = frame.last().map(|b| b.close).unwrap_or_default();
            if peak <= 0.0 {
                continue;
            }
            let drawdown = (last - peak) / peak;
            if drawdown < -self.max_drawdown {
                let depth = drawdown.abs();
                let severity = if depth > self.max_drawdown * 2.0 {
                    Severity::Critical
                } else {
                    Severity::High
                };
                findings.push(
                    Finding::new(severity, (depth * 4.0).clamp(0.0, 0.9), "drawdown breach")
                        .with_symbol(symbol.clone())
                        .with_market_type("equity")
                        .with_description(format!(
                            "{:.1}% below window peak (threshold {:.1}%)",
                            depth * 100.0,
                            self.max_drawdown * 100.0
                        ))
                        .with_metadata("drawdown", serde_json::json!(drawdown)),
                );
            }
        }
        Ok(findings)
    }
}

pub fn drawdown_watcher(params: &BTreeMap<String, f64>) -> AgentAdapter {
    AgentAdapter::plan_act(DrawdownWatcherAgent::new(param(
        params,
        "max_drawdown",
        0.10,
    )))
}
