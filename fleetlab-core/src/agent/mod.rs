//! Agent model — capability shapes, the uniform adapter, and the replay
//! context.
//!
//! A strategy implementation exposes one of two capability shapes:
//! - **Analyze**: one-shot `analyze(context) → findings`.
//! - **PlanAct**: `plan(context) → plan`, then `act(context, plan) → findings`.
//!
//! The adapter resolves which shape is present exactly once, at
//! construction, and every replay step goes through the single
//! `produce_findings` operation.
//!
//! External invariant (documented, not enforced here): during replay an
//! agent must not touch the network or the live clock. Everything it needs
//! arrives through [`AgentContext`].

pub mod builtin;
pub mod registry;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::PriceStore;
use crate::domain::{Finding, PriceBar};

pub use registry::{AgentRegistry, ConfigError, Manifest, ManifestEntry};

// ─── Context ─────────────────────────────────────────────────────────

/// Point-in-time view handed to an agent for one replay step.
///
/// Price access goes through [`AgentContext::frame`], which slices the
/// shared snapshot as-of the step date — an agent cannot observe a bar
/// dated after `asof` through this type.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub asof: NaiveDate,
    pub lookback: usize,
    pub meta: BTreeMap<String, String>,
    store: Arc<PriceStore>,
}

impl AgentContext {
    pub fn new(asof: NaiveDate, lookback: usize, store: Arc<PriceStore>) -> Self {
        Self {
            asof,
            lookback,
            meta: BTreeMap::new(),
            store,
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// The point-in-time bar window for `symbol`, empty-handed if the
    /// symbol is unknown.
    pub fn frame(&self, symbol: &str) -> Option<&[PriceBar]> {
        self.store
            .get(symbol)
            .map(|s| s.slice_asof(self.asof, self.lookback))
    }

    /// Symbols available in the snapshot.
    pub fn symbols(&self) -> Vec<&str> {
        self.store.symbols().collect()
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Failure raised by an agent during a single replay step.
///
/// The engine records it and continues; it never aborts a run.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("execution failed: {0}")]
    Execution(String),
    #[error("required data missing: {0}")]
    MissingData(String),
}

// ─── Capability shapes ───────────────────────────────────────────────

/// One-shot analysis capability.
pub trait AnalysisAgent: Send {
    fn analyze(&mut self, ctx: &AgentContext) -> Result<Vec<Finding>, AgentError>;
}

/// An intermediate plan produced by a two-step agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentPlan {
    /// Symbols (or other work items) the act step should inspect.
    pub targets: Vec<String>,
    /// Free-form plan notes.
    pub notes: BTreeMap<String, String>,
}

/// Two-step plan/act capability.
pub trait PlanActAgent: Send {
    fn plan(&mut self, ctx: &AgentContext) -> AgentPlan;
    fn act(&mut self, ctx: &AgentContext, plan: AgentPlan) -> Result<Vec<Finding>, AgentError>;
}

/// Tagged union of the two capability shapes, resolved at construction.
pub enum AgentCapability {
    Analyze(Box<dyn AnalysisAgent>),
    PlanAct(Box<dyn PlanActAgent>),
}

impl std::fmt::Debug for AgentCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentCapability::Analyze(_) => f.write_str("AgentCapability::Analyze"),
            AgentCapability::PlanAct(_) => f.write_str("AgentCapability::PlanAct"),
        }
    }
}

// ─── Adapter ─────────────────────────────────────────────────────────

/// Uniform wrapper: whichever shape the strategy exposes, replay sees one
/// `produce_findings` operation.
#[derive(Debug)]
pub struct AgentAdapter {
    capability: AgentCapability,
}

impl AgentAdapter {
    pub fn new(capability: AgentCapability) -> Self {
        Self { capability }
    }

    pub fn analyze(agent: impl AnalysisAgent + 'static) -> Self {
        Self::new(AgentCapability::Analyze(Box::new(agent)))
    }

    pub fn plan_act(agent: impl PlanActAgent + 'static) -> Self {
        Self::new(AgentCapability::PlanAct(Box::new(agent)))
    }

    /// Produce findings for one replay step.
    pub fn produce_findings(&mut self, ctx: &AgentContext) -> Result<Vec<Finding>, AgentError> {
        match &mut self.capability {
            AgentCapability::Analyze(agent) => agent.analyze(ctx),
            AgentCapability::PlanAct(agent) => {
                let plan = agent.plan(ctx);
                agent.act(ctx, plan)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{synthetic_series, PriceStore};
    use crate::domain::Severity;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn ctx(asof: NaiveDate) -> AgentContext {
        let mut store = PriceStore::new();
        store.insert(synthetic_series("SPY", d(2023, 1, 2), d(2023, 12, 29), 3));
        AgentContext::new(asof, 60, Arc::new(store))
    }

    struct OneShot;
    impl AnalysisAgent for OneShot {
        fn analyze(&mut self, _ctx: &AgentContext) -> Result<Vec<Finding>, AgentError> {
            Ok(vec![Finding::new(Severity::Low, 0.4, "one-shot")])
        }
    }

    struct TwoStep;
    impl PlanActAgent for TwoStep {
        fn plan(&mut self, ctx: &AgentContext) -> AgentPlan {
            AgentPlan {
                targets: ctx.symbols().iter().map(|s| s.to_string()).collect(),
                notes: BTreeMap::new(),
            }
        }
        fn act(
            &mut self,
            _ctx: &AgentContext,
            plan: AgentPlan,
        ) -> Result<Vec<Finding>, AgentError> {
            Ok(plan
                .targets
                .iter()
                .map(|t| Finding::new(Severity::Medium, 0.5, "two-step").with_symbol(t.clone()))
                .collect())
        }
    }

    #[test]
    fn adapter_uniform_over_analyze_shape() {
        let mut adapter = AgentAdapter::analyze(OneShot);
        let findings = adapter.produce_findings(&ctx(d(2023, 6, 1))).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].title, "one-shot");
    }

    #[test]
    fn adapter_uniform_over_plan_act_shape() {
        let mut adapter = AgentAdapter::plan_act(TwoStep);
        let findings = adapter.produce_findings(&ctx(d(2023, 6, 1))).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].symbol.as_deref(), Some("SPY"));
    }

    #[test]
    fn context_frame_is_point_in_time() {
        let c = ctx(d(2023, 3, 15));
        let frame = c.frame("SPY").unwrap();
        assert!(!frame.is_empty());
        assert!(frame.iter().all(|b| b.date <= d(2023, 3, 15)));
        assert!(frame.len() <= 60);
        assert!(c.frame("UNKNOWN").is_none());
    }
}
