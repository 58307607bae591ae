//! Signal events — what agents emit and what the replay engine records.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Ordered signal severity: `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities in ascending order. Used by metric partitions so that
    /// every bucket appears in output even when empty.
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// One observation an agent returns for a single replay step.
///
/// Confidence is clamped into `[0, 1]` at construction; the invariant holds
/// for every finding that reaches the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub symbol: Option<String>,
    pub market_type: Option<String>,
    pub severity: Severity,
    pub confidence: f64,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Finding {
    pub fn new(severity: Severity, confidence: f64, title: impl Into<String>) -> Self {
        Self {
            symbol: None,
            market_type: None,
            severity,
            confidence: confidence.clamp(0.0, 1.0),
            title: title.into(),
            description: String::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_market_type(mut self, market_type: impl Into<String>) -> Self {
        self.market_type = Some(market_type.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A finding stamped with the agent and replay timestamp that produced it.
///
/// Produced only by the replay engine; immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub agent: String,
    pub ts: NaiveDate,
    pub symbol: Option<String>,
    pub market_type: Option<String>,
    pub severity: Severity,
    pub confidence: f64,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl SignalEvent {
    /// Stamp a finding with its provenance.
    pub fn from_finding(agent: &str, ts: NaiveDate, finding: Finding) -> Self {
        Self {
            agent: agent.to_string(),
            ts,
            symbol: finding.symbol,
            market_type: finding.market_type,
            severity: finding.severity,
            confidence: finding.confidence.clamp(0.0, 1.0),
            title: finding.title,
            description: finding.description,
            metadata: finding.metadata,
        }
    }
}

/// Structured record of a single failed replay step.
///
/// The step is recorded and replay continues; one bad step never aborts a
/// run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepError {
    pub agent: String,
    pub ts: NaiveDate,
    pub error: String,
    /// Abbreviated context chain of the failure, outermost first.
    pub trace: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_serde_lowercase() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let back: Severity = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(back, Severity::Medium);
    }

    #[test]
    fn finding_clamps_confidence() {
        let high = Finding::new(Severity::High, 1.7, "spike");
        assert_eq!(high.confidence, 1.0);
        let low = Finding::new(Severity::Low, -0.2, "dip");
        assert_eq!(low.confidence, 0.0);
    }

    #[test]
    fn event_carries_provenance() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let finding = Finding::new(Severity::Medium, 0.6, "breakout")
            .with_symbol("SPY")
            .with_metadata("lookback", serde_json::json!(20));
        let event = SignalEvent::from_finding("momo", ts, finding);
        assert_eq!(event.agent, "momo");
        assert_eq!(event.ts, ts);
        assert_eq!(event.symbol.as_deref(), Some("SPY"));
        assert_eq!(event.metadata["lookback"], serde_json::json!(20));
    }
}
