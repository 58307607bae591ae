//! Redundancy selection — vectors from forward-return records, cluster
//! representatives, and the redundant remainder.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use fleetlab_core::metrics::SignalReturn;

use super::ClusterDecision;

/// Minimum per-agent observations before clustering is attempted.
pub const MIN_OBSERVATIONS: usize = 2;

/// Result of a redundancy pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedundancyOutcome {
    pub clusters: Vec<ClusterDecision>,
    /// Agents flagged as candidates for down-weighting.
    pub redundant: Vec<String>,
    /// Why clustering was skipped, when it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped_reason: Option<String>,
}

impl RedundancyOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            clusters: Vec::new(),
            redundant: Vec::new(),
            skipped_reason: Some(reason.into()),
        }
    }
}

/// Build per-agent forward-return vectors truncated to a common trailing
/// length.
///
/// Returns an empty map when the common length is below
/// [`MIN_OBSERVATIONS`] — the caller then reports every agent as its own
/// singleton instead of clustering.
pub fn build_agent_vectors(records: &[SignalReturn]) -> BTreeMap<String, Vec<f64>> {
    let mut series: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in records {
        series
            .entry(record.agent.clone())
            .or_default()
            .push(record.forward_return);
    }
    if series.is_empty() {
        return series;
    }

    let min_len = series.values().map(Vec::len).min().unwrap_or(0);
    if min_len < MIN_OBSERVATIONS {
        return BTreeMap::new();
    }

    series
        .into_iter()
        .map(|(agent, v)| {
            let start = v.len() - min_len;
            (agent, v[start..].to_vec())
        })
        .collect()
}

/// Keep the best-scoring agent per cluster; flag the rest redundant.
///
/// Agents without a score rank below every scored agent. Ties break by
/// name for determinism.
pub fn select_representatives(
    clusters: &[Vec<String>],
    scores: &BTreeMap<String, f64>,
) -> RedundancyOutcome {
    let mut decisions = Vec::new();
    let mut redundant = Vec::new();

    for members in clusters {
        if members.is_empty() {
            continue;
        }
        let mut ranked: Vec<&String> = members.iter().collect();
        ranked.sort_by(|a, b| {
            let sa = scores.get(*a).copied().unwrap_or(f64::NEG_INFINITY);
            let sb = scores.get(*b).copied().unwrap_or(f64::NEG_INFINITY);
            sb.partial_cmp(&sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.cmp(b))
        });

        let representative = ranked[0].clone();
        let losers: Vec<String> = ranked[1..].iter().map(|a| (*a).clone()).collect();
        redundant.extend(losers.iter().cloned());

        decisions.push(ClusterDecision {
            members: members.clone(),
            representative,
            redundant: losers,
        });
    }

    redundant.sort();
    RedundancyOutcome {
        clusters: decisions,
        redundant,
        skipped_reason: None,
    }
}
