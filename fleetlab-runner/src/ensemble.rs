//! Ensemble voting — one consensus decision per redundant group.
//!
//! Votes map to scores {IGNORE: 0.0, WATCH: 0.5, ACT: 1.0}; the weighted
//! average sets the consensus and the number of distinct votes sets the
//! agreement. A cluster-level decision is what lets the fleet suppress
//! duplicate alerts from agents that fire together.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Categorical vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Vote {
    Ignore,
    Watch,
    Act,
}

impl Vote {
    pub fn score(&self) -> f64 {
        match self {
            Vote::Ignore => 0.0,
            Vote::Watch => 0.5,
            Vote::Act => 1.0,
        }
    }
}

/// Consensus thresholds on the weighted average score.
const ACT_THRESHOLD: f64 = 0.70;
const WATCH_THRESHOLD: f64 = 0.35;

/// Outcome of one ensemble vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleDecision {
    pub consensus: Vote,
    /// 1.0 when all votes agree; decays 0.35 per extra distinct vote.
    pub agreement: f64,
    /// Weighted average vote score.
    pub score: f64,
}

/// Weighted ensemble vote. Missing weights default to 1.0; a non-positive
/// total weight yields IGNORE with zero agreement.
pub fn ensemble_vote(
    votes: &BTreeMap<String, Vote>,
    weights: &BTreeMap<String, f64>,
) -> EnsembleDecision {
    let mut total_weight = 0.0;
    let mut weighted_score = 0.0;

    for (agent, vote) in votes {
        let w = weights.get(agent).copied().unwrap_or(1.0);
        total_weight += w;
        weighted_score += w * vote.score();
    }

    if total_weight <= 0.0 {
        return EnsembleDecision {
            consensus: Vote::Ignore,
            agreement: 0.0,
            score: 0.0,
        };
    }

    let avg = weighted_score / total_weight;
    let consensus = if avg >= ACT_THRESHOLD {
        Vote::Act
    } else if avg >= WATCH_THRESHOLD {
        Vote::Watch
    } else {
        Vote::Ignore
    };

    let distinct = votes
        .values()
        .collect::<std::collections::BTreeSet<_>>()
        .len()
        .max(1);
    let agreement = if distinct == 1 {
        1.0
    } else {
        (1.0 - (distinct as f64 - 1.0) * 0.35).max(0.0)
    };

    EnsembleDecision {
        consensus,
        agreement,
        score: avg,
    }
}

/// One cluster's ensemble outcome, with its membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterVote {
    pub members: Vec<String>,
    pub decision: EnsembleDecision,
}

/// Compute an ensemble decision per cluster.
///
/// Members without a vote are skipped (not defaulted); weights default to
/// 1.0 per member.
pub fn cluster_decisions(
    clusters: &[Vec<String>],
    votes: &BTreeMap<String, Vote>,
    weights: &BTreeMap<String, f64>,
) -> BTreeMap<String, ClusterVote> {
    let mut decisions = BTreeMap::new();
    for (i, members) in clusters.iter().enumerate() {
        let cluster_votes: BTreeMap<String, Vote> = members
            .iter()
            .filter_map(|m| votes.get(m).map(|v| (m.clone(), *v)))
            .collect();
        let cluster_weights: BTreeMap<String, f64> = members
            .iter()
            .map(|m| (m.clone(), weights.get(m).copied().unwrap_or(1.0)))
            .collect();

        decisions.insert(
            format!("cluster_{i}"),
            ClusterVote {
                members: members.clone(),
                decision: ensemble_vote(&cluster_votes, &cluster_weights),
            },
        );
    }
    decisions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn votes(entries: &[(&str, Vote)]) -> BTreeMap<String, Vote> {
        entries.iter().map(|(n, v)| (n.to_string(), *v)).collect()
    }

    #[test]
    fn unanimous_act() {
        let decision = ensemble_vote(&votes(&[("a", Vote::Act), ("b", Vote::Act)]), &BTreeMap::new());
        assert_eq!(decision.consensus, Vote::Act);
        assert_eq!(decision.agreement, 1.0);
        assert_eq!(decision.score, 1.0);
    }

    #[test]
    fn split_act_ignore_lands_on_watch() {
        let decision = ensemble_vote(
            &votes(&[("a", Vote::Act), ("b", Vote::Ignore)]),
            &BTreeMap::new(),
        );
        assert_eq!(decision.score, 0.5);
        assert_eq!(decision.consensus, Vote::Watch);
        assert!((decision.agreement - 0.65).abs() < 1e-12);
    }

    #[test]
    fn three_distinct_votes_decay_agreement_twice() {
        let decision = ensemble_vote(
            &votes(&[("a", Vote::Act), ("b", Vote::Watch), ("c", Vote::Ignore)]),
            &BTreeMap::new(),
        );
        assert!((decision.agreement - 0.30).abs() < 1e-12);
        assert_eq!(decision.consensus, Vote::Watch);
    }

    #[test]
    fn weights_shift_consensus() {
        let w = BTreeMap::from([("a".to_string(), 9.0), ("b".to_string(), 1.0)]);
        let decision = ensemble_vote(&votes(&[("a", Vote::Act), ("b", Vote::Ignore)]), &w);
        assert!((decision.score - 0.9).abs() < 1e-12);
        assert_eq!(decision.consensus, Vote::Act);
    }

    #[test]
    fn zero_total_weight_is_ignore() {
        let w = BTreeMap::from([("a".to_string(), 0.0)]);
        let decision = ensemble_vote(&votes(&[("a", Vote::Act)]), &w);
        assert_eq!(decision.consensus, Vote::Ignore);
        assert_eq!(decision.agreement, 0.0);
    }

    #[test]
    fn empty_votes_is_ignore() {
        let decision = ensemble_vote(&BTreeMap::new(), &BTreeMap::new());
        assert_eq!(decision.consensus, Vote::Ignore);
        assert_eq!(decision.agreement, 0.0);
    }

    #[test]
    fn consensus_boundaries_inclusive() {
        // average exactly 0.35 → WATCH
        let w = BTreeMap::from([("a".to_string(), 7.0), ("b".to_string(), 3.0)]);
        let d = ensemble_vote(&votes(&[("a", Vote::Watch), ("b", Vote::Ignore)]), &w);
        assert!((d.score - 0.35).abs() < 1e-12);
        assert_eq!(d.consensus, Vote::Watch);

        // average exactly 0.70 → ACT
        let w = BTreeMap::from([("a".to_string(), 3.0), ("b".to_string(), 7.0)]);
        let d = ensemble_vote(&votes(&[("a", Vote::Ignore), ("b", Vote::Act)]), &w);
        assert!((d.score - 0.70).abs() < 1e-12);
        assert_eq!(d.consensus, Vote::Act);

        // just under 0.70 stays WATCH
        let w = BTreeMap::from([("a".to_string(), 4.0), ("b".to_string(), 6.0)]);
        let d = ensemble_vote(&votes(&[("a", Vote::Ignore), ("b", Vote::Act)]), &w);
        assert_eq!(d.consensus, Vote::Watch);
    }

    #[test]
    fn per_cluster_decisions() {
        let clusters = vec![
            vec!["a".to_string(), "b".into()],
            vec!["c".to_string(), "d".into()],
        ];
        let all_votes = votes(&[
            ("a", Vote::Act),
            ("b", Vote::Act),
            ("c", Vote::Ignore),
            ("d", Vote::Ignore),
        ]);
        let decisions = cluster_decisions(&clusters, &all_votes, &BTreeMap::new());
        assert_eq!(decisions["cluster_0"].decision.consensus, Vote::Act);
        assert_eq!(decisions["cluster_1"].decision.consensus, Vote::Ignore);
        assert_eq!(decisions["cluster_0"].members, clusters[0]);
    }

    #[test]
    fn members_without_votes_are_skipped() {
        let clusters = vec![vec!["a".to_string(), "ghost".into()]];
        let decisions = cluster_decisions(&clusters, &votes(&[("a", Vote::Act)]), &BTreeMap::new());
        let d = &decisions["cluster_0"].decision;
        assert_eq!(d.consensus, Vote::Act);
        assert_eq!(d.agreement, 1.0, "only the voting member counts");
    }
}
