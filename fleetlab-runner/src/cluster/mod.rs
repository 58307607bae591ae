//! Signal redundancy clustering.
//!
//! Agents whose forward-return behavior is statistically indistinguishable
//! add no diversification; this module finds them. Two input modes:
//!
//! 1. Per-agent forward-return vectors → pairwise correlation matrix →
//!    average-linkage agglomerative clustering at distance threshold
//!    `1 - correlation_threshold`.
//! 2. An explicit list of redundant pairs → disjoint-set union; groups of
//!    size >= 2 are redundant, singletons dropped.

pub mod disjoint_set;
pub mod redundancy;

pub use disjoint_set::DisjointSet;
pub use redundancy::{build_agent_vectors, select_representatives, RedundancyOutcome};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default correlation threshold above which two agents are redundant.
pub const DEFAULT_CORR_THRESHOLD: f64 = 0.75;

/// Pearson correlation of two equal-length vectors.
///
/// Degenerate inputs (length < 2, zero variance) return NaN, mirroring the
/// undefined statistic; callers replace NaN with 0 before clustering.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.len() < 2 {
        return f64::NAN;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

/// Pairwise correlation matrix with NaN replaced by 0.
pub fn correlation_matrix(vectors: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = vectors.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let c = pearson(&vectors[i], &vectors[j]);
            let c = if c.is_nan() { 0.0 } else { c };
            matrix[i][j] = c;
            matrix[j][i] = c;
        }
    }
    matrix
}

/// Agglomerative clustering with average linkage over a precomputed
/// distance matrix.
///
/// Starts from singletons and repeatedly merges the closest pair of
/// clusters while their average inter-cluster distance is strictly below
/// `distance_threshold`. Returns clusters as index sets, ordered by
/// smallest member.
pub fn agglomerative_average_linkage(
    distance: &[Vec<f64>],
    distance_threshold: f64,
) -> Vec<Vec<usize>> {
    let n = distance.len();
    let mut clusters: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

    loop {
        if clusters.len() < 2 {
            break;
        }
        // find the pair with minimum average linkage
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..clusters.len() {
            for j in (i + 1)..clusters.len() {
                let d = average_linkage(&clusters[i], &clusters[j], distance);
                if best.map_or(true, |(_, _, bd)| d < bd) {
                    best = Some((i, j, d));
                }
            }
        }
        match best {
            Some((i, j, d)) if d < distance_threshold => {
                let merged_in = clusters.remove(j);
                clusters[i].extend(merged_in);
                clusters[i].sort_unstable();
            }
            _ => break,
        }
    }

    clusters.sort_by_key(|c| c[0]);
    clusters
}

fn average_linkage(a: &[usize], b: &[usize], distance: &[Vec<f64>]) -> f64 {
    let mut sum = 0.0;
    for &i in a {
        for &j in b {
            sum += distance[i][j];
        }
    }
    sum / (a.len() * b.len()) as f64
}

/// Cluster named agent vectors by correlation similarity.
///
/// Fewer than two agents is a degenerate case: every agent stays a
/// singleton.
pub fn cluster_agents(
    vectors: &BTreeMap<String, Vec<f64>>,
    corr_threshold: f64,
) -> Vec<Vec<String>> {
    let agents: Vec<&String> = vectors.keys().collect();
    if agents.len() < 2 {
        return agents.iter().map(|a| vec![(*a).clone()]).collect();
    }

    let rows: Vec<Vec<f64>> = agents.iter().map(|a| vectors[*a].clone()).collect();
    let corr = correlation_matrix(&rows);
    let distance: Vec<Vec<f64>> = corr
        .iter()
        .map(|row| row.iter().map(|c| 1.0 - c).collect())
        .collect();

    agglomerative_average_linkage(&distance, 1.0 - corr_threshold)
        .into_iter()
        .map(|cluster| cluster.into_iter().map(|i| agents[i].clone()).collect())
        .collect()
}

/// Union explicit redundant pairs into groups; only groups of size >= 2
/// survive.
pub fn clusters_from_pairs(pairs: &[(String, String)]) -> Vec<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    let mut index: BTreeMap<String, usize> = BTreeMap::new();
    for (a, b) in pairs {
        for name in [a, b] {
            if !index.contains_key(name) {
                index.insert(name.clone(), names.len());
                names.push(name.clone());
            }
        }
    }

    let mut ds = DisjointSet::new(names.len());
    for (a, b) in pairs {
        ds.union(index[a.as_str()], index[b.as_str()]);
    }

    let mut groups: Vec<Vec<String>> = ds
        .groups()
        .into_iter()
        .filter(|g| g.len() >= 2)
        .map(|g| {
            let mut members: Vec<String> = g.into_iter().map(|i| names[i].clone()).collect();
            members.sort();
            members
        })
        .collect();
    groups.sort();
    groups
}

/// A cluster-level decision record carried into the meta report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterDecision {
    pub members: Vec<String>,
    pub representative: String,
    pub redundant: Vec<String>,
}
