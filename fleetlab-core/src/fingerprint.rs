//! Run fingerprints — content-addressed identity for a replay.
//!
//! Two runs with identical configuration and identical data carry the same
//! fingerprint, which is what lets a governance decision cite the exact
//! evaluation it was based on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Content hash identifying one replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub run_id: String,
    pub dataset_hash: String,
}

impl RunFingerprint {
    /// Hash the full replay identity: agent, window, frequency, lookback,
    /// and the dataset snapshot hash.
    pub fn compute(
        agent: &str,
        start: NaiveDate,
        end: NaiveDate,
        bars_freq: &str,
        lookback: usize,
        dataset_hash: &str,
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(agent.as_bytes());
        hasher.update(start.to_string().as_bytes());
        hasher.update(end.to_string().as_bytes());
        hasher.update(bars_freq.as_bytes());
        hasher.update(&(lookback as u64).to_le_bytes());
        hasher.update(dataset_hash.as_bytes());
        Self {
            run_id: hasher.finalize().to_hex().to_string(),
            dataset_hash: dataset_hash.to_string(),
        }
    }
}
