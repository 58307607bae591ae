//! Telemetry event log — append-only JSONL.
//!
//! One JSON object per line: agent id, run id, timestamp, realized PnL in
//! basis points, latency, error flag. The format is resilient to partial
//! writes: readers skip malformed lines instead of failing, and no
//! incremental state is trusted across processes — rolling metrics are
//! recomputed from this log on every evaluation.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One reconciled execution record for an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub agent: String,
    pub run_id: String,
    pub ts: DateTime<Utc>,
    /// Realized PnL attributed to this run, in basis points.
    pub realized_pnl_bps: f64,
    pub latency_ms: u64,
    /// True when the run reported an execution error.
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
}

/// Append-only JSONL log handle.
pub struct TelemetryLog {
    path: PathBuf,
}

impl TelemetryLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, creating parent directories on first write.
    pub fn append(&self, record: &TelemetryRecord) -> io::Result<()> {
        let json = serde_json::to_string(record)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{json}")?;
        file.flush()?;
        Ok(())
    }

    /// Read every record, skipping blank and malformed lines.
    pub fn read_all(&self) -> io::Result<Vec<TelemetryRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&self.path)?;
        let reader = io::BufReader::new(file);
        let mut records = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<TelemetryRecord>(&line) {
                Ok(record) => records.push(record),
                Err(_) => continue, // skip malformed lines
            }
        }
        Ok(records)
    }

    /// Records for one agent, in file (append) order.
    pub fn read_agent(&self, agent: &str) -> io::Result<Vec<TelemetryRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.agent == agent)
            .collect())
    }

    /// Distinct agent ids present in the log, sorted.
    pub fn agents(&self) -> io::Result<Vec<String>> {
        let mut agents: Vec<String> = self
            .read_all()?
            .into_iter()
            .map(|r| r.agent)
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        agents.sort();
        Ok(agents)
    }
}
