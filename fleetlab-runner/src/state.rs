//! Atomic JSON state store for governance files.
//!
//! Lifecycle lists, approval books, weights, and the simulation log are
//! read-modify-written by concurrent processes. Every save goes through
//! write-to-temp-then-rename in the same directory, so a reader never
//! observes a torn file and the last writer wins whole-file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::allocator::{CapitalWeights, SimLogEntry};
use crate::approval::ApprovalBook;
use crate::rolling::AgentRollingMetrics;

/// File names within the state directory.
const KILLED_AGENTS: &str = "killed_agents.json";
const KILLED_STRATEGIES: &str = "killed_strategies.json";
const PROMOTABLE: &str = "promotable_agents.json";
const APPROVALS: &str = "approvals.json";
const WEIGHTS: &str = "weights.json";
const SIM_LOG: &str = "sim_log.json";

/// Errors from the state store.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt state file {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A promotable-list entry: the metrics that earned promotion, stamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotableEntry {
    pub agent: String,
    pub promoted_at: DateTime<Utc>,
    pub metrics: AgentRollingMetrics,
}

/// Directory-rooted store of governance state files.
pub struct StateStore {
    root: PathBuf,
}

impl StateStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ── Generic atomic JSON I/O ──

    /// Load a JSON file; `None` when it does not exist.
    pub fn load_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StateError> {
        let path = self.root.join(name);
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StateError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| StateError::Corrupt {
                path: path.display().to_string(),
                source,
            })
    }

    /// Atomically replace a JSON file: write `<name>.tmp` in the same
    /// directory, then rename over the target.
    pub fn save_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StateError> {
        let path = self.root.join(name);
        let tmp = self.root.join(format!("{name}.tmp"));
        let io_err = |source| StateError::Io {
            path: path.display().to_string(),
            source,
        };

        fs::create_dir_all(&self.root).map_err(io_err)?;

        let json = serde_json::to_string_pretty(value).map_err(|source| StateError::Corrupt {
            path: path.display().to_string(),
            source,
        })?;

        {
            let mut file = fs::File::create(&tmp).map_err(io_err)?;
            file.write_all(json.as_bytes()).map_err(io_err)?;
            file.sync_all().map_err(io_err)?;
        }
        fs::rename(&tmp, &path).map_err(io_err)?;
        Ok(())
    }

    // ── Typed accessors ──

    pub fn killed_agents(&self) -> Result<Vec<String>, StateError> {
        Ok(self.load_json(KILLED_AGENTS)?.unwrap_or_default())
    }

    /// Add an agent to the killed list if absent. Returns the full list.
    pub fn kill_agent(&self, agent: &str) -> Result<Vec<String>, StateError> {
        let mut killed = self.killed_agents()?;
        if !killed.iter().any(|a| a == agent) {
            killed.push(agent.to_string());
            self.save_json(KILLED_AGENTS, &killed)?;
        }
        Ok(killed)
    }

    pub fn killed_strategies(&self) -> Result<Vec<String>, StateError> {
        Ok(self.load_json(KILLED_STRATEGIES)?.unwrap_or_default())
    }

    pub fn kill_strategy(&self, strategy: &str) -> Result<Vec<String>, StateError> {
        let mut killed = self.killed_strategies()?;
        if !killed.iter().any(|s| s == strategy) {
            killed.push(strategy.to_string());
            self.save_json(KILLED_STRATEGIES, &killed)?;
        }
        Ok(killed)
    }

    pub fn promotable(&self) -> Result<Vec<PromotableEntry>, StateError> {
        Ok(self.load_json(PROMOTABLE)?.unwrap_or_default())
    }

    /// Upsert a promotable entry (one per agent, newest wins).
    pub fn promote_agent(&self, entry: PromotableEntry) -> Result<(), StateError> {
        let mut list = self.promotable()?;
        list.retain(|e| e.agent != entry.agent);
        list.push(entry);
        self.save_json(PROMOTABLE, &list)
    }

    pub fn approvals(&self) -> Result<ApprovalBook, StateError> {
        Ok(self.load_json(APPROVALS)?.unwrap_or_default())
    }

    pub fn save_approvals(&self, book: &ApprovalBook) -> Result<(), StateError> {
        self.save_json(APPROVALS, book)
    }

    pub fn weights(&self) -> Result<Option<CapitalWeights>, StateError> {
        self.load_json(WEIGHTS)
    }

    pub fn save_weights(&self, weights: &CapitalWeights) -> Result<(), StateError> {
        self.save_json(WEIGHTS, weights)
    }

    pub fn sim_log(&self) -> Result<Vec<SimLogEntry>, StateError> {
        Ok(self.load_json(SIM_LOG)?.unwrap_or_default())
    }

    pub fn save_sim_log(&self, log: &[SimLogEntry]) -> Result<(), StateError> {
        self.save_json(SIM_LOG, &log)
    }
}
