//! Agent registry and manifest.
//!
//! The registry is an explicit, validated table mapping agent kinds to
//! factory functions. The manifest (TOML) maps fleet agent names to a
//! registered kind plus parameters. Both fail fast: requesting an unknown
//! name or kind is a fatal configuration error raised before any replay
//! step runs.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::builtin;
use super::AgentAdapter;

/// Fatal configuration errors. These abort an entire run before replay.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("agent '{0}' not found in manifest")]
    UnknownAgent(String),
    #[error("unknown agent kind '{kind}' for agent '{agent}'")]
    UnknownKind { agent: String, kind: String },
    #[error("duplicate agent name '{0}' in manifest")]
    DuplicateAgent(String),
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Factory: parameters in, ready adapter out.
pub type AgentFactory = fn(&BTreeMap<String, f64>) -> AgentAdapter;

/// Validated table of agent kinds.
pub struct AgentRegistry {
    factories: BTreeMap<String, AgentFactory>,
}

impl AgentRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry preloaded with the built-in demo agents.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("momentum_breakout", builtin::momentum_breakout);
        registry.register("volatility_spike", builtin::volatility_spike);
        registry.register("drawdown_watcher", builtin::drawdown_watcher);
        registry
    }

    pub fn register(&mut self, kind: impl Into<String>, factory: AgentFactory) {
        self.factories.insert(kind.into(), factory);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|k| k.as_str())
    }

    /// Instantiate an adapter for a manifest entry.
    pub fn create(&self, entry: &ManifestEntry) -> Result<AgentAdapter, ConfigError> {
        let factory = self
            .factories
            .get(&entry.kind)
            .ok_or_else(|| ConfigError::UnknownKind {
                agent: entry.name.clone(),
                kind: entry.kind.clone(),
            })?;
        Ok(factory(&entry.params))
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ─── Manifest ────────────────────────────────────────────────────────

/// One fleet agent: a name, the registered kind implementing it, and its
/// parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub kind: String,
    /// Optional offline evaluation-suite path, carried opaquely for
    /// external tooling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_suite: Option<String>,
    /// Scalar parameters handed to the agent factory. Kept last so TOML
    /// serialization emits values before the table.
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

/// The fleet manifest: which agents exist and how to build them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub agents: Vec<ManifestEntry>,
}

impl Manifest {
    /// Load and structurally validate a TOML manifest.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let manifest: Manifest =
            toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        manifest.check_unique_names()?;
        Ok(manifest)
    }

    /// Look up an agent by name. Absence is the fatal configuration error
    /// that aborts a run before replay starts.
    pub fn entry(&self, name: &str) -> Result<&ManifestEntry, ConfigError> {
        self.agents
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| ConfigError::UnknownAgent(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.agents.iter().map(|a| a.name.as_str())
    }

    /// Cross-check every entry against the registry, failing fast on the
    /// first unknown kind.
    pub fn validate(&self, registry: &AgentRegistry) -> Result<(), ConfigError> {
        self.check_unique_names()?;
        for entry in &self.agents {
            if !registry.contains(&entry.kind) {
                return Err(ConfigError::UnknownKind {
                    agent: entry.name.clone(),
                    kind: entry.kind.clone(),
                });
            }
        }
        Ok(())
    }

    /// A manifest covering every built-in kind — the CLI demo fleet.
    pub fn demo() -> Self {
        Self {
            agents: vec![
                ManifestEntry {
                    name: "momo-50".into(),
                    kind: "momentum_breakout".into(),
                    params: BTreeMap::from([("lookback".into(), 50.0)]),
                    eval_suite: None,
                },
                ManifestEntry {
                    name: "vol-watch".into(),
                    kind: "volatility_spike".into(),
                    params: BTreeMap::from([("z_threshold".into(), 2.5)]),
                    eval_suite: None,
                },
                ManifestEntry {
                    name: "dd-sentinel".into(),
                    kind: "drawdown_watcher".into(),
                    params: BTreeMap::from([("max_drawdown".into(), 0.10)]),
                    eval_suite: None,
                },
            ],
        }
    }

    fn check_unique_names(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::BTreeSet::new();
        for entry in &self.agents {
            if !seen.insert(entry.name.as_str()) {
                return Err(ConfigError::DuplicateAgent(entry.name.clone()));
            }
        }
        Ok(())
    }
}
