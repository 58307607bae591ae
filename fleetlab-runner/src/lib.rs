//! FleetLab Runner — governance over a fleet of strategy agents.
//!
//! Builds on `fleetlab-core` to provide:
//! - Telemetry event log (append-only JSONL) and rolling metrics
//! - Promotion/kill gates with kill precedence and reason strings
//! - Advisory agent health scoring
//! - Signal redundancy clustering (correlation + union-find modes)
//! - Cluster-level ensemble voting
//! - Capital allocation with floor + renormalization, plus deployment
//!   simulation and a capped rolling log
//! - Multi-signer promotion approval workflow
//! - Atomic JSON state store for lifecycle/approval/weights files
//! - Meta report aggregation and per-agent result files
//! - Parallel fleet runner

pub mod allocator;
pub mod approval;
pub mod cluster;
pub mod config;
pub mod ensemble;
pub mod export;
pub mod gates;
pub mod health;
pub mod report;
pub mod rolling;
pub mod runner;
pub mod state;
pub mod telemetry;

pub use allocator::{
    compute_weights, simulate_deployment, AgentStanding, CapitalWeights, DeploymentLine,
    SimLogEntry,
};
pub use approval::{ApprovalBook, ApprovalPolicy, ApprovalStatus};
pub use cluster::{
    cluster_agents, clusters_from_pairs, ClusterDecision, DisjointSet, RedundancyOutcome,
};
pub use config::{RunnerConfig, ConfigFileError};
pub use ensemble::{cluster_decisions, ensemble_vote, EnsembleDecision, Vote};
pub use export::export_signals_csv;
pub use gates::{check_kill, check_promotion, evaluate, GateOutcome, GateThresholds, LifecycleDecision};
pub use health::{health_label, health_score, HealthInputs, HealthLabel};
pub use report::{build_meta_report, votes_from_signals, MetaReport, ReportConfig, ReportInputs};
pub use rolling::{compute_rolling, AgentRollingMetrics};
pub use runner::{run_fleet, run_one, write_result_file, AgentRunArtifacts, FleetRunConfig, RunError};
pub use state::{PromotableEntry, StateError, StateStore};
pub use telemetry::{TelemetryLog, TelemetryRecord};
