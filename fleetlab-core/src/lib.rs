//! FleetLab Core — evaluation engine for signal-generating strategy agents.
//!
//! This crate contains the replay core:
//! - Domain types (severity, findings, signal events, step errors, bars)
//! - Trading calendar (business days, no holidays)
//! - Immutable price series with the point-in-time slicer (no-lookahead)
//! - Agent capability model, uniform adapter, registry, and manifest
//! - Sequential, deterministic backtest replay with per-step error isolation
//! - Forward-return metrics computer
//! - Content-addressed run fingerprints

pub mod agent;
pub mod calendar;
pub mod data;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod metrics;
