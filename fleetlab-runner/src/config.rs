//! Runner configuration — the TOML file the CLI reads.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::approval::ApprovalPolicy;
use crate::gates::GateThresholds;
use crate::report::ReportConfig;

/// Errors loading the runner config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Backtest window section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub lookback: usize,
    pub horizons: Vec<usize>,
    pub cluster_horizon: usize,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            lookback: 252,
            horizons: vec![1, 5, 20, 60],
            cluster_horizon: 20,
        }
    }
}

/// Governance section: gate thresholds, clustering, allocation, approvals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GovernanceSection {
    #[serde(default)]
    pub thresholds: GateThresholds,
    #[serde(default)]
    pub report: ReportSection,
    #[serde(default)]
    pub approval: ApprovalPolicy,
}

/// Report tunables kept flat for TOML ergonomics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub corr_threshold: f64,
    pub min_weight: f64,
    pub total_capital: f64,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            corr_threshold: crate::cluster::DEFAULT_CORR_THRESHOLD,
            min_weight: crate::allocator::DEFAULT_MIN_WEIGHT,
            total_capital: 100_000.0,
        }
    }
}

/// Full runner configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub backtest: BacktestSection,
    #[serde(default)]
    pub governance: GovernanceSection,
}

impl RunnerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigFileError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Assemble the aggregator config from the governance section.
    pub fn report_config(&self) -> ReportConfig {
        ReportConfig {
            thresholds: self.governance.thresholds.clone(),
            corr_threshold: self.governance.report.corr_threshold,
            min_weight: self.governance.report.min_weight,
            total_capital: self.governance.report.total_capital,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_production_values() {
        let config = RunnerConfig::default();
        assert_eq!(config.governance.thresholds.window, 50);
        assert_eq!(config.governance.thresholds.promote_min_pnl_bps, 150.0);
        assert_eq!(config.governance.approval.threshold, 2);
        assert_eq!(config.backtest.cluster_horizon, 20);
    }

    #[test]
    fn toml_round_trip() {
        let config = RunnerConfig::default();
        let text = toml::to_string(&config).unwrap();
        let back: RunnerConfig = toml::from_str(&text).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let text = r#"
            [governance.thresholds]
            window = 25
            kill_last5_pnl_bps = -50.0
            kill_error_rate = 0.1
            promote_min_pnl_bps = 200.0
            promote_max_latency_ms = 500
        "#;
        let config: RunnerConfig = toml::from_str(text).unwrap();
        assert_eq!(config.governance.thresholds.window, 25);
        // untouched sections fall back to defaults
        assert_eq!(config.backtest.lookback, 252);
        assert_eq!(config.governance.report.total_capital, 100_000.0);
    }

    #[test]
    fn report_config_mirrors_sections() {
        let config = RunnerConfig::default();
        let report = config.report_config();
        assert_eq!(report.thresholds, config.governance.thresholds);
        assert_eq!(report.min_weight, crate::allocator::DEFAULT_MIN_WEIGHT);
    }
}
