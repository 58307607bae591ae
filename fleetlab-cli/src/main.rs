//! FleetLab CLI — run agent backtests, evaluate gates, allocate capital,
//! build meta reports, and manage promotion approvals.
//!
//! Commands:
//! - `run` — replay one agent from the manifest
//! - `run-all` — replay the whole fleet in parallel
//! - `evaluate` — promotion/kill gates over the telemetry log
//! - `allocate` — capital weights + deployment simulation
//! - `report` — full meta-report pass (gates + clusters + allocation)
//! - `sign` / `clear-approval` / `approval-status` — approval workflow

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use fleetlab_core::agent::{AgentRegistry, Manifest};
use fleetlab_core::data::{load_price_store, synthetic_series, PriceStore};
use fleetlab_runner::allocator::{push_capped, sim_log_entry};
use fleetlab_runner::report::{build_meta_report, ReportConfig, ReportInputs, REPORT_FILE};
use fleetlab_runner::runner::{run_fleet, run_one, write_result_file, FleetRunConfig};
use fleetlab_runner::{
    compute_rolling, compute_weights, evaluate, simulate_deployment, AgentStanding,
    ApprovalPolicy, GateOutcome, LifecycleDecision, PromotableEntry, RunnerConfig, StateStore,
    TelemetryLog, votes_from_signals,
};

#[derive(Parser)]
#[command(name = "fleetlab", about = "FleetLab CLI — strategy fleet evaluation and governance")]
struct Cli {
    /// Path to a runner TOML config. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the agent manifest (TOML). Built-in demo fleet when omitted.
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    /// Directory of per-symbol price CSVs. Synthetic demo data when omitted.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Governance state directory.
    #[arg(long, global = true, default_value = "state")]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay one agent and write its result file.
    Run {
        /// Agent name from the manifest.
        agent: String,

        /// Backtest start date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Backtest end date (YYYY-MM-DD).
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Output directory for result files.
        #[arg(long, default_value = "results")]
        out: PathBuf,

        /// Also export the raw signal events as CSV.
        #[arg(long, default_value_t = false)]
        csv: bool,
    },
    /// Replay every manifest agent in parallel.
    RunAll {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, default_value = "results")]
        out: PathBuf,
    },
    /// Evaluate promotion/kill gates over the telemetry log.
    Evaluate {
        /// Telemetry JSONL path.
        #[arg(long, default_value = "telemetry/events.jsonl")]
        telemetry: PathBuf,
        /// Persist kill/promote outcomes into the state directory.
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
    /// Compute capital weights and simulate deployment.
    Allocate {
        #[arg(long, default_value = "telemetry/events.jsonl")]
        telemetry: PathBuf,
        /// Total capital for the deployment simulation.
        #[arg(long)]
        capital: Option<f64>,
    },
    /// Full meta-report pass: replay, gates, clusters, ensemble, allocation.
    Report {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, default_value = "telemetry/events.jsonl")]
        telemetry: PathBuf,
        #[arg(long, default_value = "results")]
        out: PathBuf,
    },
    /// Sign a promotion candidate.
    Sign {
        agent: String,
        /// Signer email; deduplicated case-insensitively.
        email: String,
    },
    /// Clear a candidate's signers, resetting it to PENDING.
    ClearApproval { agent: String },
    /// Show a candidate's approval status.
    ApprovalStatus { agent: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let runner_config = match &cli.config {
        Some(path) => RunnerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RunnerConfig::default(),
    };

    let manifest = match &cli.manifest {
        Some(path) => Manifest::load(path)
            .with_context(|| format!("loading manifest {}", path.display()))?,
        None => Manifest::demo(),
    };
    let registry = AgentRegistry::builtin();
    manifest.validate(&registry).context("manifest validation")?;

    let state = StateStore::new(cli.state_dir.clone());

    match cli.command {
        Commands::Run { agent, start, end, out, csv } => {
            let store = load_store(&cli.data_dir, &runner_config)?;
            let config = fleet_run_config(&runner_config, start, end);
            let artifacts = run_one(&agent, &manifest, &registry, &store, &config)?;
            let path = write_result_file(&out, &artifacts)?;
            if csv {
                let csv_path =
                    fleetlab_runner::export_signals_csv(&out, &agent, &artifacts.result.signals)?;
                println!("signals csv -> {}", csv_path.display());
            }
            println!(
                "{agent}: {} signals, {} errors -> {}",
                artifacts.result.signals.len(),
                artifacts.result.errors.len(),
                path.display()
            );
        }

        Commands::RunAll { start, end, out } => {
            let store = load_store(&cli.data_dir, &runner_config)?;
            let config = fleet_run_config(&runner_config, start, end);
            let outcomes = run_fleet(&manifest, &registry, &store, &config);
            for (name, outcome) in outcomes {
                match outcome {
                    Ok(artifacts) => {
                        let path = write_result_file(&out, &artifacts)?;
                        println!(
                            "{name}: {} signals, {} errors -> {}",
                            artifacts.result.signals.len(),
                            artifacts.result.errors.len(),
                            path.display()
                        );
                    }
                    Err(e) => println!("[FAIL] {name}: {e}"),
                }
            }
        }

        Commands::Evaluate { telemetry, apply } => {
            let log = TelemetryLog::new(telemetry);
            let thresholds = &runner_config.governance.thresholds;
            let agents = log.agents().context("reading telemetry")?;
            if agents.is_empty() {
                bail!("no telemetry records found");
            }
            for agent in agents {
                let records = log.read_agent(&agent)?;
                let rolling = compute_rolling(&records, thresholds.window);
                let outcome = evaluate(rolling.as_ref(), thresholds);
                println!("{agent}: {}", summarize(&outcome));

                if apply {
                    match &outcome {
                        GateOutcome::Decided {
                            decision: LifecycleDecision::Kill,
                            ..
                        } => {
                            state.kill_agent(&agent)?;
                        }
                        GateOutcome::Decided {
                            decision: LifecycleDecision::Promote,
                            metrics,
                            ..
                        } => {
                            state.promote_agent(PromotableEntry {
                                agent: agent.clone(),
                                promoted_at: Utc::now(),
                                metrics: metrics.clone(),
                            })?;
                        }
                        _ => {}
                    }
                }
            }
        }

        Commands::Allocate { telemetry, capital } => {
            let log = TelemetryLog::new(telemetry);
            let thresholds = &runner_config.governance.thresholds;
            let killed = state.killed_agents()?;
            let mut standings = BTreeMap::new();
            for agent in log.agents()? {
                let records = log.read_agent(&agent)?;
                if let Some(m) = compute_rolling(&records, thresholds.window) {
                    let decision = if killed.contains(&agent) {
                        LifecycleDecision::Kill
                    } else {
                        evaluate(Some(&m), thresholds)
                            .decision()
                            .unwrap_or(LifecycleDecision::Hold)
                    };
                    standings.insert(
                        agent,
                        AgentStanding {
                            pnl_sum_bps: m.rolling_pnl_bps,
                            decision,
                        },
                    );
                }
            }

            let weights = compute_weights(&standings, runner_config.governance.report.min_weight);
            if weights.is_empty() {
                println!("no positive alpha; no capital deployed");
                return Ok(());
            }
            let total_capital =
                capital.unwrap_or(runner_config.governance.report.total_capital);
            let deployment = simulate_deployment(&weights, total_capital);
            for line in &deployment {
                println!(
                    "{:<20} {:>7.2}%  ${:>12.2}",
                    line.agent, line.pct, line.allocation_usd
                );
            }

            let now = Utc::now();
            state.save_weights(&fleetlab_runner::CapitalWeights {
                generated_at: now,
                weights,
            })?;
            let mut sim_log = state.sim_log()?;
            push_capped(&mut sim_log, sim_log_entry(&deployment, now));
            state.save_sim_log(&sim_log)?;
        }

        Commands::Report { start, end, telemetry, out } => {
            let store = load_store(&cli.data_dir, &runner_config)?;
            let config = fleet_run_config(&runner_config, start, end);
            let outcomes = run_fleet(&manifest, &registry, &store, &config);

            let mut signal_returns = Vec::new();
            let mut all_signals = Vec::new();
            for (name, outcome) in outcomes {
                match outcome {
                    Ok(artifacts) => {
                        write_result_file(&out, &artifacts)?;
                        signal_returns.extend(artifacts.signal_returns.iter().cloned());
                        all_signals.extend(artifacts.result.signals.iter().cloned());
                    }
                    Err(e) => println!("[FAIL] {name}: {e}"),
                }
            }

            let log = TelemetryLog::new(telemetry);
            let inputs = ReportInputs {
                telemetry: log.read_all().context("reading telemetry")?,
                signal_returns,
                votes: votes_from_signals(&all_signals),
                killed: state.killed_agents()?,
                generated_at: Utc::now(),
            };
            let report_config: ReportConfig = runner_config.report_config();
            let report = build_meta_report(&inputs, &report_config);

            state.save_json(REPORT_FILE, &report)?;
            info!(path = %state.root().join(REPORT_FILE).display(), "meta report written");
            println!("{}", serde_json::to_string_pretty(&report.fleet)?);
        }

        Commands::Sign { agent, email } => {
            let policy = approval_policy(&runner_config);
            let mut book = state.approvals()?;
            book.sign(&agent, &email, &policy, Utc::now());
            state.save_approvals(&book)?;
            println!(
                "{agent}: {} qualifying signer(s), status {:?}",
                book.qualifying_signers(&agent, &policy).len(),
                book.status(&agent, &policy)
            );
        }

        Commands::ClearApproval { agent } => {
            let mut book = state.approvals()?;
            book.clear(&agent);
            state.save_approvals(&book)?;
            println!("{agent}: cleared, status PENDING");
        }

        Commands::ApprovalStatus { agent } => {
            let policy = approval_policy(&runner_config);
            let book = state.approvals()?;
            println!(
                "{agent}: status {:?}, signers {:?}",
                book.status(&agent, &policy),
                book.qualifying_signers(&agent, &policy)
            );
        }
    }

    Ok(())
}

/// Load the price snapshot: CSV directory when given, deterministic
/// synthetic fleet data otherwise.
fn load_store(data_dir: &Option<PathBuf>, config: &RunnerConfig) -> Result<Arc<PriceStore>> {
    let store = match data_dir {
        Some(dir) => {
            load_price_store(dir).with_context(|| format!("loading prices from {}", dir.display()))?
        }
        None => {
            let mut store = PriceStore::new();
            for (symbol, seed) in [("SPY", 1u64), ("QQQ", 2), ("IWM", 3), ("TLT", 4)] {
                store.insert(synthetic_series(
                    symbol,
                    config.backtest.start,
                    config.backtest.end,
                    seed,
                ));
            }
            store
        }
    };
    Ok(Arc::new(store))
}

fn fleet_run_config(
    config: &RunnerConfig,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> FleetRunConfig {
    let mut run = FleetRunConfig::new(
        start.unwrap_or(config.backtest.start),
        end.unwrap_or(config.backtest.end),
    );
    run.lookback = config.backtest.lookback;
    run.horizons = config.backtest.horizons.clone();
    run.cluster_horizon = config.backtest.cluster_horizon;
    run
}

fn approval_policy(config: &RunnerConfig) -> ApprovalPolicy {
    config.governance.approval.clone()
}

fn summarize(outcome: &GateOutcome) -> String {
    match outcome {
        GateOutcome::NoData { reason } => format!("NO DATA ({reason})"),
        GateOutcome::Decided {
            decision, reasons, ..
        } => format!("{decision:?} — {}", reasons.join("; ")),
    }
}
