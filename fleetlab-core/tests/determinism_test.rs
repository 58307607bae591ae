//! Replay determinism — the property governance depends on.
//!
//! Two replays of the same agent over the same date range and price data
//! must produce identical signal sequences, identical error lists, and
//! identical forward-return metrics.

use std::sync::Arc;

use chrono::NaiveDate;
use fleetlab_core::agent::{AgentRegistry, Manifest};
use fleetlab_core::calendar::business_days;
use fleetlab_core::data::{synthetic_series, PriceStore};
use fleetlab_core::engine::{BacktestEngine, EngineConfig};
use fleetlab_core::metrics::{compute_forward_returns, DEFAULT_HORIZONS};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn demo_store() -> Arc<PriceStore> {
    let mut store = PriceStore::new();
    for (symbol, seed) in [("SPY", 1u64), ("QQQ", 2), ("IWM", 3)] {
        store.insert(synthetic_series(symbol, d(2022, 1, 3), d(2023, 12, 29), seed));
    }
    Arc::new(store)
}

#[test]
fn every_builtin_agent_replays_identically() {
    let store = demo_store();
    let calendar = business_days(d(2023, 1, 2), d(2023, 9, 29));
    let engine = BacktestEngine::new(calendar, Arc::clone(&store));
    let config = EngineConfig::new(d(2023, 1, 2), d(2023, 9, 29));

    let registry = AgentRegistry::builtin();
    let manifest = Manifest::demo();

    for entry in &manifest.agents {
        let mut first = registry.create(entry).unwrap();
        let mut second = registry.create(entry).unwrap();

        let a = engine.run_agent(&entry.name, &mut first, &config);
        let b = engine.run_agent(&entry.name, &mut second, &config);

        assert_eq!(a.signals, b.signals, "{}: signal streams differ", entry.name);
        assert_eq!(a.errors, b.errors, "{}: error lists differ", entry.name);
        assert_eq!(
            a.fingerprint, b.fingerprint,
            "{}: fingerprints differ",
            entry.name
        );

        let ma = compute_forward_returns(&a.signals, &store, &DEFAULT_HORIZONS);
        let mb = compute_forward_returns(&b.signals, &store, &DEFAULT_HORIZONS);
        assert_eq!(ma, mb, "{}: metrics differ", entry.name);
    }
}

#[test]
fn run_result_timestamps_non_decreasing() {
    let store = demo_store();
    let engine = BacktestEngine::new(business_days(d(2023, 1, 2), d(2023, 6, 30)), store);
    let config = EngineConfig::new(d(2023, 1, 2), d(2023, 6, 30));

    let registry = AgentRegistry::builtin();
    for entry in &Manifest::demo().agents {
        let mut adapter = registry.create(entry).unwrap();
        let result = engine.run_agent(&entry.name, &mut adapter, &config);
        for pair in result.signals.windows(2) {
            assert!(pair[0].ts <= pair[1].ts, "{}: out-of-order signals", entry.name);
        }
    }
}
