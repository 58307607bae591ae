//! Seeded synthetic price generator for tests, benches, and the CLI demo
//! path.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::calendar::business_days;
use crate::domain::PriceBar;

use super::series::PriceSeries;

/// Generate a business-day random-walk series.
///
/// Deterministic per `(symbol, seed)`: the same inputs always produce the
/// same bars, so fixtures built on this are replay-stable.
pub fn synthetic_series(
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    seed: u64,
) -> PriceSeries {
    let mut rng = StdRng::seed_from_u64(seed ^ blake3_tag(symbol));
    let mut price = 100.0_f64;
    let mut bars = Vec::new();

    for date in business_days(start, end) {
        let drift = 0.0002;
        let shock: f64 = rng.gen_range(-0.02..0.02);
        price = (price * (1.0 + drift + shock)).max(1.0);

        let open = price * (1.0 + rng.gen_range(-0.003..0.003));
        let close = price;
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.004));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.004));
        let volume = rng.gen_range(500_000..5_000_000);

        bars.push(PriceBar {
            date,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    PriceSeries::new(symbol, bars)
}

/// Stable per-symbol tag so different symbols diverge under the same seed.
fn blake3_tag(symbol: &str) -> u64 {
    let hash = blake3::hash(symbol.as_bytes());
    u64::from_le_bytes(hash.as_bytes()[..8].try_into().unwrap())
}
