//! Historical price data: immutable series, point-in-time slicing, CSV
//! ingest, and a synthetic generator for tests and demos.
//!
//! The no-lookahead guarantee lives here: `PriceSeries::slice_asof` is the
//! only way the engine hands price data to an agent, and it can never return
//! a bar dated after the `asof` timestamp.

pub mod ingest;
pub mod series;
pub mod synthetic;

pub use ingest::{load_price_store, read_bars_csv, IngestError};
pub use series::{PriceSeries, PriceStore};
pub use synthetic::synthetic_series;
